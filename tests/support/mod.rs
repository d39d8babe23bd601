//! In-memory container used by the integration tests and benchmarks.
//!
//! `MemoryContainer` replays a scripted packet sequence and seeks the way a
//! demuxer does: to the last keyframe of the reference stream at or before
//! the requested timestamp.

#![allow(dead_code)]

use std::time::Duration;

use avdemux::{
    ContainerError, ContainerHandle, FormatProfile, MediaKind, Packet, StreamParameters,
};
use ffmpeg_next::Rational;

pub const VIDEO_TIME_BASE: Rational = Rational(1, 25);
pub const AUDIO_TIME_BASE: Rational = Rational(1, 48_000);
pub const AUDIO_PACKET_TICKS: i64 = 1920;

pub struct MemoryContainer {
    streams: Vec<StreamParameters>,
    packets: Vec<Packet>,
    cursor: usize,
    duration: Option<Duration>,
    seekable: bool,
    fail_at: Option<usize>,
    reads: usize,
    seeks: Vec<(i64, usize)>,
    configured: Vec<FormatProfile>,
}

impl MemoryContainer {
    pub fn new(streams: Vec<StreamParameters>, packets: Vec<Packet>) -> Self {
        Self {
            streams,
            packets,
            cursor: 0,
            duration: None,
            seekable: true,
            fail_at: None,
            reads: 0,
            seeks: Vec::new(),
            configured: Vec::new(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn unseekable(mut self) -> Self {
        self.seekable = false;
        self
    }

    /// Fail once when the cursor reaches packet `position`.
    pub fn failing_at(mut self, position: usize) -> Self {
        self.fail_at = Some(position);
        self
    }

    /// Packets handed out by `read_packet` so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn seeks(&self) -> &[(i64, usize)] {
        &self.seeks
    }

    pub fn configured(&self) -> &[FormatProfile] {
        &self.configured
    }

    pub fn remaining(&self) -> usize {
        self.packets.len() - self.cursor
    }
}

impl ContainerHandle for MemoryContainer {
    fn format_name(&self) -> &str {
        "memory"
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn bit_rate(&self) -> Option<u64> {
        None
    }

    fn stream_count(&self) -> usize {
        self.streams.len()
    }

    fn stream_parameters(&self, index: usize) -> Option<StreamParameters> {
        self.streams.get(index).cloned()
    }

    fn read_packet(&mut self) -> Result<Option<Packet>, ContainerError> {
        if self.fail_at == Some(self.cursor) {
            self.fail_at = None;
            return Err(ContainerError::Io("simulated read failure".to_string()));
        }
        let Some(packet) = self.packets.get(self.cursor).cloned() else {
            return Ok(None);
        };
        self.cursor += 1;
        self.reads += 1;
        Ok(Some(packet))
    }

    fn seek(&mut self, timestamp: i64, stream_index: usize) -> Result<(), ContainerError> {
        if !self.seekable {
            return Err(ContainerError::Unseekable);
        }
        self.seeks.push((timestamp, stream_index));

        let position = self
            .packets
            .iter()
            .enumerate()
            .filter(|(_, packet)| {
                packet.stream_index() == stream_index
                    && packet.is_keyframe()
                    && packet.timestamp().is_some_and(|pts| pts <= timestamp)
            })
            .map(|(position, _)| position)
            .last()
            .ok_or(ContainerError::InvalidTimestamp(timestamp))?;
        self.cursor = position;
        Ok(())
    }

    fn configure(&mut self, profile: &FormatProfile) -> Result<(), ContainerError> {
        self.configured.push(profile.clone());
        Ok(())
    }
}

pub fn video_stream(index: usize) -> StreamParameters {
    let mut parameters = StreamParameters::new(index, MediaKind::Video, Some(VIDEO_TIME_BASE));
    parameters.codec_name = Some("h264".to_string());
    parameters.frame_rate = Some(Rational::new(25, 1));
    parameters.start_time = Some(0);
    parameters
}

pub fn audio_stream(index: usize) -> StreamParameters {
    let mut parameters = StreamParameters::new(index, MediaKind::Audio, Some(AUDIO_TIME_BASE));
    parameters.codec_name = Some("aac".to_string());
    parameters.sample_rate = Some(48_000);
    parameters.start_time = Some(0);
    parameters
}

pub fn video_packet(index: usize, frame: i64, gop: i64) -> Packet {
    Packet::new(
        index,
        Some(frame),
        Some(frame),
        1,
        frame % gop == 0,
        VIDEO_TIME_BASE,
        vec![frame as u8; 100],
    )
}

pub fn audio_packet(index: usize, sequence: i64) -> Packet {
    let pts = sequence * AUDIO_PACKET_TICKS;
    Packet::new(
        index,
        Some(pts),
        Some(pts),
        AUDIO_PACKET_TICKS,
        true,
        AUDIO_TIME_BASE,
        vec![sequence as u8; 10],
    )
}

/// Video on stream 0 and audio on stream 1, strictly alternating, with
/// `frames` packets per stream. One audio packet lasts 40 ms, like a frame.
pub fn interleaved(frames: i64, gop: i64) -> MemoryContainer {
    let packets = (0..frames)
        .flat_map(|frame| [video_packet(0, frame, gop), audio_packet(1, frame)])
        .collect();
    MemoryContainer::new(vec![video_stream(0), audio_stream(1)], packets)
        .with_duration(Duration::from_millis(frames as u64 * 40))
}
