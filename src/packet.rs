//! Compressed packets.
//!
//! A [`Packet`] is one compressed data unit read from the container, tagged
//! with the stream it belongs to and its timestamps in that stream's time
//! base. Packets are immutable once produced and own their payload, so a
//! popped packet can be handed to a decoder on another thread.

use std::time::Duration;

use ffmpeg_next::Rational;

use crate::conversion::ticks_to_duration;

/// One compressed data unit belonging to exactly one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    stream_index: usize,
    pts: Option<i64>,
    dts: Option<i64>,
    duration: i64,
    is_keyframe: bool,
    position: Option<i64>,
    time_base: Option<Rational>,
    data: Vec<u8>,
}

impl Packet {
    /// Create a packet. `duration` is in `time_base` units, 0 if unknown.
    ///
    /// `time_base` is `None` when the owning stream declares none; the
    /// timestamps are then raw ticks with no known unit.
    pub fn new(
        stream_index: usize,
        pts: Option<i64>,
        dts: Option<i64>,
        duration: i64,
        is_keyframe: bool,
        time_base: impl Into<Option<Rational>>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            stream_index,
            pts,
            dts,
            duration,
            is_keyframe,
            position: None,
            time_base: time_base.into(),
            data,
        }
    }

    /// Attach the byte offset of the packet inside the container.
    #[must_use]
    pub fn with_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    /// Index of the owning stream.
    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    /// Presentation timestamp in the owning stream's time base.
    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    /// Decoding timestamp in the owning stream's time base.
    pub fn dts(&self) -> Option<i64> {
        self.dts
    }

    /// Presentation timestamp, falling back to the decoding timestamp.
    pub fn timestamp(&self) -> Option<i64> {
        self.pts.or(self.dts)
    }

    /// Packet duration in time base units (0 when unknown).
    pub fn duration(&self) -> i64 {
        self.duration
    }

    /// Whether the packet is a keyframe / sync point.
    pub fn is_keyframe(&self) -> bool {
        self.is_keyframe
    }

    /// Byte offset inside the container, if known.
    pub fn position(&self) -> Option<i64> {
        self.position
    }

    /// Time base of the owning stream, if it declares one.
    pub fn time_base(&self) -> Option<Rational> {
        self.time_base
    }

    /// Compressed payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Presentation time as a [`Duration`]. Negative timestamps clamp to zero.
    ///
    /// `None` without a timestamp or a usable time base.
    pub fn presentation_time(&self) -> Option<Duration> {
        ticks_to_duration(self.timestamp()?, self.time_base?)
    }

    /// Take ownership of the payload.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
