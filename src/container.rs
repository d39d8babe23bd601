//! The container collaborator interface.
//!
//! [`ContainerHandle`] is the seam between the packet-routing core and the
//! component that actually parses a container's on-disk layout. The core
//! only ever drives a handle through this trait: it reads one raw packet at
//! a time, seeks to a timestamp, and queries per-stream parameters.
//!
//! [`FfmpegContainer`](crate::FfmpegContainer) is the production
//! implementation. Any other demuxer (or an in-memory fake in tests) can be
//! plugged into [`InputFile`](crate::InputFile) by implementing this trait.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    time::Duration,
};

use ffmpeg_next::{Rational, media::Type};
use thiserror::Error;

use crate::{packet::Packet, profile::FormatProfile};

/// The kind of media carried by a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Video frames.
    Video,
    /// Audio samples.
    Audio,
    /// Subtitle events.
    Subtitle,
    /// Opaque data (timecodes, metadata tracks).
    Data,
    /// Attached files such as fonts or cover art.
    Attachment,
    /// Anything the container could not classify.
    Unknown,
}

impl MediaKind {
    pub(crate) fn from_ffmpeg(medium: Type) -> Self {
        match medium {
            Type::Video => MediaKind::Video,
            Type::Audio => MediaKind::Audio,
            Type::Subtitle => MediaKind::Subtitle,
            Type::Data => MediaKind::Data,
            Type::Attachment => MediaKind::Attachment,
            Type::Unknown => MediaKind::Unknown,
        }
    }

    /// Lower-case name, e.g. `"video"`.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Subtitle => "subtitle",
            MediaKind::Data => "data",
            MediaKind::Attachment => "attachment",
            MediaKind::Unknown => "unknown",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Container-reported description of one stream.
///
/// Every optional field is `None` when the container does not report it.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamParameters {
    /// Stream index, stable for the lifetime of the file.
    pub index: usize,
    /// Media kind.
    pub kind: MediaKind,
    /// Codec name (e.g. `"h264"`, `"aac"`), `None` if unidentified.
    pub codec_name: Option<String>,
    /// Units per second for this stream's timestamps.
    pub time_base: Option<Rational>,
    /// Average frame rate (video only).
    pub frame_rate: Option<Rational>,
    /// Timestamp of the first packet, in `time_base` units.
    pub start_time: Option<i64>,
    /// Stream duration, in `time_base` units.
    pub duration: Option<i64>,
    /// Frame count stored in the container header.
    pub frame_count: Option<u64>,
    /// Declared bit rate in bits per second.
    pub bit_rate: Option<u64>,
    /// Sample rate in hertz (audio only).
    pub sample_rate: Option<u32>,
    /// Language tag from stream metadata.
    pub language: Option<String>,
}

impl StreamParameters {
    /// Parameters with only an index, kind and time base set.
    pub fn new(index: usize, kind: MediaKind, time_base: Option<Rational>) -> Self {
        Self {
            index,
            kind,
            codec_name: None,
            time_base,
            frame_rate: None,
            start_time: None,
            duration: None,
            frame_count: None,
            bit_rate: None,
            sample_rate: None,
            language: None,
        }
    }
}

/// Errors reported by a [`ContainerHandle`].
///
/// End of stream is not an error: [`ContainerHandle::read_packet`] returns
/// `Ok(None)` for it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContainerError {
    /// Reading the underlying resource failed.
    #[error("I/O failure: {0}")]
    Io(String),
    /// The container or stream does not support seeking.
    #[error("container is not seekable")]
    Unseekable,
    /// The seek target lies outside the container.
    #[error("timestamp {0} is outside the container")]
    InvalidTimestamp(i64),
    /// The container rejected a format-level option.
    #[error("configuration rejected: {0}")]
    Configuration(String),
    /// Any other failure from the FFmpeg libraries.
    #[error("{0}")]
    Ffmpeg(String),
}

impl From<ffmpeg_next::Error> for ContainerError {
    fn from(error: ffmpeg_next::Error) -> Self {
        ContainerError::Ffmpeg(error.to_string())
    }
}

/// A black-box demuxer the core drives one packet at a time.
///
/// Implementations own a single read cursor. The core never calls two
/// methods concurrently and never hands the handle out mutably.
pub trait ContainerHandle {
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    fn format_name(&self) -> &str;

    /// Container-level duration, if the header declares one.
    fn duration(&self) -> Option<Duration>;

    /// Container-level bit rate in bits per second, if declared.
    fn bit_rate(&self) -> Option<u64>;

    /// Number of streams. Indices `0..stream_count()` are valid.
    fn stream_count(&self) -> usize;

    /// Parameters of stream `index`, or `None` if out of range.
    fn stream_parameters(&self, index: usize) -> Option<StreamParameters>;

    /// Read the next packet in container interleave order.
    ///
    /// Returns `Ok(None)` at end of stream.
    fn read_packet(&mut self) -> Result<Option<Packet>, ContainerError>;

    /// Position the cursor on the nearest keyframe at or before `timestamp`,
    /// expressed in the time base of stream `stream_index`.
    fn seek(&mut self, timestamp: i64, stream_index: usize) -> Result<(), ContainerError>;

    /// Apply format-level options. Only called before any packet is read.
    fn configure(&mut self, profile: &FormatProfile) -> Result<(), ContainerError>;
}
