//! Media properties produced by analysis.
//!
//! [`FileProperties`] is the snapshot returned by
//! [`InputFile::analyse`](crate::InputFile::analyse). Every field that the
//! requested [`AnalyseLevel`] could not compute is `None`, which is always
//! distinct from a value that was computed as zero.

use std::{path::PathBuf, time::Duration};

use ffmpeg_next::Rational;

use crate::{analysis::AnalyseLevel, container::MediaKind};

/// A frame (or packet) count and how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCount {
    /// Extrapolated from durations, frame rates or header fields.
    Estimated(u64),
    /// Tallied from every packet of a full scan.
    Exact(u64),
}

impl FrameCount {
    /// The count regardless of how it was obtained.
    pub fn value(self) -> u64 {
        match self {
            FrameCount::Estimated(count) | FrameCount::Exact(count) => count,
        }
    }

    /// `true` for [`FrameCount::Exact`].
    pub fn is_exact(self) -> bool {
        matches!(self, FrameCount::Exact(_))
    }
}

/// Properties of a single stream.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct StreamProperties {
    /// Stream index inside the file.
    pub index: usize,
    /// Media kind.
    pub kind: MediaKind,
    /// Codec name (e.g. `"h264"`, `"aac"`).
    pub codec_name: Option<String>,
    /// Time base of the stream's timestamps.
    pub time_base: Option<Rational>,
    /// Average frame rate (video only).
    pub frame_rate: Option<Rational>,
    /// Sample rate in hertz (audio only).
    pub sample_rate: Option<u32>,
    /// Stream duration.
    pub duration: Option<Duration>,
    /// Number of frames (video) or packets (other kinds).
    pub frame_count: Option<FrameCount>,
    /// Average bit rate in bits per second.
    pub bit_rate: Option<u64>,
    /// Number of keyframe packets. Only computed by a full scan.
    pub keyframe_count: Option<u64>,
    /// Packets in the first group of pictures, when one closed during the scan.
    pub first_gop_size: Option<u64>,
    /// Mean packet duration observed during the scan, in time base ticks.
    pub average_packet_duration: Option<i64>,
    /// Packets of this stream read during the scan.
    pub packets_scanned: u64,
    /// Payload bytes of this stream read during the scan.
    pub bytes_scanned: u64,
    /// Language tag.
    pub language: Option<String>,
}

/// Properties of an analysed file.
///
/// # Example
///
/// ```no_run
/// use avdemux::{AnalyseLevel, AnalyseOptions, InputFile};
///
/// avdemux::initialize()?;
/// let properties = InputFile::analyse_file(
///     "input.mp4",
///     &AnalyseOptions::new(),
///     AnalyseLevel::FirstGop,
/// )?;
/// println!("Format: {}", properties.format_name);
/// for stream in &properties.streams {
///     println!("#{} {} {:?}", stream.index, stream.kind, stream.frame_count);
/// }
/// # Ok::<(), avdemux::DemuxError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct FileProperties {
    /// The analysed resource.
    pub filename: PathBuf,
    /// Container format name.
    pub format_name: String,
    /// Overall duration.
    pub duration: Option<Duration>,
    /// Overall bit rate in bits per second.
    pub bit_rate: Option<u64>,
    /// Depth of the analysis that produced these properties.
    pub level: AnalyseLevel,
    /// Total packets read during the scan.
    pub packets_scanned: u64,
    /// Per-stream properties, indexed by stream index.
    pub streams: Vec<StreamProperties>,
}

impl FileProperties {
    /// Properties of stream `index`.
    pub fn stream(&self, index: usize) -> Option<&StreamProperties> {
        self.streams.get(index)
    }

    /// Iterate over the streams of one kind.
    pub fn streams_of_kind(&self, kind: MediaKind) -> impl Iterator<Item = &StreamProperties> {
        self.streams.iter().filter(move |stream| stream.kind == kind)
    }

    /// Number of streams.
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }
}
