//! FFmpeg-backed [`ContainerHandle`].
//!
//! [`FfmpegContainer`] owns an FFmpeg input (demuxer) context. Stream
//! parameters are extracted once at open time and cached; packets are
//! copied out of FFmpeg into owned [`Packet`] values so they can outlive
//! the read call and cross thread boundaries.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet as FfmpegPacket, Rational,
    codec::{Parameters, context::Context as CodecContext, decoder::Opened},
    format::{context::Input, stream::Stream},
    media::Type,
};
use ffmpeg_sys_next::AV_NOPTS_VALUE;

use crate::{
    container::{ContainerError, ContainerHandle, MediaKind, StreamParameters},
    conversion::{MICROSECONDS, rescale},
    error::DemuxError,
    ffmpeg::is_initialized,
    packet::Packet,
    profile::{CodecProfile, FormatProfile},
};

/// A container opened through FFmpeg's `libavformat`.
///
/// Requires [`initialize`](crate::initialize) to have been called.
pub struct FfmpegContainer {
    input: Input,
    path: PathBuf,
    format_name: String,
    streams: Vec<StreamParameters>,
}

impl Debug for FfmpegContainer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegContainer")
            .field("path", &self.path)
            .field("format_name", &self.format_name)
            .field("streams", &self.streams)
            .finish_non_exhaustive()
    }
}

impl FfmpegContainer {
    /// Open and probe the container at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::NotInitialized`] before
    /// [`initialize`](crate::initialize), and [`DemuxError::FileOpen`] if the
    /// resource is missing, unreadable or not a recognised container.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DemuxError> {
        if !is_initialized() {
            return Err(DemuxError::NotInitialized);
        }
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening container: {}", path.display());

        let input = ffmpeg_next::format::input(&path).map_err(|error| DemuxError::FileOpen {
            path: path.clone(),
            reason: error.to_string(),
        })?;
        Ok(Self::from_input(input, path))
    }

    fn from_input(input: Input, path: PathBuf) -> Self {
        let format_name = input.format().name().to_string();
        let streams = input.streams().map(|stream| stream_parameters(&stream)).collect();
        Self {
            input,
            path,
            format_name,
            streams,
        }
    }

    /// Path the container was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// FFmpeg codec parameters of stream `index`, for building a decoder.
    pub fn codec_parameters(&self, index: usize) -> Option<Parameters> {
        self.input.stream(index).map(|stream| stream.parameters())
    }

    /// Open a decoder for stream `index` configured by `profile`.
    ///
    /// # Errors
    ///
    /// Returns [`DemuxError::StreamOutOfRange`] for an unknown stream and
    /// [`DemuxError::FfmpegError`] if no decoder exists for the codec.
    pub fn open_decoder(&self, index: usize, profile: &CodecProfile) -> Result<Opened, DemuxError> {
        let parameters = self
            .codec_parameters(index)
            .ok_or(DemuxError::StreamOutOfRange {
                index,
                count: self.streams.len(),
            })?;
        let context = CodecContext::from_parameters(parameters)?;
        let codec_id = context.id();
        log::debug!("Opening {codec_id:?} decoder for stream {index}");
        Ok(context.decoder().open_as_with(codec_id, profile.to_dictionary())?)
    }
}

fn valid_timestamp(value: i64) -> Option<i64> {
    (value != AV_NOPTS_VALUE).then_some(value)
}

fn valid_rational(value: Rational) -> Option<Rational> {
    (value.numerator() > 0 && value.denominator() > 0).then_some(value)
}

fn stream_parameters(stream: &Stream) -> StreamParameters {
    let codec_parameters = stream.parameters();
    let kind = MediaKind::from_ffmpeg(codec_parameters.medium());
    let raw = unsafe { *codec_parameters.as_ptr() };

    let codec_name = Some(codec_parameters.id().name())
        .filter(|name| !name.is_empty() && *name != "none")
        .map(str::to_string);

    let frame_rate = if codec_parameters.medium() == Type::Video {
        valid_rational(stream.avg_frame_rate()).or_else(|| valid_rational(stream.rate()))
    } else {
        None
    };

    let mut parameters = StreamParameters::new(stream.index(), kind, valid_rational(stream.time_base()));
    parameters.codec_name = codec_name;
    parameters.frame_rate = frame_rate;
    parameters.start_time = valid_timestamp(stream.start_time());
    parameters.duration = valid_timestamp(stream.duration()).filter(|&duration| duration > 0);
    parameters.frame_count = u64::try_from(stream.frames()).ok().filter(|&count| count > 0);
    parameters.bit_rate = u64::try_from(raw.bit_rate).ok().filter(|&rate| rate > 0);
    parameters.sample_rate = u32::try_from(raw.sample_rate).ok().filter(|&rate| rate > 0);
    parameters.language = stream.metadata().get("language").map(str::to_string);
    parameters
}

impl ContainerHandle for FfmpegContainer {
    fn format_name(&self) -> &str {
        &self.format_name
    }

    fn duration(&self) -> Option<Duration> {
        let microseconds = self.input.duration();
        (microseconds > 0).then(|| Duration::from_micros(microseconds as u64))
    }

    fn bit_rate(&self) -> Option<u64> {
        let bit_rate = unsafe { (*self.input.as_ptr()).bit_rate };
        u64::try_from(bit_rate).ok().filter(|&rate| rate > 0)
    }

    fn stream_count(&self) -> usize {
        self.streams.len()
    }

    fn stream_parameters(&self, index: usize) -> Option<StreamParameters> {
        self.streams.get(index).cloned()
    }

    fn read_packet(&mut self) -> Result<Option<Packet>, ContainerError> {
        let mut packet = FfmpegPacket::empty();
        match packet.read(&mut self.input) {
            Ok(()) => {
                let stream_index = packet.stream();
                let time_base = self
                    .streams
                    .get(stream_index)
                    .and_then(|stream| stream.time_base);
                if time_base.is_none() {
                    log::debug!(
                        "Stream {stream_index} has no time base; packet timestamps are unitless"
                    );
                }
                let data = packet.data().map(<[u8]>::to_vec).unwrap_or_default();

                let mut owned = Packet::new(
                    stream_index,
                    packet.pts(),
                    packet.dts(),
                    packet.duration(),
                    packet.is_key(),
                    time_base,
                    data,
                );
                if packet.position() >= 0 {
                    owned = owned.with_position(packet.position() as i64);
                }
                Ok(Some(owned))
            }
            Err(FfmpegError::Eof) => Ok(None),
            Err(error) => Err(ContainerError::Io(error.to_string())),
        }
    }

    fn seek(&mut self, timestamp: i64, stream_index: usize) -> Result<(), ContainerError> {
        let time_base = self
            .streams
            .get(stream_index)
            .and_then(|stream| stream.time_base)
            .ok_or(ContainerError::InvalidTimestamp(timestamp))?;
        // `Input::seek` works in AV_TIME_BASE across all streams.
        let target = rescale(timestamp, time_base, MICROSECONDS)
            .ok_or(ContainerError::InvalidTimestamp(timestamp))?;
        self.input.seek(target, ..target)?;
        Ok(())
    }

    fn configure(&mut self, profile: &FormatProfile) -> Result<(), ContainerError> {
        // Format options only take effect while probing, so reopen with them.
        let input = ffmpeg_next::format::input_with_dictionary(&self.path, profile.to_dictionary())
            .map_err(|error| ContainerError::Configuration(error.to_string()))?;
        let path = self.path.clone();
        *self = Self::from_input(input, path);
        Ok(())
    }
}
