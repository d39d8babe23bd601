//! Frame-based seeking.
//!
//! A frame number is resolved to a timestamp in the reference stream's time
//! base, the container is asked for the nearest keyframe at or before that
//! timestamp, and then every stream queue is emptied. Queues are emptied
//! even when the seek fails, because the container position is unspecified
//! after a failed seek and anything still queued could predate it.

use std::{path::Path, time::Duration};

use ffmpeg_next::Rational;

use crate::{
    container::{ContainerHandle, StreamParameters},
    conversion::{MICROSECONDS, frame_to_ticks, rescale},
    error::DemuxError,
    input_stream::InputStream,
};

/// Extra knowledge used to resolve frame numbers, usually from analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SeekHints {
    /// Total frames of the reference stream, if known.
    pub(crate) frame_count: Option<u64>,
    /// Mean frame duration in time base ticks, if known.
    pub(crate) frame_duration: Option<i64>,
}

/// Resolve `frame` of the stream described by `parameters` to a timestamp
/// in that stream's time base.
///
/// `container_duration` bounds the result when the stream declares no
/// duration of its own.
pub(crate) fn frame_to_timestamp(
    frame: u64,
    parameters: &StreamParameters,
    hints: SeekHints,
    container_duration: Option<Duration>,
) -> Result<i64, String> {
    let index = parameters.index;
    let time_base = parameters
        .time_base
        .ok_or_else(|| format!("time base of stream {index} is unknown"))?;
    let out_of_range = || format!("frame {frame} is beyond the end of stream {index}");

    if let Some(count) = hints.frame_count.or(parameters.frame_count) {
        if frame >= count {
            return Err(format!(
                "frame {frame} is out of range (stream {index} has {count} frames)"
            ));
        }
    }

    let start = parameters.start_time.unwrap_or(0);
    let offset = if let Some(ticks) = parameters
        .frame_rate
        .and_then(|frame_rate| frame_to_ticks(frame, frame_rate, time_base))
    {
        ticks
    } else if let Some(duration) = hints.frame_duration.filter(|&duration| duration > 0) {
        i64::try_from(frame)
            .ok()
            .and_then(|frame| frame.checked_mul(duration))
            .ok_or_else(out_of_range)?
    } else if frame == 0 {
        0
    } else {
        return Err(format!("frame duration of stream {index} is unknown"));
    };
    let timestamp = start.checked_add(offset).ok_or_else(out_of_range)?;

    if frame > 0 {
        if let Some(end) = stream_end(parameters, time_base, container_duration) {
            if timestamp >= end {
                return Err(out_of_range());
            }
        }
    }
    Ok(timestamp)
}

/// First timestamp past the end of the stream, from the stream's declared
/// duration or else the container's.
fn stream_end(
    parameters: &StreamParameters,
    time_base: Rational,
    container_duration: Option<Duration>,
) -> Option<i64> {
    let length = parameters
        .duration
        .filter(|&duration| duration > 0)
        .or_else(|| {
            let micros = i64::try_from(container_duration?.as_micros()).ok()?;
            rescale(micros, MICROSECONDS, time_base).filter(|&ticks| ticks > 0)
        })?;
    Some(parameters.start_time.unwrap_or(0).saturating_add(length))
}

/// Seek the container to `frame` of stream `reference`, then clear every queue.
///
/// Returns the resolved target timestamp in the reference stream's time base.
pub(crate) fn seek_at_frame<C: ContainerHandle>(
    container: &mut C,
    streams: &mut [InputStream],
    filename: &Path,
    frame: u64,
    reference: usize,
    hints: SeekHints,
) -> Result<i64, DemuxError> {
    let result = resolve_and_seek(container, streams, frame, reference, hints);

    for stream in streams.iter_mut() {
        stream.clear();
    }

    result.map_err(|reason| {
        log::debug!("Seek to frame {frame} of stream {reference} failed: {reason}");
        DemuxError::Seek {
            path: filename.to_path_buf(),
            frame,
            stream_index: reference,
            reason,
        }
    })
}

fn resolve_and_seek<C: ContainerHandle>(
    container: &mut C,
    streams: &[InputStream],
    frame: u64,
    reference: usize,
    hints: SeekHints,
) -> Result<i64, String> {
    let stream = streams
        .get(reference)
        .ok_or_else(|| format!("reference stream {reference} does not exist"))?;
    let timestamp =
        frame_to_timestamp(frame, stream.parameters(), hints, container.duration())?;

    log::debug!("Seeking to frame {frame} (timestamp {timestamp} on stream {reference})");
    container
        .seek(timestamp, reference)
        .map_err(|error| error.to_string())?;
    Ok(timestamp)
}
