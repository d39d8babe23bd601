//! Structural analysis of a container.
//!
//! Two depths are available. [`AnalyseLevel::FirstGop`] reads only until
//! every audio and video stream has closed its first group of pictures (or a
//! packet budget runs out) and extrapolates durations and frame counts from
//! header fields. [`AnalyseLevel::Full`] reads the whole container and
//! tallies every packet, so its counts are exact.
//!
//! Analysis never routes packets into stream queues. The scan either
//! produces a complete [`FileProperties`] or fails; there is no partially
//! populated result.

use std::{path::Path, time::Duration};

use crate::{
    configuration::AnalyseOptions,
    container::{ContainerHandle, MediaKind, StreamParameters},
    conversion::{bit_rate, frames_in, pts_to_seconds, ticks_to_duration},
    error::DemuxError,
    input_stream::InputStream,
    packet::Packet,
    progress::{ProgressStatus, ProgressTracker},
    properties::{FileProperties, FrameCount, StreamProperties},
};

/// How deep [`InputFile::analyse`](crate::InputFile::analyse) scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnalyseLevel {
    /// Read up to the end of the first group of pictures of each audio and
    /// video stream. Durations and frame counts are estimates.
    #[default]
    FirstGop,
    /// Read every packet. Durations and frame counts are exact.
    Full,
}

/// Progress of one stream through its first group of pictures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GopState {
    /// No keyframe seen yet.
    Waiting,
    /// Inside the first GOP, counting packets since its keyframe.
    Open(u64),
    /// The second keyframe arrived; the first GOP had this many packets.
    Closed(u64),
}

#[derive(Debug)]
struct StreamTally {
    packets: u64,
    bytes: u64,
    keyframes: u64,
    first_timestamp: Option<i64>,
    end_timestamp: Option<i64>,
    duration_sum: i64,
    durations_counted: u64,
    gop: GopState,
}

impl StreamTally {
    fn new() -> Self {
        Self {
            packets: 0,
            bytes: 0,
            keyframes: 0,
            first_timestamp: None,
            end_timestamp: None,
            duration_sum: 0,
            durations_counted: 0,
            gop: GopState::Waiting,
        }
    }

    fn record(&mut self, packet: &Packet) {
        self.packets += 1;
        self.bytes += packet.size() as u64;

        if packet.duration() > 0 {
            self.duration_sum = self.duration_sum.saturating_add(packet.duration());
            self.durations_counted += 1;
        }

        if let Some(timestamp) = packet.timestamp() {
            self.first_timestamp = Some(
                self.first_timestamp
                    .map_or(timestamp, |first| first.min(timestamp)),
            );
            let end = timestamp.saturating_add(packet.duration().max(0));
            self.end_timestamp = Some(self.end_timestamp.map_or(end, |last| last.max(end)));
        }

        if packet.is_keyframe() {
            self.keyframes += 1;
        }
        self.gop = match (self.gop, packet.is_keyframe()) {
            (GopState::Waiting, true) => GopState::Open(1),
            (GopState::Waiting, false) => GopState::Waiting,
            (GopState::Open(count), true) => GopState::Closed(count),
            (GopState::Open(count), false) => GopState::Open(count + 1),
            (closed @ GopState::Closed(_), _) => closed,
        };
    }

    fn average_packet_duration(&self) -> Option<i64> {
        (self.durations_counted > 0).then(|| self.duration_sum / self.durations_counted as i64)
    }

    /// Span covered by the scanned packets, in time base ticks.
    fn span(&self) -> Option<i64> {
        match (self.first_timestamp, self.end_timestamp) {
            (Some(first), Some(end)) if end > first => end.checked_sub(first),
            _ => None,
        }
    }
}

/// Streams whose first GOP ends a [`AnalyseLevel::FirstGop`] scan.
fn is_tracked(kind: MediaKind) -> bool {
    matches!(kind, MediaKind::Video | MediaKind::Audio)
}

/// Scan `container` and compute [`FileProperties`].
///
/// The caller is responsible for rewinding the container afterwards.
pub(crate) fn analyse_container<C: ContainerHandle>(
    container: &mut C,
    streams: &[InputStream],
    filename: &Path,
    options: &AnalyseOptions,
    level: AnalyseLevel,
) -> Result<FileProperties, DemuxError> {
    log::debug!(
        "Analysing {} ({level:?}, {} streams)",
        filename.display(),
        streams.len()
    );

    let mut tallies: Vec<StreamTally> = streams.iter().map(|_| StreamTally::new()).collect();
    let mut tracked: Vec<usize> = streams
        .iter()
        .enumerate()
        .filter(|(_, stream)| is_tracked(stream.kind()))
        .map(|(position, _)| position)
        .collect();
    if tracked.is_empty() {
        tracked = (0..streams.len()).collect();
    }

    let container_duration = container.duration();
    let mut tracker = ProgressTracker::new(options.progress.clone(), level, options.batch_size);
    let mut packets_scanned: u64 = 0;
    let mut reached_end = false;

    loop {
        if options.is_cancelled() {
            log::debug!("Analysis of {} cancelled", filename.display());
            return Err(DemuxError::Aborted);
        }

        let closed = tracked
            .iter()
            .filter(|&&position| {
                tallies
                    .get(position)
                    .is_some_and(|tally| matches!(tally.gop, GopState::Closed(_)))
            })
            .count();
        if level == AnalyseLevel::FirstGop
            && (closed == tracked.len() || packets_scanned >= options.first_gop_packet_limit)
        {
            break;
        }

        let packet = match container.read_packet() {
            Ok(Some(packet)) => packet,
            Ok(None) => {
                reached_end = true;
                break;
            }
            Err(error) => {
                return Err(DemuxError::Analysis {
                    path: filename.to_path_buf(),
                    reason: error.to_string(),
                });
            }
        };
        packets_scanned += 1;

        let index = packet.stream_index();
        let timestamp = packet.presentation_time();
        if let Some(tally) = tallies.get_mut(index) {
            tally.record(&packet);
        }

        let fraction = match level {
            AnalyseLevel::FirstGop => {
                let by_gop = closed as f64 / tracked.len().max(1) as f64;
                let by_budget = packets_scanned as f64 / options.first_gop_packet_limit as f64;
                by_gop.max(by_budget)
            }
            AnalyseLevel::Full => full_scan_fraction(&packet, streams, container_duration),
        };

        if tracker.advance(fraction, timestamp) == ProgressStatus::Abort {
            log::debug!("Analysis of {} aborted by progress callback", filename.display());
            return Err(DemuxError::Aborted);
        }
    }

    if tracker.finish() == ProgressStatus::Abort {
        return Err(DemuxError::Aborted);
    }

    let per_stream: Vec<StreamProperties> = streams
        .iter()
        .zip(&tallies)
        .map(|(stream, tally)| {
            stream_properties(stream.parameters(), tally, level, reached_end, container_duration)
        })
        .collect();

    let total_bytes: u64 = tallies.iter().map(|tally| tally.bytes).sum();
    let longest_stream = per_stream
        .iter()
        .filter_map(|stream| stream.duration)
        .max();

    let (duration, file_bit_rate) = match level {
        AnalyseLevel::FirstGop => (
            container_duration.or(longest_stream),
            container.bit_rate(),
        ),
        AnalyseLevel::Full => {
            let duration = longest_stream.or(container_duration);
            let measured = duration.and_then(|duration| bit_rate(total_bytes, duration));
            (duration, measured.or(container.bit_rate()))
        }
    };

    log::info!(
        "Analysed {} ({level:?}): {} packets scanned, duration={:?}",
        filename.display(),
        packets_scanned,
        duration,
    );

    Ok(FileProperties {
        filename: filename.to_path_buf(),
        format_name: container.format_name().to_string(),
        duration,
        bit_rate: file_bit_rate,
        level,
        packets_scanned,
        streams: per_stream,
    })
}

/// Position of `packet` relative to the expected total duration.
fn full_scan_fraction(
    packet: &Packet,
    streams: &[InputStream],
    container_duration: Option<Duration>,
) -> f64 {
    let (Some(timestamp), Some(time_base)) = (packet.timestamp(), packet.time_base()) else {
        return 0.0;
    };
    let start = streams
        .get(packet.stream_index())
        .and_then(|stream| stream.parameters().start_time)
        .unwrap_or(0);
    let total = match container_duration {
        Some(duration) if !duration.is_zero() => duration.as_secs_f64(),
        _ => return 0.0,
    };
    pts_to_seconds(timestamp.saturating_sub(start), time_base) / total
}

fn stream_properties(
    parameters: &StreamParameters,
    tally: &StreamTally,
    level: AnalyseLevel,
    reached_end: bool,
    container_duration: Option<Duration>,
) -> StreamProperties {
    let time_base = parameters.time_base;
    let header_duration = time_base
        .zip(parameters.duration)
        .and_then(|(time_base, ticks)| ticks_to_duration(ticks, time_base));
    let scanned_duration = time_base
        .zip(tally.span())
        .and_then(|(time_base, ticks)| ticks_to_duration(ticks, time_base));
    let average_packet_duration = tally.average_packet_duration();

    let first_gop_size = match tally.gop {
        GopState::Closed(size) => Some(size),
        GopState::Open(size) if reached_end => Some(size),
        _ => None,
    };

    let (duration, frame_count, stream_bit_rate, keyframe_count) = match level {
        AnalyseLevel::FirstGop => {
            let duration = header_duration.or(container_duration);
            let frame_count = estimate_frame_count(parameters, duration, average_packet_duration);
            let measured = scanned_duration.and_then(|span| bit_rate(tally.bytes, span));
            (duration, frame_count, parameters.bit_rate.or(measured), None)
        }
        AnalyseLevel::Full => {
            let duration = scanned_duration.or(header_duration);
            let measured = scanned_duration.and_then(|span| bit_rate(tally.bytes, span));
            (
                duration,
                Some(FrameCount::Exact(tally.packets)),
                measured.or(parameters.bit_rate),
                Some(tally.keyframes),
            )
        }
    };

    StreamProperties {
        index: parameters.index,
        kind: parameters.kind,
        codec_name: parameters.codec_name.clone(),
        time_base,
        frame_rate: parameters.frame_rate,
        sample_rate: parameters.sample_rate,
        duration,
        frame_count,
        bit_rate: stream_bit_rate,
        keyframe_count,
        first_gop_size,
        average_packet_duration,
        packets_scanned: tally.packets,
        bytes_scanned: tally.bytes,
        language: parameters.language.clone(),
    }
}

/// Header count, else duration times frame rate, else duration over the
/// mean packet duration seen in the first GOP.
fn estimate_frame_count(
    parameters: &StreamParameters,
    duration: Option<Duration>,
    average_packet_duration: Option<i64>,
) -> Option<FrameCount> {
    if let Some(count) = parameters.frame_count.filter(|&count| count > 0) {
        return Some(FrameCount::Estimated(count));
    }
    let duration = duration?;

    if parameters.kind == MediaKind::Video {
        if let Some(frames) = parameters
            .frame_rate
            .and_then(|frame_rate| frames_in(duration, frame_rate))
        {
            return Some(FrameCount::Estimated(frames));
        }
    }

    let packet_duration = parameters
        .time_base
        .zip(average_packet_duration)
        .and_then(|(time_base, ticks)| ticks_to_duration(ticks, time_base))
        .filter(|packet_duration| !packet_duration.is_zero())?;
    Some(FrameCount::Estimated(
        (duration.as_micros() / packet_duration.as_micros()) as u64,
    ))
}

#[cfg(test)]
mod tests {
    use ffmpeg_next::Rational;

    use super::*;

    fn packet(pts: i64, key: bool) -> Packet {
        Packet::new(0, Some(pts), Some(pts), 1, key, Rational::new(1, 25), vec![0; 10])
    }

    #[test]
    fn gop_closes_on_second_keyframe() {
        let mut tally = StreamTally::new();
        tally.record(&packet(0, false));
        assert_eq!(tally.gop, GopState::Waiting);
        tally.record(&packet(1, true));
        tally.record(&packet(2, false));
        tally.record(&packet(3, false));
        assert_eq!(tally.gop, GopState::Open(3));
        tally.record(&packet(4, true));
        assert_eq!(tally.gop, GopState::Closed(3));
        tally.record(&packet(5, true));
        assert_eq!(tally.gop, GopState::Closed(3));
    }

    #[test]
    fn tally_tracks_span_and_bytes() {
        let mut tally = StreamTally::new();
        for pts in 0..10 {
            tally.record(&packet(pts, pts % 5 == 0));
        }
        assert_eq!(tally.span(), Some(10));
        assert_eq!(tally.bytes, 100);
        assert_eq!(tally.keyframes, 2);
        assert_eq!(tally.average_packet_duration(), Some(1));
    }

    #[test]
    fn corrupt_timestamps_saturate() {
        let mut tally = StreamTally::new();
        let huge =
            Packet::new(0, Some(i64::MAX - 1), None, i64::MAX, true, Rational::new(1, 25), vec![0]);
        tally.record(&packet(i64::MIN, true));
        tally.record(&huge);
        tally.record(&huge);
        assert_eq!(tally.end_timestamp, Some(i64::MAX));
        assert_eq!(tally.duration_sum, i64::MAX);
        assert_eq!(tally.span(), None);
    }

    #[test]
    fn estimate_prefers_header_count() {
        let mut parameters =
            StreamParameters::new(0, MediaKind::Video, Some(Rational::new(1, 25)));
        parameters.frame_count = Some(120);
        parameters.frame_rate = Some(Rational::new(25, 1));
        let estimate = estimate_frame_count(&parameters, Some(Duration::from_secs(10)), None);
        assert_eq!(estimate, Some(FrameCount::Estimated(120)));

        parameters.frame_count = None;
        let estimate = estimate_frame_count(&parameters, Some(Duration::from_secs(10)), None);
        assert_eq!(estimate, Some(FrameCount::Estimated(250)));
    }

    #[test]
    fn estimate_is_unknown_without_duration() {
        let parameters = StreamParameters::new(0, MediaKind::Audio, Some(Rational::new(1, 48_000)));
        assert_eq!(estimate_frame_count(&parameters, None, Some(1024)), None);
    }
}
