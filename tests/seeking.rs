//! Frame seeking.

mod support;

use avdemux::{AnalyseLevel, AnalyseOptions, DemuxError, InputFile, MediaKind, StreamParameters};

use support::{MemoryContainer, audio_packet, audio_stream, interleaved};

#[test]
fn seek_clears_every_queue() {
    let mut file = InputFile::from_container("memory.mkv", interleaved(20, 5)).expect("open");
    file.set_stream_buffered(0, true).expect("buffer video");
    file.set_stream_buffered(1, true).expect("buffer audio");
    for _ in 0..6 {
        file.read_next_packet(0).expect("read");
    }

    file.seek_at_frame(10).expect("seek");
    for index in 0..file.stream_count() {
        assert_eq!(file.stream(index).map(|stream| stream.queued_packets()), Some(0));
    }
}

#[test]
fn first_packet_after_seek_is_at_or_after_target() {
    let mut file = InputFile::from_container("memory.mkv", interleaved(40, 10)).expect("open");
    file.set_stream_buffered(0, true).expect("buffer");

    for frame in [30, 10, 20, 0] {
        let target = file.seek_at_frame(frame).expect("seek");
        assert!(file.read_next_packet(0).expect("read"));
        let packet = file.pop_packet(0).expect("pop").expect("packet");
        assert!(packet.is_keyframe());
        assert!(packet.pts().expect("pts") >= target);
    }
}

#[test]
fn seek_lands_on_previous_keyframe() {
    let mut file = InputFile::from_container("memory.mkv", interleaved(40, 10)).expect("open");
    file.set_stream_buffered(0, true).expect("buffer");

    assert_eq!(file.seek_at_frame(17).expect("seek"), 17);
    assert!(file.read_next_packet(0).expect("read"));
    assert_eq!(file.pop_packet(0).expect("pop").and_then(|packet| packet.pts()), Some(10));
}

#[test]
fn default_reference_is_first_video_stream() {
    let container = {
        let mut packets = Vec::new();
        for n in 0..10 {
            packets.push(audio_packet(0, n));
            packets.push(support::video_packet(1, n, 5));
        }
        MemoryContainer::new(vec![audio_stream(0), support::video_stream(1)], packets)
    };
    let mut file = InputFile::from_container("audio-first.mp4", container).expect("open");
    file.seek_at_frame(5).expect("seek");
    assert_eq!(file.container().seeks().last(), Some(&(5, 1)));
}

#[test]
fn failed_seek_still_clears_queues() {
    let container = interleaved(10, 5).unseekable();
    let mut file = InputFile::from_container("pipe.ts", container).expect("open");
    file.set_stream_buffered(0, true).expect("buffer video");
    file.set_stream_buffered(1, true).expect("buffer audio");
    file.read_next_packet(0).expect("read");
    file.read_next_packet(0).expect("read");
    assert!(file.stream(1).map_or(0, |stream| stream.queued_packets()) > 0);

    let error = file.seek_at_frame(5).expect_err("unseekable");
    assert!(matches!(error, DemuxError::Seek { frame: 5, stream_index: 0, .. }));
    assert!(error.to_string().contains("pipe.ts"));
    for index in 0..file.stream_count() {
        assert_eq!(file.stream(index).map(|stream| stream.queued_packets()), Some(0));
    }

    // The file stays usable for forward reads.
    assert!(file.read_next_packet(0).expect("read after failed seek"));
}

#[test]
fn frame_zero_without_time_base_is_a_seek_error() {
    let parameters = StreamParameters::new(0, MediaKind::Video, None);
    let container = MemoryContainer::new(vec![parameters], Vec::new());
    let mut file = InputFile::from_container("no-timebase.bin", container).expect("open");

    let error = file.seek_at_frame(0).expect_err("unresolvable");
    assert!(matches!(error, DemuxError::Seek { frame: 0, .. }));
    assert!(file.container().seeks().is_empty());
}

#[test]
fn frame_beyond_exact_count_is_rejected_after_full_analysis() {
    let mut file = InputFile::from_container("memory.mkv", interleaved(20, 5)).expect("open");
    file.analyse(&AnalyseOptions::new(), AnalyseLevel::Full)
        .expect("analyse");

    assert!(matches!(
        file.seek_at_frame(20),
        Err(DemuxError::Seek { frame: 20, .. })
    ));
    assert!(file.seek_at_frame(19).is_ok());
}

#[test]
fn unknown_reference_stream_is_a_seek_error() {
    let mut file = InputFile::from_container("memory.mkv", interleaved(4, 2)).expect("open");
    assert!(matches!(
        file.seek_at_frame_in(0, 9),
        Err(DemuxError::Seek { stream_index: 9, .. })
    ));
}

#[test]
fn frame_past_declared_duration_is_rejected_without_analysis() {
    // 40 frames at 25 fps, 1.6 s; the header carries no frame count.
    let mut file = InputFile::from_container("memory.mkv", interleaved(40, 10)).expect("open");
    assert_eq!(file.stream(0).and_then(|stream| stream.parameters().frame_count), None);

    file.seek_at_frame(39).expect("last frame");
    let seeks = file.container().seeks().len();

    let error = file.seek_at_frame(10_000_000).expect_err("beyond the end");
    assert!(matches!(error, DemuxError::Seek { frame: 10_000_000, stream_index: 0, .. }));
    assert_eq!(file.container().seeks().len(), seeks);
    assert!(matches!(file.seek_at_frame(40), Err(DemuxError::Seek { .. })));
}
