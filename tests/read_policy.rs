//! Behaviour of reads on streams that are not buffered.

mod support;

use avdemux::{InputFile, ReadPolicy};

use support::interleaved;

#[test]
fn buffered_only_is_the_default() {
    let file = InputFile::from_container("memory.mkv", interleaved(2, 2)).expect("open");
    assert_eq!(file.read_policy(), ReadPolicy::BufferedOnly);
}

#[test]
fn buffered_only_does_not_touch_the_container() {
    let mut file = InputFile::from_container("memory.mkv", interleaved(5, 5)).expect("open");

    assert!(!file.read_next_packet(1).expect("read"));
    assert!(!file.is_stream_buffered(1).expect("flag"));
    assert_eq!(file.container().reads(), 0);
}

#[test]
fn auto_buffer_enables_buffering_persistently() {
    let mut file = InputFile::from_container("memory.mkv", interleaved(5, 5)).expect("open");
    file.set_read_policy(ReadPolicy::AutoBuffer);

    assert!(file.read_next_packet(1).expect("read"));
    assert!(file.is_stream_buffered(1).expect("flag"));
    let packet = file.pop_packet(1).expect("pop").expect("audio packet");
    assert_eq!(packet.stream_index(), 1);
    assert_eq!(packet.pts(), Some(0));

    // Stream 1 keeps buffering while stream 0 is read.
    file.set_stream_buffered(0, true).expect("buffer video");
    assert!(file.read_next_packet(0).expect("read video"));
    assert!(file.read_next_packet(0).expect("read video"));
    assert_eq!(file.stream(1).map(|stream| stream.queued_packets()), Some(1));
}

#[test]
fn auto_buffer_only_sees_packets_after_the_request() {
    // Video is read first; the audio packets passed on the way are dropped.
    let mut file = InputFile::from_container("memory.mkv", interleaved(5, 5)).expect("open");
    file.set_stream_buffered(0, true).expect("buffer");
    for _ in 0..5 {
        assert!(file.read_next_packet(0).expect("read"));
    }

    file.set_read_policy(ReadPolicy::AutoBuffer);
    assert!(file.read_next_packet(1).expect("read audio"));
    let packet = file.pop_packet(1).expect("pop").expect("last audio packet");
    assert_eq!(packet.pts(), Some(4 * support::AUDIO_PACKET_TICKS));
    assert!(!file.read_next_packet(1).expect("end"));
}

#[test]
fn turning_buffering_off_after_auto_buffer_clears_queue() {
    let mut file = InputFile::from_container("memory.mkv", interleaved(4, 2)).expect("open");
    file.set_read_policy(ReadPolicy::AutoBuffer);
    assert!(file.read_next_packet(1).expect("read"));
    assert!(file.read_next_packet(1).expect("read"));
    assert_eq!(file.stream(1).map(|stream| stream.queued_packets()), Some(2));

    file.set_stream_buffered(1, false).expect("unbuffer");
    assert_eq!(file.stream(1).map(|stream| stream.queued_packets()), Some(0));
}

#[test]
fn buffering_for_a_single_read_loses_the_packet() {
    // Buffer a stream for one read, then revert the flag as a per-call
    // policy would have to.
    let mut file = InputFile::from_container("memory.mkv", interleaved(4, 2)).expect("open");
    file.set_stream_buffered(1, true).expect("buffer");
    assert!(file.read_next_packet(1).expect("read"));
    file.set_stream_buffered(1, false).expect("revert");

    // Unbuffered streams hold nothing, so the routed packet is gone...
    assert_eq!(file.stream(1).map(|stream| stream.queued_packets()), Some(0));
    assert_eq!(file.pop_packet(1).expect("pop"), None);

    // ...and the container has moved past it.
    file.set_stream_buffered(1, true).expect("buffer");
    assert!(file.read_next_packet(1).expect("read"));
    let packet = file.pop_packet(1).expect("pop").expect("packet");
    assert_eq!(packet.pts(), Some(support::AUDIO_PACKET_TICKS));
}
