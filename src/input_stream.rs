//! Per-stream descriptors and packet queues.
//!
//! An [`InputStream`] pairs the container-reported [`StreamParameters`] of a
//! stream with a "buffered" flag and a FIFO of packets waiting to be popped
//! by the consumer. Only buffered streams ever hold packets: turning the flag
//! off drops whatever is queued.

use std::collections::VecDeque;

use ffmpeg_next::Rational;

use crate::{
    container::{MediaKind, StreamParameters},
    packet::Packet,
};

/// One logical stream of an [`InputFile`](crate::InputFile).
#[derive(Debug, Clone)]
pub struct InputStream {
    parameters: StreamParameters,
    buffered: bool,
    queue: VecDeque<Packet>,
}

impl InputStream {
    pub(crate) fn new(parameters: StreamParameters) -> Self {
        Self {
            parameters,
            buffered: false,
            queue: VecDeque::new(),
        }
    }

    /// Stream index inside the file.
    pub fn index(&self) -> usize {
        self.parameters.index
    }

    /// Media kind of the stream.
    pub fn kind(&self) -> MediaKind {
        self.parameters.kind
    }

    /// Time base of the stream's timestamps, if known.
    pub fn time_base(&self) -> Option<Rational> {
        self.parameters.time_base
    }

    /// Container-reported parameters.
    pub fn parameters(&self) -> &StreamParameters {
        &self.parameters
    }

    /// Whether packets for this stream are retained while routing.
    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    /// Enable or disable buffering. Disabling drops every queued packet.
    pub fn set_buffered(&mut self, buffered: bool) {
        if self.buffered && !buffered {
            log::debug!(
                "Stream {} no longer buffered, dropping {} queued packet(s)",
                self.index(),
                self.queue.len()
            );
            self.queue.clear();
        }
        self.buffered = buffered;
    }

    /// Number of packets waiting to be popped.
    pub fn queued_packets(&self) -> usize {
        self.queue.len()
    }

    /// Remove and return the oldest queued packet.
    ///
    /// `None` means no packet is available *right now*; the container may
    /// still hold packets for this stream that have not been routed yet.
    pub fn pop_packet(&mut self) -> Option<Packet> {
        self.queue.pop_front()
    }

    /// Append a routed packet. Dropped when the stream is not buffered.
    pub(crate) fn push_packet(&mut self, packet: Packet) -> bool {
        if !self.buffered {
            return false;
        }
        self.queue.push_back(packet);
        true
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> InputStream {
        InputStream::new(StreamParameters::new(
            0,
            MediaKind::Video,
            Some(Rational::new(1, 25)),
        ))
    }

    fn packet(pts: i64) -> Packet {
        Packet::new(0, Some(pts), Some(pts), 1, pts == 0, Rational::new(1, 25), vec![0; 4])
    }

    #[test]
    fn unbuffered_stream_drops_pushes() {
        let mut stream = stream();
        assert!(!stream.is_buffered());
        assert!(!stream.push_packet(packet(0)));
        assert_eq!(stream.queued_packets(), 0);
        assert!(stream.pop_packet().is_none());
    }

    #[test]
    fn buffered_stream_is_fifo() {
        let mut stream = stream();
        stream.set_buffered(true);
        for pts in 0..3 {
            assert!(stream.push_packet(packet(pts)));
        }
        let order: Vec<_> = std::iter::from_fn(|| stream.pop_packet())
            .map(|p| p.pts().unwrap())
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn disabling_buffering_drains_queue() {
        let mut stream = stream();
        stream.set_buffered(true);
        stream.push_packet(packet(0));
        stream.push_packet(packet(1));

        stream.set_buffered(false);
        assert_eq!(stream.queued_packets(), 0);

        // Re-enabling does not resurrect anything.
        stream.set_buffered(true);
        assert!(stream.pop_packet().is_none());
    }

    #[test]
    fn set_buffered_is_idempotent() {
        let mut stream = stream();
        stream.set_buffered(true);
        stream.push_packet(packet(0));
        stream.set_buffered(true);
        assert_eq!(stream.queued_packets(), 1);
    }
}
