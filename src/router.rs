//! Packet routing.
//!
//! [`PacketRouter`] pulls packets from a [`ContainerHandle`] in interleave
//! order and hands each one to the [`InputStream`] that owns it. Packets of
//! streams that are not buffered are read and dropped, so uninteresting
//! streams never grow a queue while the container keeps advancing.

use crate::{
    container::{ContainerError, ContainerHandle},
    input_stream::InputStream,
};

/// Routes container packets into per-stream queues.
pub(crate) struct PacketRouter<'a, C: ContainerHandle> {
    container: &'a mut C,
    streams: &'a mut [InputStream],
    packets_read: u64,
}

impl<'a, C: ContainerHandle> PacketRouter<'a, C> {
    pub(crate) fn new(container: &'a mut C, streams: &'a mut [InputStream]) -> Self {
        Self {
            container,
            streams,
            packets_read: 0,
        }
    }

    /// Packets pulled from the container by this router so far.
    pub(crate) fn packets_read(&self) -> u64 {
        self.packets_read
    }

    /// Read packets until one for `target` has been queued.
    ///
    /// Returns `Ok(true)` right after the target's queue gains a packet and
    /// `Ok(false)` at end of stream. Packets of other buffered streams are
    /// queued in arrival order along the way; all others are discarded.
    /// The target must be buffered, otherwise its packets are dropped too
    /// and the call only returns once the container is exhausted.
    pub(crate) fn route_until(&mut self, target: usize) -> Result<bool, ContainerError> {
        loop {
            let Some(packet) = self.container.read_packet()? else {
                log::debug!("End of stream while routing for stream {target}");
                return Ok(false);
            };
            self.packets_read += 1;

            let index = packet.stream_index();
            let Some(stream) = self.streams.get_mut(index) else {
                log::trace!("Discarding packet for unknown stream {index}");
                continue;
            };

            if stream.push_packet(packet) {
                log::trace!(
                    "Queued packet for stream {index} ({} pending)",
                    stream.queued_packets()
                );
                if index == target {
                    return Ok(true);
                }
            } else {
                log::trace!("Discarding packet for unbuffered stream {index}");
            }
        }
    }
}
