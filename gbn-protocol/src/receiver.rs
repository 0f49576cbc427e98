//! Go-Back-N receive side
//!
//! The receiver enforces strict in-order acceptance on top of an unordered,
//! lossy link: an exact match on the expected slot is appended to the
//! delivered output, anything else is discarded, and every arrival is
//! answered with a cumulative acknowledgment for the highest contiguous
//! prefix. No timers, no buffering of out-of-order packets.

use crate::channel::NetworkChannel;
use crate::event::{Event, EventBus};
use crate::packet::{AckPacket, Packet};
use crate::sequence::SeqSpace;
use crossbeam::channel::{select, Receiver, TryRecvError};

/// Receive-side state for one run. Touched only by its own processing
/// loop; needs no locking.
pub struct GbnReceiver {
    space: SeqSpace,
    /// Next counter to accept (unbounded; the wire carries its slot).
    expected: u64,
    /// Accepted payloads, in order. This is the delivered output.
    delivered: Vec<char>,
    /// Total items in the whole transfer, for completion detection.
    total: u64,
    channel: NetworkChannel,
    data_rx: Receiver<Packet>,
    shutdown_rx: Receiver<()>,
    events: EventBus,
}

impl GbnReceiver {
    /// Create a receiver for a transfer of `total` items.
    ///
    /// The loop stops when `shutdown_rx` fires or disconnects; the driver
    /// signals it once the sender has observed the final acknowledgment.
    pub fn new(
        space: SeqSpace,
        total: u64,
        channel: NetworkChannel,
        data_rx: Receiver<Packet>,
        shutdown_rx: Receiver<()>,
        events: EventBus,
    ) -> Self {
        GbnReceiver {
            space,
            expected: 0,
            delivered: Vec::new(),
            total,
            channel,
            data_rx,
            shutdown_rx,
            events,
        }
    }

    /// Run the processing loop until shutdown, then hand back the
    /// delivered output.
    ///
    /// The loop deliberately outlives local completion: a retransmission
    /// arriving after the last item (say, because its acknowledgment was
    /// lost) still gets re-acknowledged. Pending deliveries are drained
    /// before a shutdown signal is honored.
    pub fn run(mut self) -> Vec<char> {
        loop {
            // Drain whatever is already queued before blocking.
            match self.data_rx.try_recv() {
                Ok(packet) => {
                    self.process(packet);
                    continue;
                }
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            select! {
                recv(self.data_rx) -> msg => match msg {
                    Ok(packet) => self.process(packet),
                    Err(_) => break,
                },
                recv(self.shutdown_rx) -> _ => break,
            }
        }
        self.delivered
    }

    fn process(&mut self, packet: Packet) {
        let data = match packet {
            Packet::Data(data) => data,
            // Routing guarantees only data packets land here.
            Packet::Ack(_) => return,
        };

        self.events.emit(Event::DataReceived {
            slot: data.slot,
            payload: data.payload,
        });

        let expected_slot = self.space.slot(self.expected);
        if data.slot == expected_slot {
            self.delivered.push(data.payload);
            self.expected += 1;
            self.events.emit(Event::DataAccepted {
                slot: data.slot,
                payload: data.payload,
            });
            if self.expected == self.total {
                self.events.emit(Event::TransferComplete);
            }
        } else {
            self.events.emit(Event::OutOfOrder {
                slot: data.slot,
                expected_slot,
            });
        }

        // Unconditional cumulative acknowledgment: the last slot received
        // in order, regardless of whether this packet advanced anything.
        let ack_slot = self.space.prev_slot(self.space.slot(self.expected));
        self.channel.send(AckPacket::new(ack_slot).into());
        self.events.emit(Event::AckSent { slot: ack_slot });
    }
}
