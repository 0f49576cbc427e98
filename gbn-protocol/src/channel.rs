//! Network channel model
//!
//! An asynchronous, delay-inducing, optionally-lossy duplex link. Each
//! direction (sender-bound, receiver-bound) is driven by one scheduler
//! thread that owns a time-ordered heap of pending deliveries, so a run
//! spawns exactly two delivery workers no matter how many packets fly.
//!
//! Loss is evaluated when a delivery comes due, against a one-shot loss set
//! owned by the scheduler: the first packet matching a configured slot is
//! discarded and the slot is spent, so a retransmission of the same slot
//! goes through. Deliveries scheduled with equal delay arrive in submission
//! order; unequal delays may reorder, exactly as independent timed delivery
//! would.

use crate::config::SimulationConfig;
use crate::event::{Event, EventBus};
use crate::packet::Packet;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Which way a scheduler is pushing packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Data path: sender to receiver.
    ToReceiver,
    /// Acknowledgment path: receiver to sender.
    ToSender,
}

/// One delivery waiting for its deadline.
struct PendingDelivery {
    due: Instant,
    /// Submission order, tiebreak for equal deadlines (keeps FIFO).
    order: u64,
    packet: Packet,
}

impl PartialEq for PendingDelivery {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.order == other.order
    }
}

impl Eq for PendingDelivery {}

impl PartialOrd for PendingDelivery {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingDelivery {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due.cmp(&other.due).then(self.order.cmp(&other.order))
    }
}

/// Scheduler state for one direction.
struct Scheduler {
    input: Receiver<(Instant, Packet)>,
    output: Sender<Packet>,
    loss: HashSet<u64>,
    direction: Direction,
    events: EventBus,
}

impl Scheduler {
    fn run(mut self) {
        let mut pending: BinaryHeap<Reverse<PendingDelivery>> = BinaryHeap::new();
        let mut next_order = 0u64;
        let mut open = true;

        loop {
            while let Some(Reverse(delivery)) = pending.pop() {
                if delivery.due <= Instant::now() {
                    self.deliver(delivery.packet);
                } else {
                    pending.push(Reverse(delivery));
                    break;
                }
            }

            if open {
                let wait = pending
                    .peek()
                    .map(|Reverse(p)| p.due.saturating_duration_since(Instant::now()));

                let received = match wait {
                    None => self.input.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    Some(d) => self.input.recv_timeout(d),
                };

                match received {
                    Ok((due, packet)) => {
                        pending.push(Reverse(PendingDelivery {
                            due,
                            order: next_order,
                            packet,
                        }));
                        next_order += 1;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => open = false,
                }
            } else if let Some(Reverse(next)) = pending.peek() {
                // Input closed; honor the remaining deadlines, then exit.
                thread::sleep(next.due.saturating_duration_since(Instant::now()));
            } else {
                break;
            }
        }
    }

    fn deliver(&mut self, packet: Packet) {
        let slot = packet.slot();
        if self.loss.remove(&slot) {
            let event = match self.direction {
                Direction::ToReceiver => Event::DataDropped { slot },
                Direction::ToSender => Event::AckDropped { slot },
            };
            self.events.emit(event);
            return;
        }
        // Consumer may already be gone during teardown.
        let _ = self.output.send(packet);
    }
}

struct ChannelInner {
    to_receiver: Sender<(Instant, Packet)>,
    to_sender: Sender<(Instant, Packet)>,
    delay: Duration,
}

/// Handle for pushing packets into the link. Cheap to clone; every clone
/// feeds the same pair of scheduler threads.
#[derive(Clone)]
pub struct NetworkChannel {
    inner: Arc<ChannelInner>,
}

/// Consumer ends of the two delivery paths.
pub struct ChannelEndpoints {
    /// Receiver-bound deliveries (data packets).
    pub data_rx: Receiver<Packet>,
    /// Sender-bound deliveries (acknowledgments).
    pub ack_rx: Receiver<Packet>,
}

/// Join handles for the two scheduler threads.
pub struct ChannelWorkers {
    handles: Vec<JoinHandle<()>>,
}

impl ChannelWorkers {
    /// Wait for both schedulers to drain and exit.
    ///
    /// Call after every [`NetworkChannel`] clone has been dropped,
    /// otherwise this blocks forever.
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

impl NetworkChannel {
    /// Build the duplex link and start its two scheduler threads.
    pub fn new(
        config: &SimulationConfig,
        events: EventBus,
    ) -> (NetworkChannel, ChannelEndpoints, ChannelWorkers) {
        let (data_in_tx, data_in_rx) = unbounded();
        let (ack_in_tx, ack_in_rx) = unbounded();
        let (data_out_tx, data_out_rx) = unbounded();
        let (ack_out_tx, ack_out_rx) = unbounded();

        let to_receiver = Scheduler {
            input: data_in_rx,
            output: data_out_tx,
            loss: config.packet_loss.clone(),
            direction: Direction::ToReceiver,
            events: events.clone(),
        };
        let to_sender = Scheduler {
            input: ack_in_rx,
            output: ack_out_tx,
            loss: config.ack_loss.clone(),
            direction: Direction::ToSender,
            events,
        };

        let handles = vec![
            thread::spawn(move || to_receiver.run()),
            thread::spawn(move || to_sender.run()),
        ];

        let channel = NetworkChannel {
            inner: Arc::new(ChannelInner {
                to_receiver: data_in_tx,
                to_sender: ack_in_tx,
                delay: config.propagation_delay,
            }),
        };
        let endpoints = ChannelEndpoints {
            data_rx: data_out_rx,
            ack_rx: ack_out_rx,
        };

        (channel, endpoints, ChannelWorkers { handles })
    }

    /// Schedule an asynchronous delivery of `packet`.
    ///
    /// The packet is routed by its discriminator and becomes visible to the
    /// consumer after the propagation delay, unless its slot is spent
    /// against the direction's loss set.
    pub fn send(&self, packet: Packet) {
        let due = Instant::now() + self.inner.delay;
        let tx = if packet.is_ack() {
            &self.inner.to_sender
        } else {
            &self.inner.to_receiver
        };
        // Scheduler outliving its inputs is a teardown-only condition.
        let _ = tx.send((due, packet));
    }
}
