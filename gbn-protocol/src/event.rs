//! Simulation event stream
//!
//! Every protocol action emits an [`Event`]: an observability side-channel
//! consumed by the CLI or a test harness, not part of the correctness
//! contract. Events fan out to any number of subscribers and are mirrored
//! to `tracing`.

use crate::packet::Packet;
use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// One observable protocol action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Sender handed a data packet to the channel.
    DataSent {
        slot: u64,
        payload: char,
        retransmission: bool,
    },
    /// Channel dropped a data packet (one-shot loss).
    DataDropped { slot: u64 },
    /// Channel dropped an acknowledgment (one-shot loss).
    AckDropped { slot: u64 },
    /// Receiver pulled a data packet off the channel.
    DataReceived { slot: u64, payload: char },
    /// Receiver accepted an in-order packet and advanced.
    DataAccepted { slot: u64, payload: char },
    /// Receiver discarded an out-of-order packet.
    OutOfOrder { slot: u64, expected_slot: u64 },
    /// Receiver emitted a cumulative acknowledgment.
    AckSent { slot: u64 },
    /// Sender pulled an acknowledgment off the channel.
    AckReceived { slot: u64 },
    /// A qualifying acknowledgment slid the window forward.
    WindowSlide { base_slot: u64, covered: u64 },
    /// The retransmission timer fired; the whole window goes again.
    Timeout { base_slot: u64, outstanding: u64 },
    /// Receiver accepted the final item of the transfer.
    TransferComplete,
    /// Sender observed the final acknowledgment.
    AllAcked,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use crate::packet::{AckPacket, DataPacket};
        match *self {
            Event::DataSent {
                slot,
                payload,
                retransmission,
            } => {
                let pkt: Packet = DataPacket::new(slot, payload).into();
                if retransmission {
                    write!(f, "[Sender] Retransmitting: {pkt}")
                } else {
                    write!(f, "[Sender] Sent: {pkt}")
                }
            }
            Event::DataDropped { slot } => write!(f, "[Channel] Packet {slot} dropped."),
            Event::AckDropped { slot } => write!(f, "[Channel] ACK {slot} dropped."),
            Event::DataReceived { slot, payload } => {
                let pkt: Packet = DataPacket::new(slot, payload).into();
                write!(f, "[Receiver] Received: {pkt}")
            }
            Event::DataAccepted { payload, .. } => write!(f, "[Receiver] Accepted: {payload}"),
            Event::OutOfOrder {
                slot,
                expected_slot,
            } => write!(
                f,
                "[Receiver] Out-of-order. Expected {expected_slot}, got {slot}."
            ),
            Event::AckSent { slot } => {
                let pkt: Packet = AckPacket::new(slot).into();
                write!(f, "[Receiver] Sent: {pkt}")
            }
            Event::AckReceived { slot } => {
                let pkt: Packet = AckPacket::new(slot).into();
                write!(f, "[Sender] Received: {pkt}")
            }
            Event::WindowSlide { base_slot, covered } => write!(
                f,
                "[Sender] Window slides to {base_slot} ({covered} acknowledged)."
            ),
            Event::Timeout {
                base_slot,
                outstanding,
            } => write!(
                f,
                "[Sender] Timeout. Resending {outstanding} packet(s) from {base_slot}."
            ),
            Event::TransferComplete => write!(f, "[Receiver] All data received."),
            Event::AllAcked => write!(f, "[Sender] All data acknowledged."),
        }
    }
}

struct BusInner {
    subscribers: Mutex<Vec<Sender<Event>>>,
}

/// Cloneable fan-out handle for the event stream.
///
/// Emitting is safe from any thread; a subscriber that went away is
/// silently skipped.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        EventBus {
            inner: Arc::new(BusInner {
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Attach a subscriber and return its receiving end.
    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = unbounded();
        self.inner.subscribers.lock().push(tx);
        rx
    }

    /// Publish one event to the log and every subscriber.
    pub fn emit(&self, event: Event) {
        tracing::debug!(target: "gbn", "{event}");
        let subscribers = self.inner.subscribers.lock();
        for tx in subscribers.iter() {
            let _ = tx.send(event.clone());
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters derived from a recorded event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// First transmissions of data packets.
    pub data_sent: u64,
    /// Retransmitted data packets (all timeouts combined).
    pub retransmissions: u64,
    /// Data packets dropped by the channel.
    pub data_dropped: u64,
    /// Acknowledgments dropped by the channel.
    pub acks_dropped: u64,
    /// Acknowledgments the receiver emitted.
    pub acks_sent: u64,
    /// Acknowledgments the sender consumed.
    pub acks_received: u64,
    /// Retransmission timer expirations.
    pub timeouts: u64,
}

impl SimulationStats {
    /// Tally counters from a recorded event stream.
    pub fn from_events(events: &[Event]) -> Self {
        let mut stats = SimulationStats::default();
        for event in events {
            match event {
                Event::DataSent {
                    retransmission: false,
                    ..
                } => stats.data_sent += 1,
                Event::DataSent {
                    retransmission: true,
                    ..
                } => stats.retransmissions += 1,
                Event::DataDropped { .. } => stats.data_dropped += 1,
                Event::AckDropped { .. } => stats.acks_dropped += 1,
                Event::AckSent { .. } => stats.acks_sent += 1,
                Event::AckReceived { .. } => stats.acks_received += 1,
                Event::Timeout { .. } => stats.timeouts += 1,
                _ => {}
            }
        }
        stats
    }
}
