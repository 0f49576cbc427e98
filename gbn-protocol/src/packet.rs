//! In-process packet values
//!
//! The simulation never serializes anything: "packets" are plain values
//! copied into the channel's queues. A packet is either a data packet
//! carrying one payload symbol or a cumulative acknowledgment, both tagged
//! with an in-window slot number (the unbounded counter reduced mod `K`).

use std::fmt;

/// Data packet: one slot number plus one payload symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPacket {
    /// Sequence slot (counter mod `K`).
    pub slot: u64,
    /// Payload symbol being transferred.
    pub payload: char,
}

impl DataPacket {
    /// Create a new data packet.
    pub fn new(slot: u64, payload: char) -> Self {
        DataPacket { slot, payload }
    }
}

/// Cumulative acknowledgment: "everything up to and including `slot`
/// arrived in order".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPacket {
    /// Highest in-order slot received.
    pub slot: u64,
}

impl AckPacket {
    /// Create a new acknowledgment packet.
    pub fn new(slot: u64) -> Self {
        AckPacket { slot }
    }
}

/// Unified packet type (either data or acknowledgment).
///
/// The channel routes on this discriminator: data packets travel on the
/// receiver-bound path, acknowledgments on the sender-bound path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    Data(DataPacket),
    Ack(AckPacket),
}

impl Packet {
    /// Check if this is a data packet.
    pub fn is_data(&self) -> bool {
        matches!(self, Packet::Data(_))
    }

    /// Check if this is an acknowledgment.
    pub fn is_ack(&self) -> bool {
        matches!(self, Packet::Ack(_))
    }

    /// Get the sequence slot.
    pub fn slot(&self) -> u64 {
        match self {
            Packet::Data(p) => p.slot,
            Packet::Ack(p) => p.slot,
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packet::Data(p) => write!(f, "DATA(seq={}, data={})", p.slot, p.payload),
            Packet::Ack(p) => write!(f, "ACK(seq={})", p.slot),
        }
    }
}

impl From<DataPacket> for Packet {
    fn from(p: DataPacket) -> Packet {
        Packet::Data(p)
    }
}

impl From<AckPacket> for Packet {
    fn from(p: AckPacket) -> Packet {
        Packet::Ack(p)
    }
}
