//! Sequence-number arithmetic
//!
//! Go-Back-N packets carry sequence numbers reduced modulo a configurable
//! space size `K`, while the sender and receiver track positions with
//! unbounded `u64` counters. This module owns the mapping between the two
//! and the wraparound-aware comparisons the protocol depends on.

use std::fmt;

/// Modular sequence-number space of size `K`.
///
/// The endpoints never compare raw slots directly; every ordering question
/// is phrased as a forward modulo distance, which stays correct across the
/// wrap boundary as long as the window size is below `K` (enforced at
/// configuration validation).
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct SeqSpace {
    modulus: u64,
}

impl SeqSpace {
    /// Create a sequence space of size `modulus`.
    ///
    /// Callers construct this from a validated configuration; `modulus`
    /// must be at least 2.
    pub fn new(modulus: u64) -> Self {
        debug_assert!(modulus >= 2, "sequence space must hold at least 2 slots");
        SeqSpace { modulus }
    }

    /// Size of the space (`K`).
    #[inline]
    pub fn modulus(self) -> u64 {
        self.modulus
    }

    /// Reduce an unbounded counter to its in-window slot.
    #[inline]
    pub fn slot(self, counter: u64) -> u64 {
        counter % self.modulus
    }

    /// The slot immediately before `slot`, wrapping at zero.
    ///
    /// This is the cumulative acknowledgment number for a receiver whose
    /// next expected slot is `slot`: "everything up to here arrived in
    /// order". With nothing accepted yet it yields `K - 1`.
    #[inline]
    pub fn prev_slot(self, slot: u64) -> u64 {
        if slot == 0 {
            self.modulus - 1
        } else {
            slot - 1
        }
    }

    /// Forward modulo distance from `from` to `to` (both slots).
    ///
    /// Phrased as subtractions only, so the full `u64` range of `K` is
    /// usable without intermediate overflow.
    #[inline]
    pub fn forward_distance(self, from: u64, to: u64) -> u64 {
        if to >= from {
            to - from
        } else {
            self.modulus - (from - to)
        }
    }

    /// Decide whether a cumulative acknowledgment for slot `ack_slot`
    /// advances a window based at the unbounded counter `send_base` with
    /// `outstanding` unacknowledged packets.
    ///
    /// Returns the number of packets the acknowledgment covers, or `None`
    /// for a duplicate or stale acknowledgment. The delta is accepted only
    /// when it lies within the outstanding range, so an old acknowledgment
    /// that aliases a future slot after wraparound cannot slide the window.
    pub fn ack_advance(self, send_base: u64, outstanding: u64, ack_slot: u64) -> Option<u64> {
        let base_slot = self.slot(send_base);
        let after_ack = match self.slot(ack_slot) + 1 {
            next if next == self.modulus => 0,
            next => next,
        };
        let delta = self.forward_distance(base_slot, after_ack);
        if delta >= 1 && delta <= outstanding {
            Some(delta)
        } else {
            None
        }
    }
}

impl fmt::Debug for SeqSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeqSpace(K={})", self.modulus)
    }
}
