//! Packet accumulation and missing-sequence computation.
//!
//! [`PacketStore`] collects every packet decoded during a run.  It is owned
//! by the orchestrator and mutated only from the decode step; gap detection
//! and finalization read from it.  No dedup is enforced here — the resend
//! flow only ever requests sequences it knows are absent, so a sequence is
//! never added twice.

use std::collections::HashSet;

use crate::packet::Packet;

/// Accumulated packets for one run.
#[derive(Debug, Default)]
pub struct PacketStore {
    packets: Vec<Packet>,
}

impl PacketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decoded packet.
    pub fn add(&mut self, packet: Packet) {
        self.packets.push(packet);
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Sequence numbers observed so far.
    pub fn sequences(&self) -> HashSet<i32> {
        self.packets.iter().map(|p| p.sequence).collect()
    }

    /// Sequence numbers missing below the maximum observed, **sorted
    /// ascending**.
    ///
    /// Sequences logically start at 1, so the missing set is
    /// `{1..max-1} \ observed`.  The presence lookup is a hash set, keeping
    /// the computation linear in the maximum sequence rather than quadratic
    /// in the packet count.  An empty store yields an empty result — with no
    /// packets there is nothing to infer.
    pub fn missing_sequences(&self) -> Vec<i32> {
        let observed = self.sequences();
        let Some(max) = observed.iter().copied().max() else {
            return Vec::new();
        };
        (1..max).filter(|seq| !observed.contains(seq)).collect()
    }

    /// Consume the store, returning packets sorted ascending by sequence.
    ///
    /// The sort is stable, so equal sequences (which a well-behaved run never
    /// produces) keep arrival order.
    pub fn into_sorted(mut self) -> Vec<Packet> {
        self.packets.sort_by_key(|p| p.sequence);
        self.packets
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Side;

    fn pkt(seq: i32) -> Packet {
        Packet {
            symbol: "AAPL".into(),
            side: Side::Buy,
            quantity: 1,
            price: 10,
            sequence: seq,
        }
    }

    fn store_with(seqs: &[i32]) -> PacketStore {
        let mut store = PacketStore::new();
        for &s in seqs {
            store.add(pkt(s));
        }
        store
    }

    #[test]
    fn empty_store_has_no_missing_sequences() {
        assert!(PacketStore::new().missing_sequences().is_empty());
    }

    #[test]
    fn contiguous_sequences_have_no_gaps() {
        let store = store_with(&[1, 2, 3, 4, 5]);
        assert!(store.missing_sequences().is_empty());
    }

    #[test]
    fn gaps_are_detected_and_sorted() {
        let store = store_with(&[1, 2, 4, 5, 7]);
        assert_eq!(store.missing_sequences(), vec![3, 6]);
    }

    #[test]
    fn gaps_found_regardless_of_arrival_order() {
        let store = store_with(&[7, 1, 5, 2, 4]);
        assert_eq!(store.missing_sequences(), vec![3, 6]);
    }

    #[test]
    fn leading_gap_is_detected() {
        // Sequences start at 1; if the first packet seen is 3, both 1 and 2
        // are missing.
        let store = store_with(&[3]);
        assert_eq!(store.missing_sequences(), vec![1, 2]);
    }

    #[test]
    fn max_sequence_itself_is_never_missing() {
        let store = store_with(&[1, 3]);
        assert_eq!(store.missing_sequences(), vec![2]);
    }

    #[test]
    fn sequences_returns_observed_set() {
        let store = store_with(&[2, 5]);
        let seqs = store.sequences();
        assert!(seqs.contains(&2));
        assert!(seqs.contains(&5));
        assert_eq!(seqs.len(), 2);
    }

    #[test]
    fn into_sorted_orders_by_sequence() {
        let store = store_with(&[4, 1, 3, 2]);
        let sorted = store.into_sorted();
        let seqs: Vec<i32> = sorted.iter().map(|p| p.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4]);
    }

    #[test]
    fn len_tracks_additions() {
        let mut store = PacketStore::new();
        assert!(store.is_empty());
        store.add(pkt(1));
        store.add(pkt(2));
        assert_eq!(store.len(), 2);
    }
}
