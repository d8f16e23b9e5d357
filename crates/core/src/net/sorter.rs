use std::collections::{BTreeMap, BTreeSet};

use super::envelope::{Frame, Reliability};

/// Upper bound on gaps remembered for `Reliable` dedupe.
const MAX_MISSING_RELIABLE: usize = 4096;
/// Upper bound on out-of-order frames held for `ReliableOrdered`.
const MAX_BACKED_UP_ORDERED: usize = 1024;
/// Frames further than this ahead of the next expected id are dropped.
const MAX_ID_JUMP: u64 = 1 << 20;

/// Id after `id`, or `None` when `id` is beyond the accepted window.
fn advance(next: u64, id: u64) -> Option<u64> {
    if id - next > MAX_ID_JUMP {
        log::warn!("Dropping frame {id}, too far ahead of {next}");
        return None;
    }
    id.checked_add(1)
}

/// What a received frame turned into.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Sorted {
    /// Bodies ready for dispatch, in delivery order.
    pub bodies: Vec<Vec<u8>>,
    /// Ack owed to the sender for a reliable frame.
    pub ack: Option<(Reliability, u64)>,
}

impl Sorted {
    fn deliver(body: &[u8]) -> Self {
        Self {
            bodies: vec![body.to_vec()],
            ack: None,
        }
    }

    fn acked(reliability: Reliability, id: u64, bodies: Vec<Vec<u8>>) -> Self {
        Self {
            bodies,
            ack: Some((reliability, id)),
        }
    }
}

/// Receive side of the transport. Applies each reliability class's delivery
/// rule.
#[derive(Debug, Default)]
pub struct PacketSorter {
    next_sequenced: u64,
    next_reliable: u64,
    missing_reliable: BTreeSet<u64>,
    next_ordered: u64,
    backed_up_ordered: BTreeMap<u64, Vec<u8>>,
}

impl PacketSorter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(&mut self, frame: Frame<'_>) -> Sorted {
        match frame.reliability {
            Reliability::Unreliable => Sorted::deliver(frame.body),
            Reliability::UnreliableSequenced => self.sort_sequenced(frame.id, frame.body),
            Reliability::Reliable => self.sort_reliable(frame.id, frame.body),
            Reliability::ReliableOrdered => self.sort_ordered(frame.id, frame.body),
        }
    }

    fn sort_sequenced(&mut self, id: u64, body: &[u8]) -> Sorted {
        if id < self.next_sequenced {
            return Sorted::default();
        }
        let Some(next) = advance(self.next_sequenced, id) else {
            return Sorted::default();
        };
        self.next_sequenced = next;
        Sorted::deliver(body)
    }

    fn sort_reliable(&mut self, id: u64, body: &[u8]) -> Sorted {
        let reliability = Reliability::Reliable;

        if id >= self.next_reliable {
            // left unacked so a genuine frame is resent once the gap closes
            let Some(next) = advance(self.next_reliable, id) else {
                return Sorted::default();
            };

            let first_missing = self
                .next_reliable
                .max(id.saturating_sub(MAX_MISSING_RELIABLE as u64));
            for missing in first_missing..id {
                if self.missing_reliable.len() >= MAX_MISSING_RELIABLE {
                    self.missing_reliable.pop_first();
                }
                self.missing_reliable.insert(missing);
            }
            self.next_reliable = next;
            return Sorted::acked(reliability, id, vec![body.to_vec()]);
        }

        if self.missing_reliable.remove(&id) {
            return Sorted::acked(reliability, id, vec![body.to_vec()]);
        }

        // duplicate, still acked so the sender stops resending
        Sorted::acked(reliability, id, Vec::new())
    }

    fn sort_ordered(&mut self, id: u64, body: &[u8]) -> Sorted {
        let reliability = Reliability::ReliableOrdered;

        if id < self.next_ordered {
            return Sorted::acked(reliability, id, Vec::new());
        }

        if id > self.next_ordered {
            if id - self.next_ordered > MAX_ID_JUMP {
                log::warn!("Dropping ordered frame {id}, expecting {}", self.next_ordered);
                return Sorted::default();
            }
            if !self.backed_up_ordered.contains_key(&id)
                && self.backed_up_ordered.len() >= MAX_BACKED_UP_ORDERED
            {
                log::warn!("Ordered backlog full, dropping frame {id} unacked");
                return Sorted::default();
            }
            self.backed_up_ordered
                .entry(id)
                .or_insert_with(|| body.to_vec());
            return Sorted::acked(reliability, id, Vec::new());
        }

        let mut bodies = vec![body.to_vec()];
        self.next_ordered += 1;
        while let Some(next) = self.backed_up_ordered.remove(&self.next_ordered) {
            bodies.push(next);
            self.next_ordered += 1;
        }

        Sorted::acked(reliability, id, bodies)
    }

    pub fn backed_up_count(&self) -> usize {
        self.backed_up_ordered.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(reliability: Reliability, id: u64, body: &[u8]) -> Frame<'_> {
        Frame {
            reliability,
            id,
            body,
        }
    }

    fn permutations(items: &[u64]) -> Vec<Vec<u64>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn test_ordered_delivery_for_every_arrival_order() {
        let ids: Vec<u64> = (0..5).collect();

        for order in permutations(&ids) {
            let mut sorter = PacketSorter::new();
            let mut delivered = Vec::new();

            for id in &order {
                let body = [*id as u8];
                let sorted = sorter.sort(frame(Reliability::ReliableOrdered, *id, &body));
                assert_eq!(sorted.ack, Some((Reliability::ReliableOrdered, *id)));
                delivered.extend(sorted.bodies.into_iter().map(|b| b[0] as u64));
            }

            assert_eq!(delivered, ids, "arrival order {order:?}");
            assert_eq!(sorter.backed_up_count(), 0);
        }
    }

    #[test]
    fn test_ordered_duplicate_acked_not_redelivered() {
        let mut sorter = PacketSorter::new();

        assert_eq!(sorter.sort(frame(Reliability::ReliableOrdered, 1, &[1])).bodies.len(), 0);
        assert_eq!(sorter.sort(frame(Reliability::ReliableOrdered, 1, &[1])).bodies.len(), 0);
        assert_eq!(sorter.sort(frame(Reliability::ReliableOrdered, 0, &[0])).bodies.len(), 2);

        let again = sorter.sort(frame(Reliability::ReliableOrdered, 0, &[0]));
        assert!(again.bodies.is_empty());
        assert_eq!(again.ack, Some((Reliability::ReliableOrdered, 0)));
    }

    #[test]
    fn test_sequenced_drops_stale() {
        let mut sorter = PacketSorter::new();
        let mut delivered = Vec::new();

        for id in [5u64, 3, 7, 6] {
            let body = [id as u8];
            let sorted = sorter.sort(frame(Reliability::UnreliableSequenced, id, &body));
            assert!(sorted.ack.is_none());
            delivered.extend(sorted.bodies.into_iter().map(|b| b[0]));
        }

        assert_eq!(delivered, vec![5, 7]);
    }

    #[test]
    fn test_reliable_delivers_immediately_once() {
        let mut sorter = PacketSorter::new();

        assert_eq!(sorter.sort(frame(Reliability::Reliable, 2, &[2])).bodies, vec![vec![2]]);
        assert_eq!(sorter.sort(frame(Reliability::Reliable, 0, &[0])).bodies, vec![vec![0]]);
        assert!(sorter.sort(frame(Reliability::Reliable, 2, &[2])).bodies.is_empty());
        assert!(sorter.sort(frame(Reliability::Reliable, 0, &[0])).bodies.is_empty());

        let late = sorter.sort(frame(Reliability::Reliable, 1, &[1]));
        assert_eq!(late.bodies, vec![vec![1]]);
        assert_eq!(late.ack, Some((Reliability::Reliable, 1)));
    }

    #[test]
    fn test_sequenced_max_id_dropped() {
        let mut sorter = PacketSorter::new();
        sorter.sort(frame(Reliability::UnreliableSequenced, 0, &[0]));

        let sorted = sorter.sort(frame(Reliability::UnreliableSequenced, u64::MAX, &[1]));
        assert!(sorted.bodies.is_empty());

        // the bogus id did not poison later frames
        let sorted = sorter.sort(frame(Reliability::UnreliableSequenced, 1, &[2]));
        assert_eq!(sorted.bodies, vec![vec![2]]);
    }

    #[test]
    fn test_reliable_far_ahead_id_dropped_quickly() {
        let mut sorter = PacketSorter::new();
        let start = std::time::Instant::now();

        let sorted = sorter.sort(frame(Reliability::Reliable, 200_000_000, &[1]));
        assert!(sorted.bodies.is_empty());
        assert!(sorted.ack.is_none());

        let sorted = sorter.sort(frame(Reliability::Reliable, u64::MAX, &[1]));
        assert!(sorted.bodies.is_empty());
        assert!(start.elapsed() < std::time::Duration::from_secs(1));

        assert_eq!(sorter.sort(frame(Reliability::Reliable, 0, &[0])).bodies, vec![vec![0]]);
    }

    #[test]
    fn test_reliable_wide_gap_remembers_recent_ids() {
        let mut sorter = PacketSorter::new();
        let id = MAX_ID_JUMP;

        assert_eq!(sorter.sort(frame(Reliability::Reliable, id, &[1])).bodies.len(), 1);
        assert!(sorter.missing_reliable.len() <= MAX_MISSING_RELIABLE);
        assert_eq!(sorter.sort(frame(Reliability::Reliable, id - 1, &[2])).bodies.len(), 1);
    }

    #[test]
    fn test_ordered_far_ahead_id_dropped() {
        let mut sorter = PacketSorter::new();

        let sorted = sorter.sort(frame(Reliability::ReliableOrdered, u64::MAX, &[1]));
        assert_eq!(sorted, Sorted::default());
        assert_eq!(sorter.backed_up_count(), 0);
    }

    #[test]
    fn test_unreliable_passes_through() {
        let mut sorter = PacketSorter::new();
        let sorted = sorter.sort(frame(Reliability::Unreliable, 0, &[9]));

        assert_eq!(sorted.bodies, vec![vec![9]]);
        assert!(sorted.ack.is_none());
    }
}
