/// Per-node message bookkeeping.
///
/// Each node exclusively owns one `MessageLog`: a mapping from round number to
/// sender ID to the ordered sequence of decision values received from that
/// sender in that round. A sender can legitimately deliver more than one value
/// for the same round (the same order can travel different relay chains), so
/// the leaf is a sequence, never a single slot.
///
/// The log is append-only: entries are never deleted, rewritten, or reordered
/// once recorded.

use crate::types::{Decision, NodeId, Round};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    entries: BTreeMap<Round, BTreeMap<NodeId, Vec<Decision>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received value under `(round, sender)`. Existing values for
    /// the same key are retained; this never overwrites.
    pub fn append(&mut self, round: Round, sender: NodeId, value: Decision) {
        self.entries
            .entry(round)
            .or_default()
            .entry(sender)
            .or_default()
            .push(value);
    }

    /// Values received from `sender` in `round`, in arrival order.
    pub fn values(&self, round: Round, sender: NodeId) -> &[Decision] {
        self.entries
            .get(&round)
            .and_then(|senders| senders.get(&sender))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First value received from `sender` in `round`, if any.
    pub fn first_from(&self, round: Round, sender: NodeId) -> Option<Decision> {
        self.values(round, sender).first().copied()
    }

    /// Total number of recorded values across all rounds.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flat_map(|senders| senders.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tally every value recorded in rounds `1..=max_rounds`, across all
    /// senders. Rounds beyond the bound are ignored.
    pub fn tally(&self, max_rounds: Round) -> Tally {
        let mut tally = Tally::default();
        if max_rounds < 1 {
            return tally;
        }
        for (_, senders) in self.entries.range(1..=max_rounds) {
            for values in senders.values() {
                for value in values {
                    tally.count(*value);
                }
            }
        }
        tally
    }
}

/// Vote counts over a set of decision values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub attack: i32,
    pub retreat: i32,
}

impl Tally {
    pub fn count(&mut self, value: Decision) {
        match value {
            Decision::Attack => self.attack += 1,
            Decision::Retreat => self.retreat += 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attack == 0 && self.retreat == 0
    }

    /// Majority rule with the deterministic conservative tie-break: Attack
    /// only on a strict majority, Retreat otherwise (including exact ties).
    pub fn majority(&self) -> Decision {
        if self.attack > self.retreat {
            Decision::Attack
        } else {
            Decision::Retreat
        }
    }
}
