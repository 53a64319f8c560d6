//! Priority queue of candidate merges between top-level clusters.
//!
//! Entries are keyed by the unordered identity of their two nodes and ranked
//! by `(distance, lower anchor, higher anchor)`. Anchors are the lowest input
//! slot of each cluster; top-level clusters are disjoint, so the ranking is a
//! total order and equal distances resolve toward the pair holding the
//! earliest operations.

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
};

use crate::tree::NodeId;

/// Unordered pair of nodes, compared by identity.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct PairKey {
    low: NodeId,
    high: NodeId,
}

impl PairKey {
    pub(crate) fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub(crate) const fn nodes(self) -> (NodeId, NodeId) {
        (self.low, self.high)
    }

    pub(crate) fn contains(self, node: NodeId) -> bool {
        self.low == node || self.high == node
    }

    /// The endpoint that is neither `a` nor `b`, when exactly one of them is
    /// part of the pair.
    pub(crate) fn other_than(self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let merged = |node: NodeId| node == a || node == b;
        match (merged(self.low), merged(self.high)) {
            (true, false) => Some(self.high),
            (false, true) => Some(self.low),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Ranked {
    distance: f64,
    anchors: (usize, usize),
    key: PairKey,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.anchors.cmp(&other.anchors))
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// A queued candidate as seen by callers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Candidate {
    pub(crate) key: PairKey,
    pub(crate) distance: f64,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct CandidateQueue {
    ranked: BTreeSet<Ranked>,
    entries: HashMap<PairKey, Ranked>,
}

impl CandidateQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[rustfmt::skip]
    pub(crate) fn len(&self) -> usize { self.entries.len() }

    #[rustfmt::skip]
    pub(crate) fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Inserts or re-prioritises `key`. `anchors` are the anchors of the two
    /// nodes in either order. Returns the previous distance, if any.
    pub(crate) fn insert(
        &mut self,
        key: PairKey,
        anchors: (usize, usize),
        distance: f64,
    ) -> Option<f64> {
        let previous = self.remove(key);
        let entry = Ranked {
            distance,
            anchors: (anchors.0.min(anchors.1), anchors.0.max(anchors.1)),
            key,
        };
        self.ranked.insert(entry);
        self.entries.insert(key, entry);
        previous
    }

    pub(crate) fn remove(&mut self, key: PairKey) -> Option<f64> {
        let entry = self.entries.remove(&key)?;
        self.ranked.remove(&entry);
        Some(entry.distance)
    }

    pub(crate) fn priority(&self, key: PairKey) -> Option<f64> {
        self.entries.get(&key).map(|entry| entry.distance)
    }

    pub(crate) fn peek_min(&self) -> Option<Candidate> {
        self.ranked.first().map(Ranked::candidate)
    }

    pub(crate) fn pop_min(&mut self) -> Option<Candidate> {
        let entry = self.ranked.pop_first()?;
        self.entries.remove(&entry.key);
        Some(entry.candidate())
    }

    /// Entries in rank order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = Candidate> + '_ {
        self.ranked.iter().map(Ranked::candidate)
    }

    /// Removes and returns, in rank order, every entry touching `a` or `b`.
    pub(crate) fn drain_touching(&mut self, a: NodeId, b: NodeId) -> Vec<Candidate> {
        let touching: Vec<Candidate> = self
            .iter()
            .filter(|candidate| candidate.key.contains(a) || candidate.key.contains(b))
            .collect();
        for candidate in &touching {
            self.remove(candidate.key);
        }
        touching
    }
}

impl Ranked {
    const fn candidate(&self) -> Candidate {
        Candidate {
            key: self.key,
            distance: self.distance,
        }
    }
}
