//! Append-only merge tree for one clustering stage.
//!
//! Nodes live in an arena addressed by [`NodeId`]. Leaves wrap one input slot;
//! every merge appends one internal node holding its two children. A node's
//! statistics and children never change after creation, and its
//! `merged_into` pointer is written at most once. Following those pointers
//! from any node therefore ends at a unique top-level node.

mod stats;

use crate::error::InvariantViolation;

pub use self::stats::ClusterStats;

/// Index of a node in a [`MergeTree`] arena.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct NodeId(usize);

impl NodeId {
    #[cfg(test)]
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index)
    }

    #[rustfmt::skip]
    pub(crate) const fn index(self) -> usize { self.0 }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum NodeKind {
    Leaf { slot: usize },
    Internal { left: NodeId, right: NodeId },
}

#[derive(Clone, Debug, PartialEq)]
struct ClusterNode {
    stats: ClusterStats,
    kind: NodeKind,
    anchor: usize,
    merged_into: Option<NodeId>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct MergeTree {
    nodes: Vec<ClusterNode>,
}

impl MergeTree {
    /// Reserves room for `leaves` leaves and every merge they can undergo.
    pub(crate) fn with_leaf_capacity(leaves: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(leaves.saturating_mul(2).saturating_sub(1)),
        }
    }

    pub(crate) fn push_leaf(&mut self, slot: usize, stats: ClusterStats) -> NodeId {
        self.push(ClusterNode {
            stats,
            kind: NodeKind::Leaf { slot },
            anchor: slot,
            merged_into: None,
        })
    }

    /// Appends the union of two top-level nodes and points both at it.
    ///
    /// Fails without mutating anything when either node was already merged.
    pub(crate) fn merge(
        &mut self,
        left: NodeId,
        right: NodeId,
    ) -> Result<NodeId, InvariantViolation> {
        for node in [left, right] {
            if let Some(existing) = self.merged_into(node) {
                return Err(InvariantViolation::MergePointerReassigned {
                    node: node.index(),
                    existing: existing.index(),
                });
            }
        }

        let stats = ClusterStats::combine(self.stats(left), self.stats(right));
        let anchor = self.anchor(left).min(self.anchor(right));
        let merged = self.push(ClusterNode {
            stats,
            kind: NodeKind::Internal { left, right },
            anchor,
            merged_into: None,
        });
        self.nodes[left.0].merged_into = Some(merged);
        self.nodes[right.0].merged_into = Some(merged);
        Ok(merged)
    }

    fn push(&mut self, node: ClusterNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    #[rustfmt::skip]
    pub(crate) fn len(&self) -> usize { self.nodes.len() }

    pub(crate) fn stats(&self, node: NodeId) -> &ClusterStats {
        &self.nodes[node.0].stats
    }

    /// Lowest input slot among the node's members.
    pub(crate) fn anchor(&self, node: NodeId) -> usize {
        self.nodes[node.0].anchor
    }

    pub(crate) fn merged_into(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].merged_into
    }

    pub(crate) fn is_top_level(&self, node: NodeId) -> bool {
        self.merged_into(node).is_none()
    }

    /// Follows `merged_into` links until reaching a top-level node.
    pub(crate) fn top_level(&self, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(parent) = self.merged_into(current) {
            current = parent;
        }
        current
    }

    /// Input slots under `node`, collected with an explicit stack so deep
    /// chains of merges cannot overflow the call stack.
    pub(crate) fn leaf_slots(&self, node: NodeId) -> Vec<usize> {
        let mut slots = Vec::with_capacity(self.stats(node).size());
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            match self.nodes[current.0].kind {
                NodeKind::Leaf { slot } => slots.push(slot),
                NodeKind::Internal { left, right } => {
                    pending.push(right);
                    pending.push(left);
                }
            }
        }
        slots
    }
}
