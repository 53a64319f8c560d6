//! Representation checker for a running cluster graph.
//!
//! Recomputes the member multiset from the current top-level clusters and
//! compares it with the stage input. Linear in the input per call, so it only
//! runs when explicitly enabled.

use crate::error::InvariantViolation;

use super::ClusterGraph;

type Checked = core::result::Result<(), InvariantViolation>;

impl<I> ClusterGraph<'_, I> {
    pub(super) fn check_consistency(&self) -> Checked {
        self.check_queue_endpoints()?;
        let top_level = self.top_level_nodes();
        if top_level.len() != self.current_count {
            return Err(InvariantViolation::TopLevelCountDrift {
                reported: self.current_count,
                found: top_level.len(),
            });
        }

        let expected = self.leaves.len();
        let found: usize = top_level
            .iter()
            .map(|&node| self.tree.stats(node).size())
            .sum();
        if found != expected {
            return Err(InvariantViolation::MemberCountDrift { expected, found });
        }

        let mut occurrences = vec![0_usize; expected];
        for &node in &top_level {
            for slot in self.tree.leaf_slots(node) {
                match occurrences.get_mut(slot) {
                    Some(count) => *count += 1,
                    None => {
                        return Err(InvariantViolation::MemberSetDrift {
                            slot,
                            occurrences: 1,
                        });
                    }
                }
            }
        }
        match occurrences.iter().position(|&count| count != 1) {
            Some(slot) => Err(InvariantViolation::MemberSetDrift {
                slot,
                occurrences: occurrences[slot],
            }),
            None => Ok(()),
        }
    }

    fn check_queue_endpoints(&self) -> Checked {
        let stale = self
            .queue
            .iter()
            .flat_map(|candidate| {
                let (low, high) = candidate.key.nodes();
                [low, high]
            })
            .find(|&node| !self.tree.is_top_level(node));
        match stale {
            Some(node) => Err(InvariantViolation::StaleQueueEndpoint { node: node.index() }),
            None => Ok(()),
        }
    }
}
