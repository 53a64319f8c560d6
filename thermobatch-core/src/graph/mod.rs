//! Constrained agglomerative clustering of one stage.
//!
//! A [`ClusterGraph`] owns the merge tree and candidate queue for a single
//! stage. Construction weighs every pair of singletons, reduces them to the
//! edges of a minimum spanning tree and queues those edges. [`ClusterGraph::run`]
//! then merges the nearest pair until the stopping rule fires and returns the
//! top-level clusters.
//!
//! The graph is consumed by `run`, so a finished graph can never be resumed.

mod checker;
mod stopping;

use std::cmp::Ordering;

use tracing::{debug, instrument, trace};

use crate::{
    Result,
    config::StageConfig,
    distance::MergeRule,
    error::{BatchError, InvariantViolation},
    mst::{DissimilarityMatrix, spanning_edges},
    operation::{Operation, validate_operations},
    queue::{Candidate, CandidateQueue, PairKey},
    result::{Cluster, StageOutcome},
    tree::{ClusterStats, MergeTree, NodeId},
};

pub use self::stopping::StopReason;
use self::stopping::{MergeDecision, StopRule};

/// Clustering state for one stage over a borrowed list of operations.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use thermobatch_core::{Attribute, ClusterGraph, Operation, StageConfig, Thresholds};
///
/// let operations = [
///     Operation::new("a", 60.0, 69.0),
///     Operation::new("b", 62.0, 72.0),
///     Operation::new("c", 370.0, 69.0),
/// ];
/// let stage = StageConfig::new(
///     Attribute::Primary,
///     NonZeroUsize::new(2).expect("non-zero"),
///     NonZeroUsize::new(96).expect("non-zero"),
///     Thresholds::new(30.0, 300.0).expect("valid thresholds"),
/// );
/// let outcome = ClusterGraph::from_slice(&operations, stage)?
///     .with_representation_checks(true)
///     .run()?;
///
/// let groups: Vec<Vec<&str>> = outcome
///     .clusters()
///     .iter()
///     .map(|cluster| cluster.ids().copied().collect())
///     .collect();
/// assert_eq!(groups, vec![vec!["a", "b"], vec!["c"]]);
/// assert_eq!(outcome.merges(), 1);
/// # Ok::<(), thermobatch_core::BatchError>(())
/// ```
#[derive(Debug)]
pub struct ClusterGraph<'a, I> {
    stage: StageConfig,
    rule: MergeRule,
    stop_rule: StopRule,
    leaves: Vec<&'a Operation<I>>,
    tree: MergeTree,
    queue: CandidateQueue,
    current_count: usize,
    merges: usize,
    final_cluster: Option<NodeId>,
    check_representation: bool,
}

impl<'a, I> ClusterGraph<'a, I> {
    /// Builds the singleton leaves and queues the spanning-tree candidates.
    ///
    /// # Errors
    /// Returns [`BatchError::EmptyInput`] for an empty list,
    /// [`BatchError::NonFiniteValue`] when an operation carries NaN or an
    /// infinite value, and [`BatchError::ValueOutOfRange`] when a value
    /// exceeds [`crate::MAX_MAGNITUDE`].
    pub fn new(operations: Vec<&'a Operation<I>>, stage: StageConfig) -> Result<Self> {
        validate_operations(operations.iter().copied())?;
        Ok(Self::from_validated(operations, stage))
    }

    /// Builds the graph over operations that already passed
    /// [`validate_operations`]. `operations` must not be empty.
    pub(crate) fn from_validated(operations: Vec<&'a Operation<I>>, stage: StageConfig) -> Self {
        debug_assert!(!operations.is_empty());
        let attribute = stage.attribute();
        let rule = MergeRule::for_stage(&stage);
        let mut tree = MergeTree::with_leaf_capacity(operations.len());
        let leaves: Vec<NodeId> = operations
            .iter()
            .enumerate()
            .map(|(slot, operation)| {
                tree.push_leaf(slot, ClusterStats::singleton(operation, attribute))
            })
            .collect();

        let mut queue = CandidateQueue::new();
        let final_cluster = match leaves.as_slice() {
            [only] => Some(*only),
            _ => {
                let matrix = DissimilarityMatrix::build(leaves.len(), |i, j| {
                    rule.distance(tree.stats(leaves[i]), tree.stats(leaves[j]))
                });
                for edge in spanning_edges(&matrix) {
                    let (a, b) = (leaves[edge.source()], leaves[edge.target()]);
                    queue.insert(
                        PairKey::new(a, b),
                        (tree.anchor(a), tree.anchor(b)),
                        edge.weight(),
                    );
                }
                None
            }
        };

        Self {
            stage,
            rule,
            stop_rule: StopRule::for_stage(&stage),
            current_count: operations.len(),
            leaves: operations,
            tree,
            queue,
            merges: 0,
            final_cluster,
            check_representation: false,
        }
    }

    /// Convenience constructor borrowing every operation of a slice.
    ///
    /// # Errors
    /// See [`Self::new`].
    pub fn from_slice(operations: &'a [Operation<I>], stage: StageConfig) -> Result<Self> {
        Self::new(operations.iter().collect(), stage)
    }

    /// Verifies the tree and queue after construction and after every merge.
    /// Costs a full member traversal per merge.
    #[must_use]
    pub const fn with_representation_checks(mut self, enabled: bool) -> Self {
        self.check_representation = enabled;
        self
    }

    /// Number of singleton clusters the graph was built from.
    #[must_use]
    pub fn initial_count(&self) -> usize {
        self.leaves.len()
    }

    /// Current number of top-level clusters.
    #[must_use]
    #[rustfmt::skip]
    pub const fn current_count(&self) -> usize { self.current_count }

    /// Stage configuration the graph was built with.
    #[must_use]
    #[rustfmt::skip]
    pub const fn stage(&self) -> &StageConfig { &self.stage }

    /// Merges until the stopping rule fires and returns the top-level
    /// clusters ordered by anchor.
    ///
    /// # Errors
    /// Returns [`BatchError::InvariantViolation`] when the engine detects an
    /// inconsistent tree or queue. The run is aborted; no partial result is
    /// returned.
    #[instrument(
        name = "core.stage",
        err,
        skip_all,
        fields(
            attribute = %self.stage.attribute(),
            items = self.leaves.len(),
            capacity = self.stage.capacity_limit().get(),
        ),
    )]
    pub fn run(mut self) -> Result<StageOutcome<'a, I>> {
        let attribute = self.stage.attribute();
        trace!(candidates = self.queue.len(), "starting merge loop");
        let stop_reason = self
            .merge_until_stopped()
            .map_err(|violation| BatchError::InvariantViolation {
                attribute,
                violation,
            })?;
        let nodes = self.tree.len();
        let outcome = self.into_outcome(stop_reason);
        debug!(
            merges = outcome.merges(),
            nodes,
            clusters = outcome.clusters().len(),
            stop_reason = %stop_reason,
            "stage completed"
        );
        Ok(outcome)
    }

    fn merge_until_stopped(&mut self) -> core::result::Result<StopReason, InvariantViolation> {
        self.verify()?;
        loop {
            let minimum = self.queue.peek_min().map(|candidate| candidate.distance);
            if let MergeDecision::Stop(reason) = self.stop_rule.decide(self.current_count, minimum)
            {
                return Ok(reason);
            }
            let Some(candidate) = self.queue.pop_min() else {
                return Ok(StopReason::QueueExhausted);
            };
            self.merge(candidate)?;
            self.verify()?;
        }
    }

    /// Merges the pair in `candidate` and points every queue entry that
    /// touched either side at the new node.
    fn merge(&mut self, candidate: Candidate) -> core::result::Result<(), InvariantViolation> {
        let (a, b) = candidate.key.nodes();
        let merged = self.tree.merge(a, b)?;
        self.current_count -= 1;
        self.merges += 1;
        trace!(
            left = a.index(),
            right = b.index(),
            merged = merged.index(),
            distance = candidate.distance,
            size = self.tree.stats(merged).size(),
            "merged clusters"
        );

        for stale in self.queue.drain_touching(a, b) {
            let Some(other) = stale.key.other_than(a, b) else {
                continue;
            };
            let key = PairKey::new(merged, other);
            let distance = self
                .rule
                .distance(self.tree.stats(merged), self.tree.stats(other));
            if let Some(kept) = self.queue.priority(key) {
                if kept.total_cmp(&distance) != Ordering::Equal {
                    let (left, right) = key.nodes();
                    return Err(InvariantViolation::DuplicatePriorityMismatch {
                        left: left.index(),
                        right: right.index(),
                        kept,
                        recomputed: distance,
                    });
                }
                continue;
            }
            self.queue.insert(
                key,
                (self.tree.anchor(merged), self.tree.anchor(other)),
                distance,
            );
        }

        if self.queue.is_empty() {
            self.final_cluster = Some(merged);
        }
        Ok(())
    }

    fn verify(&self) -> core::result::Result<(), InvariantViolation> {
        if self.check_representation {
            self.check_consistency()?;
        }
        Ok(())
    }

    /// Current top-level nodes ordered by anchor.
    fn top_level_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = match self.final_cluster {
            Some(node) => vec![node],
            None => self
                .queue
                .iter()
                .flat_map(|candidate| {
                    let (low, high) = candidate.key.nodes();
                    [low, high]
                })
                .map(|node| self.tree.top_level(node))
                .collect(),
        };
        nodes.sort_unstable_by_key(|&node| self.tree.anchor(node));
        nodes.dedup();
        nodes
    }

    fn into_outcome(self, stop_reason: StopReason) -> StageOutcome<'a, I> {
        let attribute = self.stage.attribute();
        let clusters = self
            .top_level_nodes()
            .into_iter()
            .map(|node| {
                let mut slots = self.tree.leaf_slots(node);
                slots.sort_unstable();
                let members = slots.iter().map(|&slot| self.leaves[slot]).collect();
                Cluster::new(attribute, *self.tree.stats(node), slots, members)
            })
            .collect();
        StageOutcome::new(clusters, self.leaves.len(), self.merges, stop_reason)
    }
}
