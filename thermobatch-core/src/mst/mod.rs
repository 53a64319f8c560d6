//! Candidate-pair reduction via a minimum spanning tree.
//!
//! The stage first weighs every pair of singleton clusters with its merge
//! rule, then runs Prim's algorithm over the dense matrix. Only the `n - 1`
//! tree edges become merge candidates: the nearest mergeable pair at any point
//! of the agglomeration is always an edge of a minimum spanning tree of the
//! current distance graph.
//!
//! Forbidden pairs carry an infinite weight. Prim's algorithm still uses them
//! to attach nodes that have no finite edge, so the output always spans every
//! node.

use std::cmp::Ordering;

/// Dense symmetric matrix of pairwise merge distances.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DissimilarityMatrix {
    order: usize,
    weights: Vec<f64>,
}

impl DissimilarityMatrix {
    /// Evaluates `weight` once per unordered pair; the diagonal is zero.
    pub(crate) fn build(order: usize, mut weight: impl FnMut(usize, usize) -> f64) -> Self {
        let mut weights = vec![0.0; order.saturating_mul(order)];
        for row in 0..order {
            for column in (row + 1)..order {
                let value = weight(row, column);
                weights[row * order + column] = value;
                weights[column * order + row] = value;
            }
        }
        Self { order, weights }
    }

    #[rustfmt::skip]
    pub(crate) fn order(&self) -> usize { self.order }

    pub(crate) fn weight(&self, row: usize, column: usize) -> f64 {
        self.weights[row * self.order + column]
    }
}

/// A spanning-tree edge offered as a merge candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CandidateEdge {
    source: usize,
    target: usize,
    weight: f64,
}

impl CandidateEdge {
    /// The node attached to the tree by this edge.
    #[must_use]
    #[rustfmt::skip]
    pub(crate) fn source(&self) -> usize { self.source }

    /// The node `source` was attached to.
    #[must_use]
    #[rustfmt::skip]
    pub(crate) fn target(&self) -> usize { self.target }

    #[must_use]
    #[rustfmt::skip]
    pub(crate) fn weight(&self) -> f64 { self.weight }
}

/// Runs Prim's algorithm rooted at node 0 and returns each node's parent.
///
/// The root has no parent. Among unvisited nodes the one with the smallest
/// key is taken next, preferring the lowest index on ties. A key is only
/// replaced by a strictly smaller weight, so equal-weight alternatives keep
/// the earliest visited parent.
pub(crate) fn prim_parents(matrix: &DissimilarityMatrix) -> Vec<Option<usize>> {
    let order = matrix.order();
    let mut keys: Vec<Option<f64>> = vec![None; order];
    let mut parents: Vec<Option<usize>> = vec![None; order];
    let mut visited = vec![false; order];

    if let Some(root) = keys.first_mut() {
        *root = Some(0.0);
    }

    for _ in 0..order {
        let Some(next) = (0..order)
            .filter(|&node| !visited[node])
            .min_by(|&left, &right| compare_keys(keys[left], keys[right]))
        else {
            break;
        };
        visited[next] = true;

        for node in 0..order {
            if visited[node] {
                continue;
            }
            let weight = matrix.weight(next, node);
            if keys[node].is_none_or(|key| weight < key) {
                keys[node] = Some(weight);
                parents[node] = Some(next);
            }
        }
    }

    parents
}

/// Unreached keys sort after every weight, including infinite ones.
fn compare_keys(left: Option<f64>, right: Option<f64>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Emits one candidate edge `{node, parent[node]}` per non-root node.
pub(crate) fn spanning_edges(matrix: &DissimilarityMatrix) -> Vec<CandidateEdge> {
    prim_parents(matrix)
        .into_iter()
        .enumerate()
        .filter_map(|(source, parent)| {
            parent.map(|target| CandidateEdge {
                source,
                target,
                weight: matrix.weight(source, target),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests;
