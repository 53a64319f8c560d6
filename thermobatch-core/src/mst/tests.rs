//! Unit tests for the dissimilarity matrix and Prim reduction.

use rstest::rstest;

use crate::distance::FORBIDDEN;

use super::{DissimilarityMatrix, prim_parents, spanning_edges};

fn line_matrix(points: &[f64]) -> DissimilarityMatrix {
    DissimilarityMatrix::build(points.len(), |i, j| (points[i] - points[j]).abs())
}

fn total_weight(matrix: &DissimilarityMatrix) -> f64 {
    spanning_edges(matrix).iter().map(|edge| edge.weight()).sum()
}

/// Exhaustive reference: minimum total weight over all spanning trees of a
/// tiny graph, enumerated as parent vectors rooted at node 0.
fn brute_force_minimum(matrix: &DissimilarityMatrix) -> f64 {
    fn is_tree(parents: &[usize]) -> bool {
        (1..parents.len()).all(|start| {
            let mut node = start;
            for _ in 0..parents.len() {
                if node == 0 {
                    return true;
                }
                node = parents[node];
            }
            false
        })
    }

    let order = matrix.order();
    let mut best = f64::INFINITY;
    let mut parents = vec![0; order];
    let combinations = order.pow(u32::try_from(order - 1).expect("tiny order"));
    for code in 0..combinations {
        let mut rest = code;
        for parent in parents.iter_mut().skip(1) {
            *parent = rest % order;
            rest /= order;
        }
        if !is_tree(&parents) {
            continue;
        }
        let weight: f64 = (1..order)
            .map(|node| matrix.weight(node, parents[node]))
            .sum();
        best = best.min(weight);
    }
    best
}

#[test]
fn matrix_is_symmetric_with_zero_diagonal() {
    let mut calls = 0;
    let matrix = DissimilarityMatrix::build(4, |i, j| {
        calls += 1;
        (i * 10 + j) as f64
    });
    assert_eq!(calls, 6, "each unordered pair is evaluated once");
    for i in 0..4 {
        assert_eq!(matrix.weight(i, i), 0.0);
        for j in 0..4 {
            assert_eq!(matrix.weight(i, j), matrix.weight(j, i));
        }
    }
    assert_eq!(matrix.weight(3, 1), 13.0);
}

#[rstest]
#[case::empty(&[], 0)]
#[case::singleton(&[5.0], 0)]
#[case::pair(&[5.0, 9.0], 1)]
#[case::several(&[60.0, 60.0, 62.0, 340.0, 352.0, 770.0], 5)]
fn emits_one_edge_per_non_root_node(#[case] points: &[f64], #[case] expected: usize) {
    let matrix = line_matrix(points);
    let edges = spanning_edges(&matrix);
    assert_eq!(edges.len(), expected);
    assert!(edges.iter().all(|edge| edge.source() != 0));
}

#[test]
fn links_sorted_points_in_a_chain() {
    let matrix = line_matrix(&[0.0, 10.0, 3.0, 7.0]);
    let parents = prim_parents(&matrix);
    assert_eq!(parents, vec![None, Some(3), Some(0), Some(2)]);
    assert_eq!(total_weight(&matrix), 10.0);
}

#[test]
fn equal_weights_keep_the_first_parent() {
    let matrix = line_matrix(&[60.0, 60.0, 62.0]);
    let parents = prim_parents(&matrix);
    assert_eq!(parents, vec![None, Some(0), Some(0)]);
}

#[test]
fn forbidden_edges_still_attach_isolated_nodes() {
    // Node 2 can only be reached through forbidden pairs.
    let matrix = DissimilarityMatrix::build(4, |i, j| {
        if i == 2 || j == 2 {
            FORBIDDEN
        } else {
            i.abs_diff(j) as f64
        }
    });
    let edges = spanning_edges(&matrix);
    assert_eq!(edges.len(), 3);

    let attaching = edges
        .iter()
        .find(|edge| edge.source() == 2 || edge.target() == 2)
        .expect("node 2 must be attached");
    assert_eq!(attaching.weight(), FORBIDDEN);
    assert_eq!(
        edges.iter().filter(|edge| edge.weight() == FORBIDDEN).count(),
        1,
        "only one forbidden edge is needed"
    );
}

#[rstest]
#[case(&[1.0, 4.0, 9.0, 16.0, 25.0])]
#[case(&[3.0, 3.0, 3.0, 3.0])]
#[case(&[12.5, -4.0, 8.0, 0.5, 7.5])]
fn matches_exhaustive_minimum_on_line_graphs(#[case] points: &[f64]) {
    let matrix = line_matrix(points);
    assert_eq!(total_weight(&matrix), brute_force_minimum(&matrix));
}

#[test]
fn matches_exhaustive_minimum_on_arbitrary_weights() {
    let weights = [
        [0.0, 4.0, 1.0, 9.0, 7.0],
        [4.0, 0.0, 2.0, 6.0, 3.0],
        [1.0, 2.0, 0.0, 8.0, 5.0],
        [9.0, 6.0, 8.0, 0.0, 2.5],
        [7.0, 3.0, 5.0, 2.5, 0.0],
    ];
    let matrix = DissimilarityMatrix::build(5, |i, j| weights[i][j]);
    assert_eq!(total_weight(&matrix), brute_force_minimum(&matrix));
    assert_eq!(total_weight(&matrix), 8.5);
}
