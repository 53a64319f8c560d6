//! Aggregate statistics carried by every merge-tree node.

use crate::operation::{Attribute, Operation};

/// Size and value spread of a cluster.
///
/// `min`, `max` and `mean` describe the attribute the stage clusters on;
/// `cross_min` and `cross_max` describe the other attribute so range limits
/// can be enforced without revisiting members.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterStats {
    size: usize,
    min: f64,
    max: f64,
    mean: f64,
    cross_min: f64,
    cross_max: f64,
}

impl ClusterStats {
    /// Statistics of a cluster holding only `operation`.
    ///
    /// # Examples
    /// ```
    /// use thermobatch_core::{Attribute, ClusterStats, Operation};
    ///
    /// let stats = ClusterStats::singleton(&Operation::new(1, 60.0, 69.0), Attribute::Primary);
    /// assert_eq!(stats.size(), 1);
    /// assert_eq!(stats.mean(), 60.0);
    /// assert_eq!(stats.cross_range(), 0.0);
    /// ```
    #[must_use]
    pub const fn singleton<I>(operation: &Operation<I>, attribute: Attribute) -> Self {
        let value = attribute.value(operation);
        let cross = attribute.other().value(operation);
        Self {
            size: 1,
            min: value,
            max: value,
            mean: value,
            cross_min: cross,
            cross_max: cross,
        }
    }

    /// Statistics of the union of two disjoint clusters.
    ///
    /// The mean is the count-weighted average of both means, taken in
    /// fraction form so it stays within `[min, max]` without overflowing.
    #[must_use]
    pub fn combine(a: &Self, b: &Self) -> Self {
        let size = a.size + b.size;
        Self {
            size,
            min: a.min.min(b.min),
            max: a.max.max(b.max),
            mean: weighted_mean(a, b, size),
            cross_min: a.cross_min.min(b.cross_min),
            cross_max: a.cross_max.max(b.cross_max),
        }
    }

    /// Number of operations in the cluster.
    #[must_use]
    #[rustfmt::skip]
    pub const fn size(&self) -> usize { self.size }

    /// Smallest stage value.
    #[must_use]
    #[rustfmt::skip]
    pub const fn min(&self) -> f64 { self.min }

    /// Largest stage value.
    #[must_use]
    #[rustfmt::skip]
    pub const fn max(&self) -> f64 { self.max }

    /// Mean stage value.
    #[must_use]
    #[rustfmt::skip]
    pub const fn mean(&self) -> f64 { self.mean }

    /// Smallest cross-attribute value.
    #[must_use]
    #[rustfmt::skip]
    pub const fn cross_min(&self) -> f64 { self.cross_min }

    /// Largest cross-attribute value.
    #[must_use]
    #[rustfmt::skip]
    pub const fn cross_max(&self) -> f64 { self.cross_max }

    /// Spread of the cross attribute.
    #[must_use]
    pub fn cross_range(&self) -> f64 {
        self.cross_max - self.cross_min
    }

    /// Spread of the cross attribute if `self` and `other` were merged.
    #[must_use]
    pub fn combined_cross_range(&self, other: &Self) -> f64 {
        self.cross_max.max(other.cross_max) - self.cross_min.min(other.cross_min)
    }
}

fn weighted_mean(a: &ClusterStats, b: &ClusterStats, size: usize) -> f64 {
    let total = size as f64;
    a.mean * (a.size as f64 / total) + b.mean * (b.size as f64 / total)
}
