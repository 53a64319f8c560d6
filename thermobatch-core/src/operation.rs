//! Timed operations and the two attributes they are clustered on.

use std::fmt;

use crate::error::{BatchError, Result};

/// One timed laboratory operation.
///
/// The primary value is duration-like (an extension time) and is shared by
/// every operation on one device. The secondary value is temperature-like (an
/// annealing temperature) and is shared by every operation in one row.
///
/// # Examples
/// ```
/// use thermobatch_core::{Attribute, Operation};
///
/// let op = Operation::new("pcr-1", 60.0, 69.0);
/// assert_eq!(op.id(), &"pcr-1");
/// assert_eq!(Attribute::Primary.value(&op), 60.0);
/// assert_eq!(Attribute::Secondary.value(&op), 69.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Operation<I> {
    id: I,
    primary_value: f64,
    secondary_value: f64,
}

impl<I> Operation<I> {
    /// Creates an operation.
    #[must_use]
    pub const fn new(id: I, primary_value: f64, secondary_value: f64) -> Self {
        Self {
            id,
            primary_value,
            secondary_value,
        }
    }

    /// Returns the caller-supplied identifier.
    #[must_use]
    #[rustfmt::skip]
    pub const fn id(&self) -> &I { &self.id }

    /// Returns the duration-like value clustered by devices.
    #[must_use]
    #[rustfmt::skip]
    pub const fn primary_value(&self) -> f64 { self.primary_value }

    /// Returns the temperature-like value clustered by rows.
    #[must_use]
    #[rustfmt::skip]
    pub const fn secondary_value(&self) -> f64 { self.secondary_value }
}

/// Selects which operation value a clustering stage works on.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Attribute {
    /// The duration-like value (stage one, per device).
    Primary,
    /// The temperature-like value (stage two, per row).
    Secondary,
}

impl Attribute {
    /// Reads this attribute from `operation`.
    #[must_use]
    pub const fn value<I>(self, operation: &Operation<I>) -> f64 {
        match self {
            Self::Primary => operation.primary_value,
            Self::Secondary => operation.secondary_value,
        }
    }

    /// Returns the cross attribute whose spread a stage may bound.
    ///
    /// # Examples
    /// ```
    /// use thermobatch_core::Attribute;
    ///
    /// assert_eq!(Attribute::Primary.other(), Attribute::Secondary);
    /// assert_eq!(Attribute::Secondary.other(), Attribute::Primary);
    /// ```
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }

    /// Stable lowercase label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Largest accepted absolute value of either attribute.
///
/// Keeps every difference between two values, and so every merge distance
/// and cross-attribute range, finite and below [`crate::FORBIDDEN`].
pub const MAX_MAGNITUDE: f64 = f64::MAX / 4.0;

/// Rejects empty inputs, non-finite values and values beyond
/// [`MAX_MAGNITUDE`] before any graph is built.
pub(crate) fn validate_operations<'o, I: 'o>(
    operations: impl IntoIterator<Item = &'o Operation<I>>,
) -> Result<()> {
    let mut seen = 0;
    for (index, operation) in operations.into_iter().enumerate() {
        for attribute in [Attribute::Primary, Attribute::Secondary] {
            let value = attribute.value(operation);
            if !value.is_finite() {
                return Err(BatchError::NonFiniteValue { index, attribute });
            }
            if value.abs() > MAX_MAGNITUDE {
                return Err(BatchError::ValueOutOfRange { index, attribute });
            }
        }
        seen = index + 1;
    }
    if seen == 0 {
        return Err(BatchError::EmptyInput);
    }
    Ok(())
}
