//! Error types for the thermobatch core library.
//!
//! Input and configuration problems are reported separately from engine
//! invariant violations: the former are the caller's to fix, the latter mean
//! the clustering engine itself is broken and the run was aborted.

use std::fmt;

use thiserror::Error;

use crate::{config::ExecutionStrategy, operation::Attribute};

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// A broken internal invariant of the clustering engine.
///
/// These never result from bad input. Seeing one means a merge produced an
/// inconsistent tree or queue.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InvariantViolation {
    /// The top-level clusters no longer account for every input slot.
    #[error("top-level clusters hold {found} members but the stage started with {expected}")]
    MemberCountDrift {
        /// Number of operations the stage was built from.
        expected: usize,
        /// Sum of top-level cluster sizes.
        found: usize,
    },
    /// An input slot was recovered zero times or more than once.
    #[error("input slot {slot} was recovered {occurrences} times from the top-level clusters")]
    MemberSetDrift {
        /// Position of the operation in the stage input.
        slot: usize,
        /// How many top-level clusters produced the slot.
        occurrences: usize,
    },
    /// `current_count` disagrees with the number of distinct top-level nodes.
    #[error("graph reports {reported} clusters but {found} top-level nodes are reachable")]
    TopLevelCountDrift {
        /// The graph's running cluster count.
        reported: usize,
        /// Distinct top-level nodes reached from the queue.
        found: usize,
    },
    /// A queue entry references a node that has already been merged.
    #[error("candidate queue references subsumed node {node}")]
    StaleQueueEndpoint {
        /// Arena index of the subsumed node.
        node: usize,
    },
    /// A merge tried to overwrite an existing `merged_into` pointer.
    #[error("node {node} was already merged into {existing}")]
    MergePointerReassigned {
        /// Arena index of the node being merged a second time.
        node: usize,
        /// The node it had already been merged into.
        existing: usize,
    },
    /// Two rewritten queue entries collapsed onto one pair with different
    /// priorities.
    #[error(
        "rewritten pair ({left}, {right}) already queued at {kept} but recomputed as {recomputed}"
    )]
    DuplicatePriorityMismatch {
        /// Lower arena index of the pair.
        left: usize,
        /// Higher arena index of the pair.
        right: usize,
        /// Priority already in the queue.
        kept: f64,
        /// Priority produced by the distance rule.
        recomputed: f64,
    },
}

define_error_codes! {
    /// Stable codes describing [`InvariantViolation`] variants.
    enum InvariantViolationCode for InvariantViolation {
        /// Member count drifted.
        MemberCountDrift => MemberCountDrift { .. } => "INVARIANT_MEMBER_COUNT_DRIFT",
        /// Member multiset drifted.
        MemberSetDrift => MemberSetDrift { .. } => "INVARIANT_MEMBER_SET_DRIFT",
        /// Cluster count drifted.
        TopLevelCountDrift => TopLevelCountDrift { .. } => "INVARIANT_TOP_LEVEL_COUNT_DRIFT",
        /// Queue references a subsumed node.
        StaleQueueEndpoint => StaleQueueEndpoint { .. } => "INVARIANT_STALE_QUEUE_ENDPOINT",
        /// Write-once merge pointer was rewritten.
        MergePointerReassigned => MergePointerReassigned { .. } => "INVARIANT_MERGE_POINTER_REASSIGNED",
        /// Duplicate queue entry disagreed on priority.
        DuplicatePriorityMismatch => DuplicatePriorityMismatch { .. } => "INVARIANT_DUPLICATE_PRIORITY_MISMATCH",
    }
}

/// Error type produced when configuring or running a [`crate::Batcher`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BatchError {
    /// No operations were supplied.
    #[error("cannot batch an empty operation list")]
    EmptyInput,
    /// An operation carried a NaN or infinite attribute value.
    #[error("operation {index} has a non-finite {attribute} value")]
    NonFiniteValue {
        /// Position of the offending operation in the input.
        index: usize,
        /// Which attribute was non-finite.
        attribute: Attribute,
    },
    /// An operation carried a value whose magnitude exceeds
    /// [`crate::MAX_MAGNITUDE`].
    #[error("operation {index} has an out-of-range {attribute} value")]
    ValueOutOfRange {
        /// Position of the offending operation in the input.
        index: usize,
        /// Which attribute was out of range.
        attribute: Attribute,
    },
    /// A builder field failed validation.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig {
        /// Name of the rejected builder field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
    /// The requested execution strategy is unavailable in the current build.
    #[error("the requested execution strategy {requested:?} is not available in this build")]
    BackendUnavailable {
        /// Strategy that could not be satisfied.
        requested: ExecutionStrategy,
    },
    /// The engine detected an inconsistency in its own state.
    #[error("internal invariant violated during {attribute} clustering: {violation}")]
    InvariantViolation {
        /// Attribute of the stage that failed.
        attribute: Attribute,
        #[source]
        /// The violated invariant.
        violation: InvariantViolation,
    },
}

define_error_codes! {
    /// Stable codes describing [`BatchError`] variants.
    enum BatchErrorCode for BatchError {
        /// No operations were supplied.
        EmptyInput => EmptyInput => "BATCH_EMPTY_INPUT",
        /// An operation carried a non-finite value.
        NonFiniteValue => NonFiniteValue { .. } => "BATCH_NON_FINITE_VALUE",
        /// An operation carried a value beyond the accepted magnitude.
        ValueOutOfRange => ValueOutOfRange { .. } => "BATCH_VALUE_OUT_OF_RANGE",
        /// A builder field failed validation.
        InvalidConfig => InvalidConfig { .. } => "BATCH_INVALID_CONFIG",
        /// The requested execution strategy is unavailable.
        BackendUnavailable => BackendUnavailable { .. } => "BATCH_BACKEND_UNAVAILABLE",
        /// The engine detected an inconsistency in its own state.
        InvariantViolation => InvariantViolation { .. } => "BATCH_INVARIANT_VIOLATION",
    }
}

impl BatchError {
    /// Returns `true` for errors caused by the engine rather than the caller.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }

    /// Retrieve the inner [`InvariantViolationCode`] when the engine aborted
    /// on a broken invariant.
    #[must_use]
    pub const fn invariant_code(&self) -> Option<InvariantViolationCode> {
        match self {
            Self::InvariantViolation { violation, .. } => Some(violation.code()),
            _ => None,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, BatchError>;
