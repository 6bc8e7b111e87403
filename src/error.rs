//! Error types for the decision engine and its fetch collaborator.
//!
//! The engine itself never propagates errors out of `resolve()`: every
//! failure is scoped to the smallest unit possible (one predicate, one
//! group, one campaign) and degrades to "no match" or "skip" after being
//! reported to the event sink. The types here exist so those failures are
//! still typed at their origin.

use thiserror::Error;

use crate::model::ValueKind;

// ============================================================================
// Allocation
// ============================================================================

/// Traffic-allocation failures, scoped to one variation group.
///
/// Both variants are fatal for the group and cause it to be skipped, not
/// retried — retrying cannot fix a static configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The group's declared allocations do not sum to 100.
    #[error(
        "variation group '{variation_group_id}' allocations sum to {sum}, expected exactly 100"
    )]
    InvalidTrafficSum {
        /// Offending variation group.
        variation_group_id: String,
        /// Observed allocation sum. Wider than the per-variation field so
        /// extreme declared values report their true total.
        sum: u64,
    },

    /// No variation range contained the computed bucket. Unreachable when
    /// the sum invariant holds.
    #[error(
        "no variation of group '{variation_group_id}' covers bucket {bucket} \
         for visitor '{visitor_id}'"
    )]
    UnresolvedBucket {
        /// Visitor being allocated.
        visitor_id: String,
        /// Variation group that failed to resolve.
        variation_group_id: String,
        /// Computed bucket value, 0–99.
        bucket: u32,
    },
}

// ============================================================================
// Targeting
// ============================================================================

/// A predicate-level comparison problem.
///
/// Never aborts evaluation: each issue reduces the offending predicate to
/// "does not match" and is surfaced through the event sink at the severity
/// the variant dictates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComparisonIssue {
    /// Operator string outside the recognized set.
    #[error("unknown operator '{operator}' for key '{key}'")]
    UnknownOperator {
        /// Predicate key.
        key: String,
        /// Raw operator string from the payload.
        operator: String,
    },

    /// Operator applied to a context-value kind the matrix disallows
    /// (e.g. `LOWER_THAN` against a boolean, `CONTAINS` against a list).
    #[error("operator {operator} does not support {context_kind} values (key '{key}')")]
    UnsupportedCombination {
        /// Predicate key.
        key: String,
        /// Recognized operator in use.
        operator: crate::model::Operator,
        /// Kind of the visitor's context value.
        context_kind: ValueKind,
    },

    /// Context value and targeting value kinds disagree within an operator
    /// that would otherwise accept the context value.
    #[error(
        "type mismatch for key '{key}': context value is {context_kind}, \
         targeting value is {target_kind}"
    )]
    TypeMismatch {
        /// Predicate key.
        key: String,
        /// Kind of the visitor's context value (or its list elements).
        context_kind: ValueKind,
        /// Kind of the declared targeting value.
        target_kind: ValueKind,
    },

    /// List context value whose elements are not all of one primitive kind.
    #[error("heterogeneous list for key '{key}'")]
    HeterogeneousList {
        /// Predicate key.
        key: String,
    },
}

// ============================================================================
// Fetch collaborator
// ============================================================================

/// Errors from the campaign payload fetch collaborator.
///
/// These never originate inside the engine — `resolve()` assumes a
/// structurally valid, already-parsed payload.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connection, TLS, timeout).
    #[error("bucketing request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a status that is neither 200 nor 304.
    #[error("bucketing endpoint returned unexpected status {status}")]
    UnexpectedStatus {
        /// HTTP status code received.
        status: u16,
    },

    /// The response body was not a well-formed payload.
    #[error("bucketing payload could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    /// A 304 arrived before any snapshot was held. Indicates a server or
    /// proxy revalidating a request we never conditioned.
    #[error("not-modified response received with no prior snapshot")]
    NotModifiedWithoutSnapshot,
}

// ============================================================================
// Tests
// ============================================================================
