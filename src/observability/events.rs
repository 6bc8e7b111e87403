//! Typed event stream for engine observability.
//!
//! The engine reports everything it observes — hash results, match
//! outcomes, malformed-data conditions, safe-mode activation — as discrete
//! typed events pushed into a caller-supplied [`EventSink`]. The engine
//! itself holds no mutable state and writes to no global logger; capturing
//! a resolve pass is as simple as handing it a [`MemorySink`].

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;

use crate::error::{AllocationError, ComparisonIssue};

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity attached to each event, mirroring the levels the upstream API
/// contract names for its observability consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Per-hash and per-campaign trace detail.
    Debug,
    /// End-of-resolution summaries.
    Info,
    /// Unsupported comparisons and safe-mode notices.
    Warning,
    /// Malformed data encountered during targeting.
    Error,
    /// Group-level configuration failures.
    Fatal,
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted while resolving a payload.
///
/// Tagged with `"type"` when serialized so consumers can dispatch on the
/// event kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// An allocation hash was computed for a visitor/group pair.
    HashComputed {
        /// Visitor being allocated.
        visitor_id: String,
        /// Variation group hashed against.
        variation_group_id: String,
        /// Raw 32-bit hash value.
        hash: u32,
        /// `hash % 100`.
        bucket: u32,
    },

    /// A campaign finished targeting evaluation.
    CampaignEvaluated {
        /// Campaign id.
        campaign_id: String,
        /// Whether any of its variation groups matched.
        matched: bool,
    },

    /// A predicate used an operator/type combination outside the matrix.
    UnsupportedComparison {
        /// Human-readable description of the combination.
        detail: String,
    },

    /// Context and targeting value kinds disagreed, or a list context value
    /// was not homogeneous.
    TypeMismatch {
        /// Human-readable description of the mismatch.
        detail: String,
    },

    /// A predicate carried an operator string outside the recognized set.
    UnknownOperator {
        /// Predicate key.
        key: String,
        /// Raw operator string.
        operator: String,
    },

    /// A variation group could not be allocated and was skipped.
    AllocationFailed {
        /// Variation group that was skipped.
        variation_group_id: String,
        /// Why allocation failed.
        detail: String,
    },

    /// The payload's panic flag is set; all decisioning is disabled.
    PanicModeActive,

    /// A resolve pass completed.
    ResolutionCompleted {
        /// Visitor the pass was for.
        visitor_id: String,
        /// Number of campaigns whose targeting matched.
        matched_campaigns: usize,
        /// Number of decisions produced (matched campaigns whose chosen
        /// group also allocated cleanly).
        decisions: usize,
    },
}

impl Event {
    /// Severity of this event per the observability contract.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::HashComputed { .. } | Self::CampaignEvaluated { .. } => Severity::Debug,
            Self::ResolutionCompleted { .. } => Severity::Info,
            Self::UnsupportedComparison { .. } | Self::PanicModeActive => Severity::Warning,
            Self::TypeMismatch { .. } | Self::UnknownOperator { .. } => Severity::Error,
            Self::AllocationFailed { .. } => Severity::Fatal,
        }
    }

    /// Builds the event for a targeting comparison issue.
    #[must_use]
    pub fn from_comparison_issue(issue: &ComparisonIssue) -> Self {
        match issue {
            ComparisonIssue::UnknownOperator { key, operator } => Self::UnknownOperator {
                key: key.clone(),
                operator: operator.clone(),
            },
            ComparisonIssue::UnsupportedCombination { .. } => Self::UnsupportedComparison {
                detail: issue.to_string(),
            },
            ComparisonIssue::TypeMismatch { .. } | ComparisonIssue::HeterogeneousList { .. } => {
                Self::TypeMismatch {
                    detail: issue.to_string(),
                }
            }
        }
    }

    /// Builds the event for a failed group allocation.
    #[must_use]
    pub fn from_allocation_error(error: &AllocationError) -> Self {
        let variation_group_id = match error {
            AllocationError::InvalidTrafficSum {
                variation_group_id, ..
            }
            | AllocationError::UnresolvedBucket {
                variation_group_id, ..
            } => variation_group_id.clone(),
        };
        Self::AllocationFailed {
            variation_group_id,
            detail: error.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sink trait
// ---------------------------------------------------------------------------

/// Destination for engine events, supplied by the caller.
///
/// Implementations must be cheap and must never panic — observability must
/// not take down decisioning.
pub trait EventSink: Send + Sync {
    /// Receives one event.
    fn emit(&self, event: Event);
}

// ---------------------------------------------------------------------------
// Shipped sinks
// ---------------------------------------------------------------------------

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

/// Forwards events to `tracing` at the level their severity maps to.
///
/// `Fatal` has no `tracing` counterpart and is logged at `error!` with a
/// `fatal` field set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: Event) {
        let severity = event.severity();
        match severity {
            Severity::Debug => tracing::debug!(?event, "engine event"),
            Severity::Info => tracing::info!(?event, "engine event"),
            Severity::Warning => tracing::warn!(?event, "engine event"),
            Severity::Error => tracing::error!(?event, "engine event"),
            Severity::Fatal => tracing::error!(?event, fatal = true, "engine event"),
        }
    }
}

/// Captures events in memory, in emission order.
///
/// The capture capability the engine is tested with; also useful for
/// callers auditing a single resolve pass.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything captured so far.
    ///
    /// A poisoned lock is recovered, not propagated: the captured `Vec` is
    /// valid after any interrupted push.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of captured events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies out the captured events matching `predicate`.
    pub fn filtered(&self, predicate: impl Fn(&Event) -> bool) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Envelope adding ordering and wall-clock metadata to a serialized event.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// Wall-clock emission time, UTC.
    timestamp: chrono::DateTime<Utc>,
    /// Event severity.
    severity: Severity,
    /// The wrapped event, flattened into the same JSON object.
    #[serde(flatten)]
    event: Event,
}

/// Thread-safe, buffered JSONL event writer.
///
/// Each emission atomically takes a sequence number, serializes the event
/// as one JSON line, and flushes. Serialization or I/O failures are
/// silently dropped — observability must never crash the caller.
pub struct JsonlSink {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug — provide a manual impl.
impl std::fmt::Debug for JsonlSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlSink")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl JsonlSink {
    /// Creates a sink writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates a sink writing to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink appending to the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or opened.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Number of events written so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Flushes the underlying writer. Failures are ignored.
    pub fn flush(&self) {
        if let Ok(mut w) = self.writer.lock() {
            let _ = w.flush();
        }
    }
}

impl EventSink for JsonlSink {
    fn emit(&self, event: Event) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence,
            timestamp: Utc::now(),
            severity: event.severity(),
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
