//! `flagdeck` — deterministic decision engine for feature-flag and
//! experimentation campaigns.
//!
//! Given a visitor id, a visitor context, and a campaign payload downloaded
//! from a flag-management API, the engine decides which campaigns apply and
//! which variation of each the visitor gets. Identical inputs produce
//! identical decisions in every conforming client runtime: allocation is
//! MurmurHash3 x86_32 over `visitorId ++ variationGroupId` with a fixed
//! seed, reduced to a 0–99 traffic bucket.
//!
//! The engine is pure and synchronous — no I/O, no clocks, no shared
//! mutable state — and is deliberately lenient toward semantically invalid
//! payloads: broken traffic sums, unknown operators, and type mismatches
//! are reported through a caller-supplied [`EventSink`] and degrade to
//! "no match" or "skip" at the smallest possible scope. Payload download
//! with conditional-GET caching lives in [`fetch`], cleanly outside the
//! pure core.
//!
//! ```no_run
//! use std::sync::Arc;
//! use flagdeck::{DecisionEngine, VisitorContext};
//! use flagdeck::fetch::{BucketingClient, FetchConfig};
//!
//! # async fn run() -> Result<(), flagdeck::FetchError> {
//! let client = BucketingClient::new(FetchConfig::new("my_env_id"));
//! let outcome = client.fetch().await?;
//!
//! let engine = DecisionEngine::default();
//! let context = VisitorContext::new().with("isVip", true);
//! let decisions = engine.resolve(outcome.snapshot(), "visitor_1", &context);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod fetch;
pub mod model;
pub mod observability;
pub mod validation;

pub use engine::DecisionEngine;
pub use engine::resolver::resolve;
pub use error::{AllocationError, ComparisonIssue, FetchError};
pub use model::{
    ALL_USERS_KEY, BucketingPayload, Campaign, ContextValue, Decision, DecisionVariation,
    Modifications, Operator, OperatorField, Targeting, TargetingGroup, TargetingGroupSet,
    ValueKind, Variation, VariationGroup, VisitorContext,
};
pub use observability::{Event, EventSink, JsonlSink, MemorySink, NullSink, Severity, TracingSink};
