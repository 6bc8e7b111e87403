//! The decision engine.
//!
//! Pure, synchronous campaign resolution: panic guard, targeting
//! evaluation, deterministic traffic allocation. All I/O (payload download,
//! log transport) lives outside this module.

pub mod allocator;
pub mod hash;
pub mod resolver;
pub mod safe_mode;
pub mod targeting;

use std::sync::Arc;

use crate::model::{BucketingPayload, Decision, VisitorContext};
use crate::observability::{EventSink, TracingSink};

/// Handle bundling the event sink with the pure resolution functions.
///
/// The sink is the engine's only capability; everything else is a function
/// of the inputs. Cloning is cheap and clones share the sink.
#[derive(Clone)]
pub struct DecisionEngine {
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine").finish_non_exhaustive()
    }
}

impl Default for DecisionEngine {
    /// An engine reporting through [`TracingSink`].
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl DecisionEngine {
    /// Creates an engine reporting into the given sink.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Resolves every campaign of `payload` for one visitor. See
    /// [`resolver::resolve`] for the contract.
    #[must_use]
    pub fn resolve(
        &self,
        payload: &BucketingPayload,
        visitor_id: &str,
        context: &VisitorContext,
    ) -> Vec<Decision> {
        resolver::resolve(payload, visitor_id, context, self.sink.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemorySink;

    #[test]
    fn engine_forwards_to_resolver() {
        let sink = Arc::new(MemorySink::new());
        let engine = DecisionEngine::new(sink.clone());
        let decisions = engine.resolve(
            &BucketingPayload::default(),
            "visitor_1",
            &VisitorContext::new(),
        );
        assert!(decisions.is_empty());
        assert_eq!(sink.len(), 1); // the summary event
    }

    #[test]
    fn clones_share_the_sink() {
        let sink = Arc::new(MemorySink::new());
        let engine = DecisionEngine::new(sink.clone());
        let clone = engine.clone();
        let _ = clone.resolve(
            &BucketingPayload::default(),
            "visitor_1",
            &VisitorContext::new(),
        );
        assert_eq!(sink.len(), 1);
    }
}
