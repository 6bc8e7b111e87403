//! Panic-mode guard.
//!
//! The flag-management API can flip a payload-level `panic` flag as an
//! emergency rollback: every client must stop serving decisions until a
//! later payload clears it. The check runs before any targeting or
//! allocation work, on every resolve over every freshly fetched snapshot,
//! never just once at startup.

use crate::model::BucketingPayload;
use crate::observability::{Event, EventSink};

/// Returns `true` and reports the safe-mode notice if the payload's panic
/// flag is set. The notice is emitted exactly once per call.
#[must_use]
pub fn panic_active(payload: &BucketingPayload, sink: &dyn EventSink) -> bool {
    if payload.panic {
        sink.emit(Event::PanicModeActive);
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{MemorySink, Severity};

    #[test]
    fn clear_flag_emits_nothing() {
        let sink = MemorySink::new();
        assert!(!panic_active(&BucketingPayload::default(), &sink));
        assert!(sink.is_empty());
    }

    #[test]
    fn set_flag_emits_one_warning() {
        let payload = BucketingPayload {
            panic: true,
            campaigns: Vec::new(),
        };
        let sink = MemorySink::new();
        assert!(panic_active(&payload, &sink));

        let events = sink.events();
        assert_eq!(events, vec![Event::PanicModeActive]);
        assert_eq!(events[0].severity(), Severity::Warning);
    }
}
