//! Observability for the decision engine.
//!
//! Typed events, pluggable sinks, and `tracing` subscriber setup. The
//! engine emits events through a caller-supplied sink rather than any
//! global state, so a resolve pass can be audited by capture.

pub mod events;
pub mod logging;

pub use events::{Event, EventSink, JsonlSink, MemorySink, NullSink, Severity, TracingSink};
pub use logging::{LogFormat, init_logging};
