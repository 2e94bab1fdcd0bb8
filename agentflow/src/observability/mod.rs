//! Span attributes, timing and subscriber setup.

mod logging;
mod spans;

pub use logging::init_logging;
pub use spans::{RunSpanAttributes, SpanTimer, StageSpanAttributes};
