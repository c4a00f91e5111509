//! Structured logging and the process-wide metrics registry.

mod logging;
mod metrics;

pub use logging::{init_logging, TelemetryError};
pub use metrics::{Counter, Gauge, Histogram, MetricsRegistry};
