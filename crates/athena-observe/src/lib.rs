//! Observability setup for Athena: structured logging through `tracing`
//! with an optional OpenTelemetry span exporter.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, shutdown_tracing, verbosity_directive};
