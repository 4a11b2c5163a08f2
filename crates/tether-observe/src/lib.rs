//! Observability setup for Tether: structured logging via `tracing` and
//! optional OpenTelemetry span export.

pub mod tracing_setup;

pub use tracing_setup::{Verbosity, init_tracing, shutdown_tracing};
