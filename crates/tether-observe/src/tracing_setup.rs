//! Tracing subscriber initialization for the Tether client.
//!
//! Log lines go to stderr so command output on stdout stays parseable
//! (`--json`). Spans can additionally be exported through OpenTelemetry.
//!
//! ```no_run
//! use tether_observe::{Verbosity, init_tracing};
//!
//! init_tracing(Verbosity::from_flags(1, false), false).unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use std::sync::OnceLock;

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// How much the client logs, derived from `-v` / `--quiet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Warnings, e.g. a storage clear that left a file behind.
    Normal,
    /// Session lifecycle detail from the core and adapter crates.
    Debug,
    /// Everything, including every published session event.
    Trace,
}

impl Verbosity {
    /// `quiet` only applies when no `-v` was given.
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match verbose {
            0 if quiet => Verbosity::Quiet,
            0 => Verbosity::Normal,
            1 => Verbosity::Debug,
            _ => Verbosity::Trace,
        }
    }

    /// Default filter directives for this level.
    pub fn directives(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Debug => "info,tether_core=debug,tether_infra=debug",
            Verbosity::Trace => "trace",
        }
    }
}

/// `RUST_LOG` wins over the verbosity flags.
pub fn build_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directives()))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init_tracing(
    verbosity: Verbosity,
    enable_otel: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity != Verbosity::Normal)
        .with_span_events(FmtSpan::CLOSE);

    let otel_layer = enable_otel.then(|| {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("tether-client");
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(build_filter(verbosity))
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush exported spans. No-op when OTel was never enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}
