//! Tracing subscriber initialization.
//!
//! ```no_run
//! // Warnings only, unless RUST_LOG says otherwise
//! athena_observe::init_tracing("warn", false).unwrap();
//!
//! // Debug logging plus OpenTelemetry spans on stdout
//! athena_observe::init_tracing("athena=debug", true).unwrap();
//! athena_observe::shutdown_tracing();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Install the global subscriber.
///
/// Log lines go to stderr so `--json` output on stdout stays machine
/// readable. `RUST_LOG` takes precedence over `default_directive`. With
/// `enable_otel`, spans (`rag.ask`, `gen_ai.generate`, `ingest.build_index`)
/// are also exported through the OpenTelemetry stdout exporter.
///
/// # Errors
///
/// Fails if `default_directive` does not parse or a global subscriber is
/// already installed.
pub fn init_tracing(
    default_directive: &str,
    enable_otel: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(from_env) if !from_env.trim().is_empty() => EnvFilter::try_new(from_env)?,
        _ => EnvFilter::try_new(default_directive)?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    if enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("athena");
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

/// Flush buffered spans. A no-op when OpenTelemetry was not enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        eprintln!("Warning: OpenTelemetry shutdown error: {e}");
    }
}

/// Filter directive for a CLI verbosity level: `-q` maps to `error`, no
/// flag to `warn`, then `info`, `debug`, and `trace` for each `-v`.
pub fn verbosity_directive(quiet: bool, verbose: u8) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert_eq!(verbosity_directive(true, 3), "error");
    }

    #[test]
    fn test_each_v_raises_the_level() {
        assert_eq!(verbosity_directive(false, 0), "warn");
        assert_eq!(verbosity_directive(false, 1), "info");
        assert_eq!(verbosity_directive(false, 2), "debug");
        assert_eq!(verbosity_directive(false, 9), "trace");
    }

    #[test]
    fn test_directives_parse() {
        for v in 0..4 {
            assert!(EnvFilter::try_new(verbosity_directive(false, v)).is_ok());
        }
    }
}
