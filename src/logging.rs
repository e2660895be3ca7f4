//! Diagnostic logging on stderr via `tracing-subscriber`.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies, with
//! chatty dependencies held at `warn`.

use tracing_subscriber::{EnvFilter, fmt};

/// Dependencies whose debug output drowns the pipeline's own events.
const NOISY_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "tokio_postgres"];

/// Build the filter for `level`, honouring `RUST_LOG` when present.
pub fn build_env_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let mut directives = vec![level.to_string()];
    for target in NOISY_TARGETS {
        directives.push(format!("{}=warn", target));
    }
    EnvFilter::try_new(directives.join(","))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(level: &str) {
    let _ = fmt()
        .with_env_filter(build_env_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
