//! Diagnostic logging setup.
//!
//! Diagnostics go to stderr through `tracing`; command results stay on stdout.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g. `statelock=debug`.
pub const LOG_ENV: &str = "STATELOCK_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";
const VERBOSE_DIRECTIVE: &str = "debug";

/// The filter directive to use: `--verbose` wins, then `STATELOCK_LOG`, then `warn`.
fn directive(verbose: bool, env_value: Option<&str>) -> &str {
    if verbose {
        return VERBOSE_DIRECTIVE;
    }
    match env_value.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => DEFAULT_DIRECTIVE,
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let filter = match EnvFilter::try_new(directive(verbose, env_value.as_deref())) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Warning: ignoring invalid {}: {}", LOG_ENV, e);
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}
