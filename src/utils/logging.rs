use tracing_subscriber::EnvFilter;

/// Environment variable holding the `tracing` filter directive.
pub const LOG_ENV_VAR: &str = "CORTEX_LOG";

/// Build the filter from `CORTEX_LOG`, or from `default_directive` when the
/// variable is unset or unparsable.
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install a global `fmt` subscriber writing to stderr.
///
/// Returns false when a global subscriber was already installed, which is
/// not treated as an error.
pub fn init_tracing(default_directive: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
