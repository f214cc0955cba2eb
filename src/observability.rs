//! Logging initialization shared by binaries and integration tests.

/// Installs the global fmt subscriber with an env-driven filter. The
/// `log` macros used across the crate are bridged automatically. Calling
/// this more than once is a no-op.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "toolscout=info".into());
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!("logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_harmless() {
        init_logging();
        init_logging();
    }
}
