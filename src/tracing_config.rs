//! Tracing subscriber configuration
//!
//! The server binary configures the subscriber; the library only emits
//! events. `RUST_LOG` always wins over the verbosity mapping so operators
//! can scope filtering per module without touching flags.

use tracing_subscriber::EnvFilter;

/// Subscriber configuration assembled by the server binary
#[derive(Debug, Default)]
pub struct TracingConfig {
    /// Verbosity level from repeated `-v` flags
    pub verbosity: u8,
    /// Explicit filter directive, overriding the verbosity mapping
    pub env_filter: Option<String>,
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the verbosity level
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set a custom filter directive
    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Map repeated `-v` flags to a filter directive
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",  // default: request-level messages
            1 => "debug", // -v: stage internals and upstream calls
            _ => "trace", // -vv+: everything
        }
    }

    /// Install the global subscriber.
    ///
    /// Precedence: explicit filter, then `RUST_LOG`, then the verbosity
    /// mapping.
    ///
    /// # Errors
    ///
    /// Fails when the filter directive does not parse or a subscriber is
    /// already installed.
    pub fn init(self) -> anyhow::Result<()> {
        let filter = if let Some(directive) = &self.env_filter {
            EnvFilter::try_new(directive)?
        } else {
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(self.verbosity_to_filter()))?
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
        Ok(())
    }
}

/// Initialize tracing with server defaults
///
/// # Errors
///
/// Fails when a subscriber is already installed.
pub fn init_server_tracing(verbosity: u8) -> anyhow::Result<()> {
    TracingConfig::new().with_verbosity(verbosity).init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(TracingConfig::new().with_verbosity(0).verbosity_to_filter(), "info");
        assert_eq!(TracingConfig::new().with_verbosity(1).verbosity_to_filter(), "debug");
        assert_eq!(TracingConfig::new().with_verbosity(2).verbosity_to_filter(), "trace");
        assert_eq!(TracingConfig::new().with_verbosity(10).verbosity_to_filter(), "trace");
    }

    #[test]
    fn test_explicit_filter_is_kept() {
        let config = TracingConfig::new()
            .with_verbosity(2)
            .with_env_filter("alive3d=debug,hyper=warn");
        assert_eq!(config.env_filter.as_deref(), Some("alive3d=debug,hyper=warn"));
        assert_eq!(config.verbosity, 2);
    }
}
