use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, ConfigError};

/// Installs the global subscriber. `RUST_LOG` takes precedence over `LOG_LEVEL`.
pub fn init_tracing(config: &AppConfig) -> Result<(), ConfigError> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directive) if !directive.trim().is_empty() => EnvFilter::try_new(directive.trim()),
        _ => EnvFilter::try_new(config.log_level.trim()),
    }
    .map_err(|e| ConfigError::Invalid {
        key: "LOG_LEVEL",
        message: e.to_string(),
    })?;

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
