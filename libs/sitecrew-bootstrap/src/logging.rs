use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;
use crate::error::ConfigError;

/// Build the filter: `RUST_LOG` when set and valid, else the configured level.
///
/// # Errors
/// Returns `ConfigError::Invalid` if the configured directive does not parse.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| ConfigError::Invalid {
        field: "logging.level",
        reason: e.to_string(),
    })
}

/// Install the global subscriber (plain or JSON fmt output).
///
/// Returns `Ok(false)` when a subscriber was already installed; the existing
/// one is kept.
///
/// # Errors
/// Returns `ConfigError::Invalid` if the level directive does not parse.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, ConfigError> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    Ok(installed.is_ok())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_rejected() {
        let config = LoggingConfig {
            level: "users=notalevel".to_owned(),
            json: false,
        };
        let result = temp_env::with_var_unset("RUST_LOG", || build_filter(&config));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "logging.level",
                ..
            })
        ));
    }

    #[test]
    fn rust_log_takes_precedence() {
        let config = LoggingConfig {
            level: "users=notalevel".to_owned(),
            json: false,
        };
        let result = temp_env::with_var("RUST_LOG", Some("debug"), || build_filter(&config));
        assert!(result.is_ok());
    }

    #[test]
    fn second_init_is_noop() {
        let config = LoggingConfig::default();
        init_logging(&config).unwrap();
        assert!(!init_logging(&config).unwrap());
    }
}
