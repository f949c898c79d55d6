//! Layered application configuration.
//!
//! Sources, lowest to highest priority:
//! 1. built-in defaults
//! 2. an optional YAML file
//! 3. environment variables prefixed `SITECREW__`, nested with `__`
//!    (`SITECREW__API__REQUEST_TIMEOUT=5s`)

use std::fmt;
use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use sitecrew_http::{DEFAULT_REQUEST_TIMEOUT, HttpClientConfig, TransportSecurity};
use url::Url;

use crate::error::ConfigError;

pub const ENV_PREFIX: &str = "SITECREW__";

/// Delay that `api.retry_delay` defaults to.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// Overrides the per-environment default when set
    pub base_url: Option<String>,
    pub development_base_url: String,
    pub production_base_url: String,
    #[serde(with = "crate::humantime_serde")]
    pub request_timeout: Duration,
    /// Reserved. Nothing retries failed requests; the only replay is the
    /// single one after a token refresh. Non-zero values are reported by
    /// [`AppConfig::unapplied_settings`].
    pub retry_attempts: usize,
    /// Reserved, see `retry_attempts`.
    #[serde(with = "crate::humantime_serde")]
    pub retry_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            development_base_url: "http://localhost:5000".to_owned(),
            production_base_url: "https://api.sitecrew.example".to_owned(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_attempts: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Identity-provider refresh endpoint; without it a 401 signs out directly
    pub token_endpoint: Option<String>,
    pub api_key: Option<String>,
    /// Persistent token scope file; in-memory only when unset
    pub token_file: Option<std::path::PathBuf>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_endpoint", &self.token_endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("token_file", &self.token_file)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UsersConfig {
    /// Unforced fetches within this window after a successful fetch are skipped
    #[serde(with = "crate::humantime_serde")]
    pub freshness_window: Duration,
    /// Reject a second mutation on an entity while one is in flight
    pub reject_concurrent_mutations: bool,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            freshness_window: Duration::from_secs(5 * 60),
            reject_concurrent_mutations: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub users: UsersConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load defaults, then `path` (must exist when given), then environment.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file is missing, a source fails to parse,
    /// or the merged result does not validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            figment = figment.merge(Yaml::file(path));
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        for setting in config.unapplied_settings() {
            tracing::warn!(setting, "setting is not applied; failed requests are not retried");
        }

        tracing::debug!(
            environment = ?config.environment,
            file = ?path,
            "configuration loaded"
        );
        Ok(config)
    }

    /// # Errors
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.base_url()?;
        if self.environment == Environment::Production && base.scheme() != "https" {
            return Err(ConfigError::Invalid {
                field: "api.base_url",
                reason: "production requires an https:// backend".to_owned(),
            });
        }

        if self.api.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "api.request_timeout",
                reason: "must be greater than zero".to_owned(),
            });
        }

        self.token_endpoint()?;
        Ok(())
    }

    /// Backend base URL for the active environment.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the URL does not parse or is not http(s).
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let (field, raw) = match (&self.api.base_url, self.environment) {
            (Some(url), _) => ("api.base_url", url),
            (None, Environment::Development) => {
                ("api.development_base_url", &self.api.development_base_url)
            }
            (None, Environment::Production) => {
                ("api.production_base_url", &self.api.production_base_url)
            }
        };
        parse_http_url(field, raw)
    }

    /// # Errors
    /// Returns `ConfigError::Invalid` if the endpoint is set but unusable.
    pub fn token_endpoint(&self) -> Result<Option<Url>, ConfigError> {
        self.auth
            .token_endpoint
            .as_deref()
            .map(|raw| parse_http_url("auth.token_endpoint", raw))
            .transpose()
    }

    /// Settings that were given but have no effect.
    #[must_use]
    pub fn unapplied_settings(&self) -> Vec<&'static str> {
        let mut unapplied = Vec::new();
        if self.api.retry_attempts > 0 {
            unapplied.push("api.retry_attempts");
        }
        unapplied
    }

    /// HTTP client settings for backend calls.
    #[must_use]
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            request_timeout: self.api.request_timeout,
            transport: self.transport(),
            log_requests: self.environment == Environment::Development,
            ..HttpClientConfig::default()
        }
    }

    /// HTTP client settings for the identity-provider token endpoint.
    #[must_use]
    pub fn token_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            request_timeout: self.api.request_timeout,
            transport: self.transport(),
            log_requests: self.environment == Environment::Development,
            ..HttpClientConfig::token_endpoint()
        }
    }

    /// Plain http is only accepted against local development servers.
    fn transport(&self) -> TransportSecurity {
        match self.environment {
            Environment::Development => TransportSecurity::AllowInsecureHttp,
            Environment::Production => TransportSecurity::TlsOnly,
        }
    }
}

fn parse_http_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        field,
        reason: format!("'{raw}': {e}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid {
            field,
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}
