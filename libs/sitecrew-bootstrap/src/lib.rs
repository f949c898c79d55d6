#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Configuration loading and logging setup for the Sitecrew admin backend.

pub mod config;
pub mod error;
pub mod humantime_serde;
pub mod logging;

pub use config::{
    ApiConfig, AppConfig, AuthConfig, ENV_PREFIX, Environment, LoggingConfig, UsersConfig,
};
pub use error::ConfigError;
pub use logging::init_logging;
