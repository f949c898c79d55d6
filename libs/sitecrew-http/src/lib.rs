#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! HTTP client for the Sitecrew admin backend
//!
//! hyper over rustls behind a small tower stack: per-request timeout,
//! User-Agent, response decompression, debug request logging for
//! development, and a slot for the bearer auth layer from `sitecrew-auth`.
//! Requests are sent once; non-2xx statuses come back as responses and
//! become [`HttpError::Status`] when the body is read.
//!
//! ```ignore
//! let client = HttpClientBuilder::with_config(HttpClientConfig::default()).build()?;
//! let health: HealthStatus = client
//!     .get("https://api.sitecrew.example/health")
//!     .send()
//!     .await?
//!     .json()
//!     .await?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod request;
mod request_log;
mod response;

pub use builder::{HttpClientBuilder, InnerService};
pub use client::HttpClient;
pub use config::{
    DEFAULT_MAX_BODY_SIZE, DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT, HttpClientConfig,
    TransportSecurity,
};
pub use error::{BoxError, HttpError};
pub use request::RequestBuilder;
pub use response::{HttpResponse, ResponseBody, buffered_body, read_body_limited};
