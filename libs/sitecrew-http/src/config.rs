use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("sitecrew-admin/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout for backend calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Largest response body read from the backend (10 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Which URL schemes a client will send to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportSecurity {
    /// `https://` only
    #[default]
    TlsOnly,
    /// `http://` as well, for a local backend or mock servers
    AllowInsecureHttp,
}

impl TransportSecurity {
    pub(crate) fn permits(self, scheme: &str) -> bool {
        matches!(
            (self, scheme),
            (_, "https") | (Self::AllowInsecureHttp, "http")
        )
    }
}

/// Settings for one [`HttpClient`](crate::HttpClient).
///
/// A request is sent once. The only replay in the stack is the auth layer's
/// single retry after a token refresh, which gets its own timeout.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub request_timeout: Duration,
    pub max_body_size: usize,
    pub user_agent: String,
    pub transport: TransportSecurity,
    /// Log method, path, status and latency of every request at debug level
    pub log_requests: bool,
    /// Requests queued ahead of the connection pool
    pub buffer_capacity: usize,
    pub pool_idle_timeout: Option<Duration>,
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            transport: TransportSecurity::TlsOnly,
            log_requests: false,
            buffer_capacity: 256,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 8,
        }
    }
}

impl HttpClientConfig {
    /// Small pool and body limit for the identity provider's token endpoint.
    #[must_use]
    pub fn token_endpoint() -> Self {
        Self {
            max_body_size: 1024 * 1024,
            buffer_capacity: 32,
            pool_max_idle_per_host: 2,
            ..Self::default()
        }
    }

    /// Plain http and request logging, for tests against mock servers.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            max_body_size: 1024 * 1024,
            transport: TransportSecurity::AllowInsecureHttp,
            log_requests: true,
            buffer_capacity: 64,
            pool_idle_timeout: Some(Duration::from_secs(10)),
            pool_max_idle_per_host: 2,
            ..Self::default()
        }
    }
}
