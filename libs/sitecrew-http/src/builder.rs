use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::USER_AGENT;
use http::{HeaderValue, Request, Response};
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tower::buffer::Buffer;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower::util::BoxCloneService;
use tower::{Layer, ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;
use tower_http::set_header::SetRequestHeaderLayer;

use crate::client::HttpClient;
use crate::config::{HttpClientConfig, TransportSecurity};
use crate::error::{BoxError, HttpError};
use crate::request_log::RequestLogLayer;
use crate::response::ResponseBody;

/// The stack below the auth slot, as handed to [`HttpClientBuilder::with_auth_layer`].
pub type InnerService = BoxCloneService<Request<Full<Bytes>>, Response<ResponseBody>, HttpError>;

type AuthWrap = Box<dyn FnOnce(InnerService) -> InnerService + Send>;

pub struct HttpClientBuilder {
    config: HttpClientConfig,
    auth: Option<AuthWrap>,
}

impl HttpClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HttpClientConfig::default())
    }

    #[must_use]
    pub fn with_config(config: HttpClientConfig) -> Self {
        Self { config, auth: None }
    }

    /// Wrap the transport with an auth layer.
    ///
    /// The layer sits outside the timeout, so a request it replays gets a
    /// fresh one. A second call replaces the first.
    #[must_use]
    pub fn with_auth_layer(
        mut self,
        wrap: impl FnOnce(InnerService) -> InnerService + Send + 'static,
    ) -> Self {
        self.auth = Some(Box::new(wrap));
        self
    }

    /// Build the client. Needs a tokio runtime for the request queue worker.
    ///
    /// # Errors
    /// `Tls` if the connector cannot be set up, `Header` for an unusable
    /// user agent.
    pub fn build(self) -> Result<HttpClient, HttpError> {
        let config = self.config;
        if config.transport == TransportSecurity::AllowInsecureHttp {
            tracing::debug!("plain http allowed for this client");
        }

        let mut pool = Client::builder(TokioExecutor::new());
        pool.pool_timer(TokioTimer::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host);
        let hyper_client = pool.build::<_, Full<Bytes>>(https_connector(config.transport)?);

        let user_agent = HeaderValue::from_str(&config.user_agent)?;
        let timeout = config.request_timeout;

        // Buffer > RequestLog? > Auth? > Timeout > User-Agent > Decompression > hyper
        let mut service: InnerService = ServiceBuilder::new()
            .layer(TimeoutLayer::new(timeout))
            .layer(SetRequestHeaderLayer::if_not_present(USER_AGENT, user_agent))
            .layer(DecompressionLayer::new())
            .service(hyper_client)
            .map_response(box_body)
            .map_err(move |e: BoxError| classify(e, timeout))
            .boxed_clone();

        if let Some(wrap) = self.auth {
            service = wrap(service);
        }
        if config.log_requests {
            service = RequestLogLayer.layer(service).boxed_clone();
        }

        Ok(HttpClient::new(
            Buffer::new(service, config.buffer_capacity.max(1)),
            config.max_body_size,
            config.transport,
        ))
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn box_body<B>(response: Response<B>) -> Response<ResponseBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<BoxError>,
{
    response.map(|body| body.map_err(Into::into).boxed())
}

fn classify(err: BoxError, timeout: Duration) -> HttpError {
    if err.is::<Elapsed>() {
        HttpError::Timeout(timeout)
    } else {
        HttpError::Transport(err)
    }
}

/// Webpki roots over the installed crypto provider, aws-lc-rs when none is.
fn https_connector(transport: TransportSecurity) -> Result<HttpsConnector<HttpConnector>, HttpError> {
    let provider = rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    let builder = HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(provider)
        .map_err(|e| HttpError::Tls(Box::new(e)))?;
    let builder = match transport {
        TransportSecurity::TlsOnly => builder.https_only(),
        TransportSecurity::AllowInsecureHttp => builder.https_or_http(),
    };
    Ok(builder.enable_http1().enable_http2().build())
}
