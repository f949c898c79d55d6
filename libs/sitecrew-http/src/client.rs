use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::{Method, Request, Response};
use http_body_util::Full;
use tower::buffer::Buffer;
use tower::{Service, ServiceExt};

use crate::builder::HttpClientBuilder;
use crate::config::TransportSecurity;
use crate::error::HttpError;
use crate::request::RequestBuilder;
use crate::response::{HttpResponse, ResponseBody};

type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<Response<ResponseBody>, HttpError>> + Send>>;

pub(crate) type SharedService = Buffer<Request<Full<Bytes>>, ServiceFuture>;

/// Client for the admin backend and the identity provider.
///
/// Clones share one connection pool and one request queue.
#[derive(Clone)]
pub struct HttpClient {
    service: SharedService,
    max_body_size: usize,
    transport: TransportSecurity,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("max_body_size", &self.max_body_size)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    pub(crate) fn new(
        service: SharedService,
        max_body_size: usize,
        transport: TransportSecurity,
    ) -> Self {
        Self {
            service,
            max_body_size,
            transport,
        }
    }

    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::GET, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::POST, url)
    }

    pub fn put(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::PUT, url)
    }

    pub fn patch(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::PATCH, url)
    }

    pub fn delete(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::DELETE, url)
    }

    pub(crate) fn transport(&self) -> TransportSecurity {
        self.transport
    }

    pub(crate) async fn dispatch(
        &self,
        request: Request<Full<Bytes>>,
    ) -> Result<HttpResponse, HttpError> {
        let mut service = self.service.clone();
        let response = service
            .ready()
            .await
            .map_err(from_queue)?
            .call(request)
            .await
            .map_err(from_queue)?;
        Ok(HttpResponse::new(response, self.max_body_size))
    }
}

/// The queue boxes the stack's own errors; anything else means its worker died.
fn from_queue(err: tower::BoxError) -> HttpError {
    match err.downcast::<HttpError>() {
        Ok(err) => *err,
        Err(err) => {
            tracing::error!(error = %err, "HTTP request queue stopped");
            HttpError::Closed
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_USER_AGENT, HttpClientConfig};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn client() -> HttpClient {
        HttpClientBuilder::with_config(HttpClientConfig::for_testing())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn get_decodes_json() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200).json_body(json!({"status": "ok"}));
        });

        let body: serde_json::Value = client()
            .get(&server.url("/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn error_status_is_a_response_until_read() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/api/users/missing");
            then.status(404).json_body(json!({"error": "User not found"}));
        });

        let response = client()
            .delete(&server.url("/api/users/missing"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);

        let err = response.checked_bytes().await.unwrap_err();
        assert!(matches!(
            err,
            HttpError::Status { status, ref body }
                if status == http::StatusCode::NOT_FOUND && body.contains("User not found")
        ));
    }

    #[tokio::test]
    async fn failures_are_sent_once() {
        let server = MockServer::start();
        let unavailable = server.mock(|when, then| {
            when.method(GET).path("/api/users");
            then.status(503);
        });

        let err = client()
            .get(&server.url("/api/users"))
            .send()
            .await
            .unwrap()
            .checked_bytes()
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(http::StatusCode::SERVICE_UNAVAILABLE));
        unavailable.assert_calls(1);
    }

    #[tokio::test]
    async fn user_agent_added_when_missing() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/health")
                .header("user-agent", DEFAULT_USER_AGENT);
            then.status(200);
        });

        client().get(&server.url("/health")).send().await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start();
        let slow = server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200).delay(Duration::from_millis(500));
        });

        let client = HttpClientBuilder::with_config(HttpClientConfig {
            request_timeout: Duration::from_millis(50),
            ..HttpClientConfig::for_testing()
        })
        .build()
        .unwrap();

        let err = client.get(&server.url("/slow")).send().await.unwrap_err();
        assert!(matches!(err, HttpError::Timeout(d) if d == Duration::from_millis(50)));
        slow.assert_calls(1);
    }

    #[tokio::test]
    async fn json_body_sets_content_type() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/users/u1")
                .header("content-type", "application/json")
                .json_body(json!({"isActive": false}));
            then.status(200);
        });

        client()
            .put(&server.url("/api/users/u1"))
            .json(&json!({"isActive": false}))
            .unwrap()
            .send()
            .await
            .unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn form_body_is_urlencoded() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .header("content-type", "application/x-www-form-urlencoded")
                .body("grant_type=refresh_token&refresh_token=r1");
            then.status(200);
        });

        client()
            .post(&server.url("/token"))
            .form(&[("grant_type", "refresh_token"), ("refresh_token", "r1")])
            .unwrap()
            .send()
            .await
            .unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn tls_only_client_refuses_plain_http() {
        let client = HttpClientBuilder::new().build().unwrap();
        let err = client
            .get("http://localhost:5000/health")
            .send()
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl { .. }));
    }

    #[test]
    fn client_is_shareable() {
        fn assert_traits<T: Send + Sync + Clone>() {}
        assert_traits::<HttpClient>();
    }
}
