use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;

/// Logs every outbound request at debug level inside an `outgoing_http`
/// span. The query string is left out of the logged URL.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RequestLogLayer;

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService { inner }
    }
}

#[derive(Clone)]
pub(crate) struct RequestLogService<S> {
    inner: S,
}

impl<S, ResBody> Service<Request<Full<Bytes>>> for RequestLogService<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Display + Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
        let method = req.method().clone();
        let uri = req.uri();
        // Query strings may carry API keys
        let url = format!(
            "{}://{}{}",
            uri.scheme_str().unwrap_or("https"),
            uri.authority().map_or("", http::uri::Authority::as_str),
            uri.path()
        );

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let span = tracing::debug_span!("outgoing_http", http.method = %method, http.url = %url);

        Box::pin(
            async move {
                tracing::debug!("sending request");
                let started = Instant::now();
                let result = inner.call(req).await;
                let elapsed_ms = started.elapsed().as_millis();

                match &result {
                    Ok(response) => tracing::debug!(
                        status = response.status().as_u16(),
                        elapsed_ms,
                        "response received"
                    ),
                    Err(e) => tracing::debug!(error = %e, elapsed_ms, "request failed"),
                }

                result
            }
            .instrument(span),
        )
    }
}
