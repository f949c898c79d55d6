use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{HeaderValue, Request, Response, StatusCode};
use http_body_util::Full;
use sitecrew_http::{HttpError, ResponseBody, buffered_body, read_body_limited};
use tower::{Layer, Service, ServiceExt};

use crate::refresher::TokenRefresher;
use crate::secret::SecretString;
use crate::storage::TokenStorage;

/// Upper bound on a 401 body kept for the caller while refreshing.
const UNAUTHORIZED_BODY_LIMIT: usize = 64 * 1024;

/// Tower layer that attaches the stored bearer token and handles one
/// refresh-and-retry on `401 Unauthorized`.
///
/// On 401 the refresher is called once. A new token is stored and the request
/// replayed exactly once. If the refresh yields nothing, fails, or the replay
/// is also 401, both storage scopes are cleared and the original 401 response
/// is returned.
#[derive(Clone)]
pub struct BearerRefreshLayer {
    storage: TokenStorage,
    refresher: Arc<dyn TokenRefresher>,
}

impl BearerRefreshLayer {
    pub fn new(storage: TokenStorage, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self { storage, refresher }
    }
}

impl std::fmt::Debug for BearerRefreshLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerRefreshLayer")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for BearerRefreshLayer {
    type Service = BearerRefreshService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerRefreshService {
            inner,
            storage: self.storage.clone(),
            refresher: Arc::clone(&self.refresher),
        }
    }
}

#[derive(Clone)]
pub struct BearerRefreshService<S> {
    inner: S,
    storage: TokenStorage,
    refresher: Arc<dyn TokenRefresher>,
}

fn bearer_header(token: &SecretString) -> Result<HeaderValue, HttpError> {
    let raw = zeroize::Zeroizing::new(format!("Bearer {}", token.expose()));
    let mut value = HeaderValue::from_str(&raw)?;
    value.set_sensitive(true);
    Ok(value)
}

fn with_bearer(
    parts: &http::request::Parts,
    body: &Full<Bytes>,
    token: Option<&SecretString>,
) -> Result<Request<Full<Bytes>>, HttpError> {
    let mut req = Request::from_parts(parts.clone(), body.clone());
    if let Some(token) = token {
        req.headers_mut().insert(AUTHORIZATION, bearer_header(token)?);
    }
    Ok(req)
}

/// Sign out after a failed refresh, returning the original 401.
fn sign_out(storage: &TokenStorage, original: Response<ResponseBody>) -> Response<ResponseBody> {
    if let Err(e) = storage.clear_all() {
        tracing::error!(error = %e, "failed to clear stored credentials");
    }
    tracing::warn!("session expired; stored credentials cleared");
    original
}

impl<S> Service<Request<Full<Bytes>>> for BearerRefreshService<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<ResponseBody>, Error = HttpError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = Response<ResponseBody>;
    type Error = HttpError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let storage = self.storage.clone();
        let refresher = Arc::clone(&self.refresher);

        Box::pin(async move {
            let (parts, body) = req.into_parts();

            let first = with_bearer(&parts, &body, storage.access_token().as_ref())?;
            let response = inner.call(first).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            // Keep the 401 intact for the caller in case refresh fails
            let (resp_parts, resp_body) = response.into_parts();
            let bytes = read_body_limited(resp_body, UNAUTHORIZED_BODY_LIMIT)
                .await
                .unwrap_or_default();
            let original = Response::from_parts(resp_parts, buffered_body(bytes));

            tracing::debug!(path = %parts.uri.path(), "401 received; refreshing token");

            let refreshed = match refresher.refresh(storage.refresh_token().as_ref()).await {
                Ok(Some(tokens)) => tokens,
                Ok(None) => return Ok(sign_out(&storage, original)),
                Err(e) => {
                    tracing::warn!(error = %e, "token refresh failed");
                    return Ok(sign_out(&storage, original));
                }
            };

            if let Err(e) = storage.store_refreshed(&refreshed) {
                tracing::warn!(error = %e, "failed to persist refreshed token");
            }

            let replay = with_bearer(&parts, &body, Some(&refreshed.access_token))?;
            let mut svc = inner.clone();
            let response = svc.ready().await?.call(replay).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                return Ok(sign_out(&storage, original));
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::storage::{Scope, StoredTokens};
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Inner service: 200 for `Bearer good`, 401 otherwise.
    #[derive(Clone, Default)]
    struct Backend {
        calls: Arc<AtomicUsize>,
        seen: Arc<parking_lot::Mutex<Vec<Option<String>>>>,
    }

    impl Service<Request<Full<Bytes>>> for Backend {
        type Response = Response<ResponseBody>;
        type Error = HttpError;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

        fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let auth = req
                .headers()
                .get(AUTHORIZATION)
                .map(|v| v.to_str().unwrap().to_owned());
            self.seen.lock().push(auth.clone());
            Box::pin(async move {
                let (status, body) = if auth.as_deref() == Some("Bearer good") {
                    (StatusCode::OK, "ok")
                } else {
                    (StatusCode::UNAUTHORIZED, "original 401")
                };
                Ok(Response::builder()
                    .status(status)
                    .body(buffered_body(Bytes::from_static(body.as_bytes())))
                    .unwrap())
            })
        }
    }

    struct FixedRefresher {
        calls: AtomicUsize,
        result: fn() -> Result<Option<StoredTokens>, AuthError>,
    }

    impl FixedRefresher {
        fn new(result: fn() -> Result<Option<StoredTokens>, AuthError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result,
            })
        }
    }

    #[async_trait]
    impl TokenRefresher for FixedRefresher {
        async fn refresh(
            &self,
            _refresh_token: Option<&SecretString>,
        ) -> Result<Option<StoredTokens>, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn signed_in(token: &str) -> TokenStorage {
        let storage = TokenStorage::in_memory();
        storage
            .store(
                Scope::Persistent,
                &StoredTokens::new(token).with_refresh_token("rt"),
            )
            .unwrap();
        storage
    }

    fn request() -> Request<Full<Bytes>> {
        Request::builder()
            .uri("https://api.sitecrew.example/api/users")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn body_text(resp: Response<ResponseBody>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn valid_token_passes_without_refresh() {
        let backend = Backend::default();
        let refresher = FixedRefresher::new(|| Ok(None));
        let svc = BearerRefreshLayer::new(signed_in("good"), refresher.clone())
            .layer(backend.clone());

        let resp = svc.oneshot(request()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_token_sends_no_header() {
        let backend = Backend::default();
        let svc = BearerRefreshLayer::new(TokenStorage::in_memory(), FixedRefresher::new(|| Ok(None)))
            .layer(backend.clone());

        let resp = svc.oneshot(request()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(*backend.seen.lock(), vec![None]);
    }

    #[tokio::test]
    async fn refresh_success_replays_once() {
        let backend = Backend::default();
        let storage = signed_in("expired");
        let refresher =
            FixedRefresher::new(|| Ok(Some(StoredTokens::new("good").with_refresh_token("rt2"))));
        let svc = BearerRefreshLayer::new(storage.clone(), refresher.clone()).layer(backend.clone());

        let resp = svc.oneshot(request()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            *backend.seen.lock(),
            vec![Some("Bearer expired".to_owned()), Some("Bearer good".to_owned())]
        );
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(storage.access_token().unwrap().expose(), "good");
        assert_eq!(storage.refresh_token().unwrap().expose(), "rt2");
    }

    #[tokio::test]
    async fn failed_refresh_signs_out_and_returns_original() {
        let backend = Backend::default();
        let storage = signed_in("expired");
        let refresher = FixedRefresher::new(|| {
            Err(AuthError::Http(HttpError::Timeout(std::time::Duration::from_secs(10))))
        });
        let svc = BearerRefreshLayer::new(storage.clone(), refresher.clone()).layer(backend.clone());

        let resp = svc.oneshot(request()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(resp).await, "original 401");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert!(!storage.is_signed_in());
    }

    #[tokio::test]
    async fn refresh_without_token_signs_out() {
        let backend = Backend::default();
        let storage = signed_in("expired");
        let svc = BearerRefreshLayer::new(storage.clone(), FixedRefresher::new(|| Ok(None)))
            .layer(backend.clone());

        let resp = svc.oneshot(request()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(!storage.is_signed_in());
    }

    #[tokio::test]
    async fn replay_401_signs_out_and_returns_original() {
        let backend = Backend::default();
        let storage = signed_in("expired");
        let refresher = FixedRefresher::new(|| Ok(Some(StoredTokens::new("still-bad"))));
        let svc = BearerRefreshLayer::new(storage.clone(), refresher.clone()).layer(backend.clone());

        let resp = svc.oneshot(request()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(resp).await, "original 401");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert!(!storage.is_signed_in());
    }
}
