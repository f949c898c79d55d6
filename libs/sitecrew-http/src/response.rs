use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use serde::de::DeserializeOwned;

use crate::error::{BoxError, HttpError};

/// How much of a failed response's body is kept for error messages.
const ERROR_BODY_LIMIT: usize = 8 * 1024;

/// Response body as it leaves the tower stack.
pub type ResponseBody = http_body_util::combinators::BoxBody<Bytes, BoxError>;

/// Re-wrap bytes that a layer had to read so the response can move on.
#[must_use]
pub fn buffered_body(bytes: Bytes) -> ResponseBody {
    Full::new(bytes)
        .map_err(|never| -> BoxError { match never {} })
        .boxed()
}

/// Collect a body, giving up once it grows past `limit` bytes.
///
/// # Errors
/// `BodyTooLarge` past the limit, `Transport` if the stream breaks.
pub async fn read_body_limited(body: ResponseBody, limit: usize) -> Result<Bytes, HttpError> {
    // Boxed so the `Send` check on the collect future happens here with concrete
    // lifetimes rather than inside callers' async state machines.
    let collect: CollectFuture = Box::pin(Limited::new(body, limit).collect());
    match collect.await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(HttpError::BodyTooLarge { limit }),
        Err(e) => Err(HttpError::Transport(e)),
    }
}

type CollectFuture = std::pin::Pin<
    Box<
        dyn std::future::Future<Output = Result<http_body_util::Collected<Bytes>, BoxError>> + Send,
    >,
>;

/// A received response. Every status arrives here; reading the body
/// through [`checked_bytes`](Self::checked_bytes) or [`json`](Self::json)
/// turns non-2xx into [`HttpError::Status`].
#[derive(Debug)]
pub struct HttpResponse {
    inner: Response<ResponseBody>,
    max_body_size: usize,
}

impl HttpResponse {
    pub(crate) fn new(inner: Response<ResponseBody>, max_body_size: usize) -> Self {
        Self {
            inner,
            max_body_size,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Body bytes of a 2xx response.
    ///
    /// # Errors
    /// `Status` carrying the start of the body for non-2xx, `BodyTooLarge`
    /// past the configured limit.
    pub async fn checked_bytes(self) -> Result<Bytes, HttpError> {
        let status = self.inner.status();
        let body = self.inner.into_body();
        if status.is_success() {
            return read_body_limited(body, self.max_body_size).await;
        }

        let body = match read_body_limited(body, self.max_body_size.min(ERROR_BODY_LIMIT)).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            // The status matters more than an oversized error page
            Err(HttpError::BodyTooLarge { .. }) => String::new(),
            Err(e) => return Err(e),
        };
        Err(HttpError::Status { status, body })
    }

    /// Decode a 2xx JSON body.
    ///
    /// # Errors
    /// As [`checked_bytes`](Self::checked_bytes), plus `Json` when decoding fails.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let bytes = self.checked_bytes().await?;
        serde_json::from_slice(&bytes).map_err(HttpError::Json)
    }
}
