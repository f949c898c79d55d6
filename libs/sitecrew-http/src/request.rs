use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, Request, Uri};
use http_body_util::Full;
use serde::Serialize;

use crate::client::HttpClient;
use crate::config::TransportSecurity;
use crate::error::HttpError;
use crate::response::HttpResponse;

/// One request being assembled; nothing is sent until [`send`](Self::send).
#[must_use = "requests are only sent by .send()"]
pub struct RequestBuilder {
    client: HttpClient,
    method: Method,
    url: String,
    body: Option<(HeaderValue, Bytes)>,
}

impl RequestBuilder {
    pub(crate) fn new(client: HttpClient, method: Method, url: &str) -> Self {
        Self {
            client,
            method,
            url: url.to_owned(),
            body: None,
        }
    }

    /// Serialize `body` as the JSON payload.
    ///
    /// # Errors
    /// `Encode` if serialization fails.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, HttpError> {
        let bytes = serde_json::to_vec(body).map_err(|e| HttpError::Encode(Box::new(e)))?;
        self.body = Some((HeaderValue::from_static("application/json"), bytes.into()));
        Ok(self)
    }

    /// Send `fields` as an `application/x-www-form-urlencoded` body.
    ///
    /// # Errors
    /// `Encode` if encoding fails.
    pub fn form(mut self, fields: &[(&str, &str)]) -> Result<Self, HttpError> {
        let encoded =
            serde_urlencoded::to_string(fields).map_err(|e| HttpError::Encode(Box::new(e)))?;
        self.body = Some((
            HeaderValue::from_static("application/x-www-form-urlencoded"),
            encoded.into(),
        ));
        Ok(self)
    }

    /// Send once and return the response, whatever its status.
    ///
    /// # Errors
    /// `InvalidUrl` before sending; `Timeout`, `Transport` or `Closed` when no
    /// response arrives.
    pub async fn send(self) -> Result<HttpResponse, HttpError> {
        let uri = parse_target(&self.url, self.client.transport())?;

        let mut request = Request::builder().method(self.method).uri(uri);
        let body = match self.body {
            Some((content_type, bytes)) => {
                request = request.header(CONTENT_TYPE, content_type);
                bytes
            }
            None => Bytes::new(),
        };

        self.client.dispatch(request.body(Full::new(body))?).await
    }
}

fn parse_target(url: &str, transport: TransportSecurity) -> Result<Uri, HttpError> {
    let invalid = |reason: &'static str| HttpError::InvalidUrl {
        url: url.to_owned(),
        reason,
    };

    let uri: Uri = url.parse().map_err(|_| invalid("not a valid URL"))?;
    if uri.host().is_none() {
        return Err(invalid("URL has no host"));
    }
    match uri.scheme_str() {
        Some(scheme) if transport.permits(scheme) => Ok(uri),
        Some("http") => Err(invalid("plain http is not allowed here")),
        Some(_) => Err(invalid("only http and https are supported")),
        None => Err(invalid("URL has no scheme")),
    }
}
