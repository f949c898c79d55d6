use async_trait::async_trait;
use serde::Deserialize;
use sitecrew_http::{HttpClient, HttpClientBuilder, HttpClientConfig};
use url::Url;

use crate::error::AuthError;
use crate::secret::SecretString;
use crate::storage::StoredTokens;

/// Exchanges an expired session for a fresh access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// `Ok(None)` means the session cannot be refreshed (no refresh token, or
    /// the provider returned no access token); the caller signs out.
    ///
    /// # Errors
    /// Returns `AuthError` when the provider request itself fails.
    async fn refresh(
        &self,
        refresh_token: Option<&SecretString>,
    ) -> Result<Option<StoredTokens>, AuthError>;
}

/// Refresher for deployments without a token endpoint: every 401 signs out.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRefresh;

#[async_trait]
impl TokenRefresher for NoRefresh {
    async fn refresh(
        &self,
        _refresh_token: Option<&SecretString>,
    ) -> Result<Option<StoredTokens>, AuthError> {
        Ok(None)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Refresh-token grant against the identity provider token endpoint.
///
/// Sends `grant_type=refresh_token&refresh_token=<rt>` as a form body, with the
/// project API key as the `key` query parameter when configured. The reply's
/// `id_token` (or `access_token`) becomes the new bearer token; a returned
/// `refresh_token` replaces the old one.
pub struct IdentityProviderRefresher {
    client: HttpClient,
    endpoint: Url,
}

impl IdentityProviderRefresher {
    /// # Errors
    /// Returns `AuthError::Http` if the HTTP client cannot be built.
    pub fn new(
        token_endpoint: Url,
        api_key: Option<&SecretString>,
        http_config: HttpClientConfig,
    ) -> Result<Self, AuthError> {
        let client = HttpClientBuilder::with_config(http_config).build()?;
        Ok(Self::with_client(client, token_endpoint, api_key))
    }

    pub fn with_client(client: HttpClient, mut endpoint: Url, api_key: Option<&SecretString>) -> Self {
        if let Some(key) = api_key {
            endpoint.query_pairs_mut().append_pair("key", key.expose());
        }
        Self { client, endpoint }
    }
}

impl std::fmt::Debug for IdentityProviderRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProviderRefresher")
            .field("host", &self.endpoint.host_str())
            .field("path", &self.endpoint.path())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenRefresher for IdentityProviderRefresher {
    async fn refresh(
        &self,
        refresh_token: Option<&SecretString>,
    ) -> Result<Option<StoredTokens>, AuthError> {
        let Some(refresh_token) = refresh_token else {
            tracing::debug!("no refresh token stored; cannot refresh session");
            return Ok(None);
        };

        let response: TokenResponse = self
            .client
            .post(self.endpoint.as_str())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose()),
            ])?
            .send()
            .await?
            .json()
            .await?;

        let Some(access) = response.id_token.or(response.access_token) else {
            tracing::warn!("token endpoint replied without a token");
            return Ok(None);
        };

        let rotated = response
            .refresh_token
            .map_or_else(|| refresh_token.clone(), SecretString::from);

        Ok(Some(StoredTokens {
            access_token: SecretString::from(access),
            refresh_token: Some(rotated),
        }))
    }
}
