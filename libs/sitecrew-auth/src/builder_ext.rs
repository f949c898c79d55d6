use std::sync::Arc;

use tower::ServiceExt;

use crate::layer::BearerRefreshLayer;
use crate::refresher::TokenRefresher;
use crate::storage::TokenStorage;

/// Adds bearer auth with 401 refresh-and-retry to
/// [`sitecrew_http::HttpClientBuilder`].
///
/// ```ignore
/// use sitecrew_auth::HttpClientBuilderExt;
///
/// let client = HttpClientBuilder::new()
///     .with_bearer_refresh(storage, Arc::new(refresher))
///     .build()?;
/// ```
pub trait HttpClientBuilderExt {
    #[must_use]
    fn with_bearer_refresh(self, storage: TokenStorage, refresher: Arc<dyn TokenRefresher>)
    -> Self;
}

impl HttpClientBuilderExt for sitecrew_http::HttpClientBuilder {
    fn with_bearer_refresh(
        self,
        storage: TokenStorage,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        let layer = BearerRefreshLayer::new(storage, refresher);
        self.with_auth_layer(move |svc| {
            tower::ServiceBuilder::new()
                .layer(layer)
                .service(svc)
                .boxed_clone()
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::refresher::IdentityProviderRefresher;
    use crate::storage::{Scope, StoredTokens};
    use httpmock::prelude::*;
    use serde_json::json;
    use sitecrew_http::{HttpClientBuilder, HttpClientConfig};
    use url::Url;

    fn client(server: &MockServer, storage: &TokenStorage) -> sitecrew_http::HttpClient {
        let refresher = IdentityProviderRefresher::new(
            Url::parse(&server.url("/token")).unwrap(),
            None,
            HttpClientConfig::for_testing(),
        )
        .unwrap();
        HttpClientBuilder::with_config(HttpClientConfig::for_testing())
            .with_bearer_refresh(storage.clone(), Arc::new(refresher))
            .build()
            .unwrap()
    }

    fn signed_in() -> TokenStorage {
        let storage = TokenStorage::in_memory();
        storage
            .store(
                Scope::Session,
                &StoredTokens::new("stale").with_refresh_token("rt-1"),
            )
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn refresh_then_single_replay() {
        let server = MockServer::start();
        let stale = server.mock(|when, then| {
            when.method(GET)
                .path("/api/users")
                .header("authorization", "Bearer stale");
            then.status(401).json_body(json!({"error": "Token expired"}));
        });
        let fresh = server.mock(|when, then| {
            when.method(GET)
                .path("/api/users")
                .header("authorization", "Bearer fresh");
            then.status(200).json_body(json!({"users": []}));
        });
        let token = server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .body("grant_type=refresh_token&refresh_token=rt-1");
            then.status(200).json_body(json!({"id_token": "fresh"}));
        });

        let storage = signed_in();
        let resp = client(&server, &storage)
            .get(&server.url("/api/users"))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(stale.calls(), 1);
        assert_eq!(token.calls(), 1);
        assert_eq!(fresh.calls(), 1);
        assert_eq!(storage.access_token().unwrap().expose(), "fresh");
    }

    #[tokio::test]
    async fn failed_refresh_clears_both_scopes() {
        let server = MockServer::start();
        let api = server.mock(|when, then| {
            when.method(GET).path("/api/users");
            then.status(401).json_body(json!({"error": "Token expired"}));
        });
        let token = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(400).json_body(json!({"error": "INVALID_REFRESH_TOKEN"}));
        });

        let storage = signed_in();
        storage
            .store(
                Scope::Persistent,
                &StoredTokens::new("also-stale").with_refresh_token("rt-1"),
            )
            .unwrap();

        let resp = client(&server, &storage)
            .get(&server.url("/api/users"))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(api.calls(), 1);
        assert_eq!(token.calls(), 1);
        assert!(!storage.is_signed_in());

        let err = resp.checked_bytes().await.unwrap_err();
        assert!(err.to_string().contains("Token expired"));
    }
}
