use std::sync::Arc;

use anyhow::Context;
use sitecrew_auth::{
    HttpClientBuilderExt, IdentityProviderRefresher, NoRefresh, SecretString, TokenRefresher,
    TokenStorage,
};
use sitecrew_bootstrap::AppConfig;
use sitecrew_http::HttpClientBuilder;
use users_sdk::{HealthStatus, UsersError};

use crate::api::{HttpUsersApi, UsersApi};
use crate::store::{StoreConfig, UserListStore};

/// Composition root for the users screen.
///
/// Wires token storage, the refresh-capable HTTP client, the REST adapter and
/// the list store from one [`AppConfig`].
#[derive(Clone)]
pub struct UsersModule {
    token_storage: TokenStorage,
    api: Arc<dyn UsersApi>,
    store: Arc<UserListStore>,
}

impl std::fmt::Debug for UsersModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsersModule")
            .field("token_storage", &self.token_storage)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl UsersModule {
    /// Build the module, with the persistent token scope taken from
    /// `auth.token_file` (in memory when unset).
    ///
    /// # Errors
    /// Fails if a configured URL is unusable or the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let token_storage = match &config.auth.token_file {
            Some(path) => TokenStorage::with_token_file(path.clone()),
            None => TokenStorage::in_memory(),
        };
        Self::with_token_storage(config, token_storage)
    }

    /// Build the module around an existing token storage, e.g. one the
    /// sign-in flow has already populated.
    ///
    /// # Errors
    /// Fails if a configured URL is unusable or the HTTP client cannot be built.
    pub fn with_token_storage(
        config: &AppConfig,
        token_storage: TokenStorage,
    ) -> anyhow::Result<Self> {
        let base_url = config.base_url().context("resolving users API base URL")?;

        let refresher: Arc<dyn TokenRefresher> =
            match config.token_endpoint().context("resolving token endpoint")? {
                Some(endpoint) => {
                    let api_key = config.auth.api_key.as_deref().map(SecretString::from);
                    Arc::new(
                        IdentityProviderRefresher::new(
                            endpoint,
                            api_key.as_ref(),
                            config.token_client_config(),
                        )
                        .context("building token refresh client")?,
                    )
                }
                None => {
                    tracing::warn!("no token endpoint configured; expired sessions sign out");
                    Arc::new(NoRefresh)
                }
            };

        let client = HttpClientBuilder::with_config(config.http_client_config())
            .with_bearer_refresh(token_storage.clone(), refresher)
            .build()
            .context("building users HTTP client")?;

        tracing::info!(
            environment = ?config.environment,
            base_url = %base_url,
            "users module configured"
        );

        let api: Arc<dyn UsersApi> = Arc::new(HttpUsersApi::new(client, base_url));
        Ok(Self::from_parts(
            token_storage,
            api,
            StoreConfig::from(&config.users),
        ))
    }

    /// Assemble from an already-built API, bypassing HTTP setup.
    #[must_use]
    pub fn from_parts(
        token_storage: TokenStorage,
        api: Arc<dyn UsersApi>,
        store_config: StoreConfig,
    ) -> Self {
        let store = Arc::new(UserListStore::new(Arc::clone(&api), store_config));
        Self {
            token_storage,
            api,
            store,
        }
    }

    #[must_use]
    pub fn store(&self) -> Arc<UserListStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn api(&self) -> Arc<dyn UsersApi> {
        Arc::clone(&self.api)
    }

    #[must_use]
    pub fn token_storage(&self) -> &TokenStorage {
        &self.token_storage
    }

    /// Backend liveness probe.
    ///
    /// # Errors
    /// Returns the classified API failure.
    pub async fn health(&self) -> Result<HealthStatus, UsersError> {
        self.api.health().await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use sitecrew_bootstrap::Environment;

    #[tokio::test]
    async fn builds_with_defaults() {
        let module = UsersModule::from_config(&AppConfig::default()).unwrap();
        assert!(!module.token_storage().is_signed_in());
        assert!(module.store().users().is_empty());
        assert!(module.store().config().reject_concurrent_mutations);
    }

    #[tokio::test]
    async fn rejects_unusable_base_url() {
        let mut config = AppConfig::default();
        config.api.base_url = Some("not a url".to_owned());
        let err = UsersModule::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("base URL"), "{err:#}");
    }

    #[tokio::test]
    async fn production_uses_production_base_url() {
        let config = AppConfig {
            environment: Environment::Production,
            ..AppConfig::default()
        };
        assert!(UsersModule::from_config(&config).is_ok());
    }
}
