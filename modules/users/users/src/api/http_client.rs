use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sitecrew_http::{HttpClient, HttpError, HttpResponse};
use tracing::instrument;
use url::Url;
use users_sdk::{HealthStatus, NewUser, PartialUser, User, UserPatch, UsersError};

use super::UsersApi;
use super::dto::{PhotoPatch, UserEnvelope, UsersEnvelope};
use super::error_mapping::map_http_error;

/// `UsersApi` over the backend's REST endpoints.
///
/// `HttpClient` is `Clone + Send + Sync`, so the adapter is shared as-is.
#[derive(Clone)]
pub struct HttpUsersApi {
    client: HttpClient,
    base: Url,
}

impl HttpUsersApi {
    #[must_use]
    pub fn new(client: HttpClient, base: Url) -> Self {
        Self { client, base }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, UsersError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| UsersError::Network {
                message: format!("invalid API base URL '{}'", self.base),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn users_url(&self) -> Result<Url, UsersError> {
        self.endpoint(&["api", "users"])
    }

    fn user_url(&self, id: &str) -> Result<Url, UsersError> {
        self.endpoint(&["api", "users", id])
    }
}

impl std::fmt::Debug for HttpUsersApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUsersApi")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

async fn read_json<T: DeserializeOwned>(
    sent: Result<HttpResponse, HttpError>,
    id: Option<&str>,
) -> Result<T, UsersError> {
    let response = sent.map_err(|e| map_http_error(e, id))?;
    response.json::<T>().await.map_err(|e| map_http_error(e, id))
}

fn log_failure<T>(op: &'static str, result: Result<T, UsersError>) -> Result<T, UsersError> {
    if let Err(err) = &result {
        tracing::error!(op, error = %err, "users API call failed");
    }
    result
}

impl HttpUsersApi {
    async fn fetch_all(&self) -> Result<Vec<User>, UsersError> {
        let url = self.users_url()?;
        let envelope: UsersEnvelope =
            read_json(self.client.get(url.as_str()).send().await, None).await?;
        Ok(envelope.users)
    }

    async fn fetch_one(&self, id: &str) -> Result<User, UsersError> {
        let url = self.user_url(id)?;
        let envelope: UserEnvelope<User> =
            read_json(self.client.get(url.as_str()).send().await, Some(id)).await?;
        Ok(envelope.user)
    }

    async fn post_user(&self, user: &NewUser) -> Result<User, UsersError> {
        let url = self.users_url()?;
        let request = self
            .client
            .post(url.as_str())
            .json(user)
            .map_err(|e| map_http_error(e, None))?;
        let envelope: UserEnvelope<User> = read_json(request.send().await, None).await?;
        Ok(envelope.user)
    }

    async fn put_user(&self, id: &str, patch: &UserPatch) -> Result<PartialUser, UsersError> {
        let url = self.user_url(id)?;
        let request = self
            .client
            .put(url.as_str())
            .json(patch)
            .map_err(|e| map_http_error(e, Some(id)))?;
        let envelope: UserEnvelope<PartialUser> = read_json(request.send().await, Some(id)).await?;
        Ok(envelope.user)
    }

    async fn delete_user(&self, id: &str) -> Result<(), UsersError> {
        let url = self.user_url(id)?;
        let response = self
            .client
            .delete(url.as_str())
            .send()
            .await
            .map_err(|e| map_http_error(e, Some(id)))?;
        // Success body is ignored; reading it keeps the error preview on failure
        response
            .checked_bytes()
            .await
            .map_err(|e| map_http_error(e, Some(id)))?;
        Ok(())
    }

    async fn patch_photo(&self, id: &str, photo_url: &str) -> Result<PartialUser, UsersError> {
        let url = self.endpoint(&["api", "users", id, "photo"])?;
        let request = self
            .client
            .patch(url.as_str())
            .json(&PhotoPatch { photo_url })
            .map_err(|e| map_http_error(e, Some(id)))?;
        let envelope: UserEnvelope<PartialUser> = read_json(request.send().await, Some(id)).await?;
        Ok(envelope.user)
    }

    async fn fetch_health(&self) -> Result<HealthStatus, UsersError> {
        let url = self.endpoint(&["health"])?;
        read_json(self.client.get(url.as_str()).send().await, None).await
    }
}

#[async_trait]
impl UsersApi for HttpUsersApi {
    #[instrument(skip_all, fields(base = %self.base))]
    async fn get_all(&self) -> Result<Vec<User>, UsersError> {
        log_failure("get_all", self.fetch_all().await)
    }

    #[instrument(skip_all, fields(base = %self.base, user_id = %id))]
    async fn get_by_id(&self, id: &str) -> Result<User, UsersError> {
        log_failure("get_by_id", self.fetch_one(id).await)
    }

    #[instrument(skip_all, fields(base = %self.base))]
    async fn create(&self, user: &NewUser) -> Result<User, UsersError> {
        log_failure("create", self.post_user(user).await)
    }

    #[instrument(skip_all, fields(base = %self.base, user_id = %id))]
    async fn update(&self, id: &str, patch: &UserPatch) -> Result<PartialUser, UsersError> {
        log_failure("update", self.put_user(id, patch).await)
    }

    #[instrument(skip_all, fields(base = %self.base, user_id = %id))]
    async fn delete(&self, id: &str) -> Result<(), UsersError> {
        log_failure("delete", self.delete_user(id).await)
    }

    #[instrument(skip_all, fields(base = %self.base, user_id = %id))]
    async fn update_photo(&self, id: &str, photo_url: &str) -> Result<PartialUser, UsersError> {
        log_failure("update_photo", self.patch_photo(id, photo_url).await)
    }

    #[instrument(skip_all, fields(base = %self.base))]
    async fn health(&self) -> Result<HealthStatus, UsersError> {
        log_failure("health", self.fetch_health().await)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use sitecrew_http::{HttpClientBuilder, HttpClientConfig};

    #[tokio::test]
    async fn item_paths_are_percent_encoded() {
        let client = HttpClientBuilder::with_config(HttpClientConfig::for_testing())
            .build()
            .unwrap();
        let api = HttpUsersApi::new(client, Url::parse("http://localhost:5000/").unwrap());

        let url = api.user_url("a/b c").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/users/a%2Fb%20c");

        let url = api.endpoint(&["health"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/health");
    }

    #[tokio::test]
    async fn base_path_prefix_is_kept() {
        let client = HttpClientBuilder::with_config(HttpClientConfig::for_testing())
            .build()
            .unwrap();
        let api = HttpUsersApi::new(client, Url::parse("http://gw.local/v2/").unwrap());
        assert_eq!(
            api.users_url().unwrap().as_str(),
            "http://gw.local/v2/api/users"
        );
    }
}
