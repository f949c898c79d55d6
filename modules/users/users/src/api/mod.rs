//! Users resource API.

use async_trait::async_trait;
use users_sdk::{HealthStatus, NewUser, PartialUser, User, UserPatch, UsersError};

pub mod dto;
pub mod error_mapping;
pub mod http_client;

pub use http_client::HttpUsersApi;

/// Remote operations on the users resource.
///
/// `id` is passed through to the `{id}` path segment unchanged; the store
/// passes `uid` for mutations.
#[async_trait]
pub trait UsersApi: Send + Sync {
    /// `GET /api/users`
    async fn get_all(&self) -> Result<Vec<User>, UsersError>;

    /// `GET /api/users/{id}`
    async fn get_by_id(&self, id: &str) -> Result<User, UsersError>;

    /// `POST /api/users`
    async fn create(&self, user: &NewUser) -> Result<User, UsersError>;

    /// `PUT /api/users/{id}`
    async fn update(&self, id: &str, patch: &UserPatch) -> Result<PartialUser, UsersError>;

    /// `DELETE /api/users/{id}`
    async fn delete(&self, id: &str) -> Result<(), UsersError>;

    /// `PATCH /api/users/{id}/photo`
    async fn update_photo(&self, id: &str, photo_url: &str) -> Result<PartialUser, UsersError>;

    /// `GET /health`
    async fn health(&self) -> Result<HealthStatus, UsersError>;
}
