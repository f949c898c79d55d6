#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Authentication for outbound backend calls.
//!
//! - [`TokenStorage`]: persistent and session token scopes
//! - [`TokenRefresher`] / [`IdentityProviderRefresher`]: refresh-token grant
//! - [`BearerRefreshLayer`]: bearer header plus single refresh-and-retry on 401
//! - [`HttpClientBuilderExt`]: wires the layer into `sitecrew_http`

pub mod builder_ext;
pub mod error;
pub mod layer;
pub mod refresher;
pub mod secret;
pub mod storage;

pub use builder_ext::HttpClientBuilderExt;
pub use error::AuthError;
pub use layer::{BearerRefreshLayer, BearerRefreshService};
pub use refresher::{IdentityProviderRefresher, NoRefresh, TokenRefresher};
pub use secret::SecretString;
pub use storage::{FileScope, MemoryScope, Scope, StoredTokens, TokenScope, TokenStorage};
