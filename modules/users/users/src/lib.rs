#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Users list management: REST adapter, list state store and derived views.
//!
//! ```ignore
//! let module = UsersModule::from_config(&config)?;
//! let store = module.store();
//! store.fetch(false).await;
//! let rows = filter_and_sort(&store.users(), &UserQuery::default());
//! ```

pub mod api;
pub mod module;
pub mod stats;
pub mod store;
pub mod view;

pub use api::{HttpUsersApi, UsersApi};
pub use module::UsersModule;
pub use stats::UserStats;
pub use store::{FetchOutcome, StoreConfig, StoreSnapshot, UserListStore};
pub use view::{RoleFilter, SortKey, SortOrder, StatusFilter, UserQuery, filter_and_sort};

pub use users_sdk::{
    HealthStatus, NewUser, PartialUser, Role, User, UserPatch, UsersError,
};
