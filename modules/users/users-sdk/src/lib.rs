#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Users SDK
//!
//! Models, client-side validation and the error type shared by everything
//! that talks to the users resource.

pub mod errors;
pub mod models;
pub mod timestamp;
pub mod validation;

pub use errors::UsersError;
pub use models::{HealthStatus, NewUser, PartialUser, Role, User, UserPatch};
