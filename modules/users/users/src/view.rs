//! Derived list view: search, role/status filters and sorting.
//!
//! [`filter_and_sort`] is pure; it copies the matching users and never
//! reorders the input slice.

use std::cmp::Ordering;
use std::str::FromStr;

use users_sdk::{Role, User, UsersError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleFilter {
    #[default]
    All,
    Only(Role),
}

impl RoleFilter {
    fn matches(self, user: &User) -> bool {
        match self {
            Self::All => true,
            Self::Only(role) => user.role == role,
        }
    }
}

impl FromStr for RoleFilter {
    type Err = UsersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<Role>().map(Self::Only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    fn matches(self, user: &User) -> bool {
        match self {
            Self::All => true,
            Self::Active => user.is_active,
            Self::Inactive => !user.is_active,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UsersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(UsersError::validation(
                "status",
                format!("unknown status filter '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Email,
    Role,
    /// Active users first in ascending order
    Status,
    /// Missing timestamps first in ascending order
    CreatedAt,
    LastSignIn,
}

impl FromStr for SortKey {
    type Err = UsersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "email" => Ok(Self::Email),
            "role" => Ok(Self::Role),
            "status" => Ok(Self::Status),
            "createdat" | "created_at" => Ok(Self::CreatedAt),
            "lastsignin" | "last_sign_in" | "lastsigninat" => Ok(Self::LastSignIn),
            other => Err(UsersError::validation(
                "sortBy",
                format!("unknown sort key '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = UsersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(UsersError::validation(
                "order",
                format!("unknown sort order '{other}'"),
            )),
        }
    }
}

/// Current state of the list controls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserQuery {
    pub search: String,
    pub role: RoleFilter,
    pub status: StatusFilter,
    pub sort_by: SortKey,
    pub order: SortOrder,
}

impl UserQuery {
    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = term.into();
        self
    }

    #[must_use]
    pub fn role(mut self, role: RoleFilter) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn sort(mut self, sort_by: SortKey, order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.order = order;
        self
    }
}

fn matches_search(user: &User, needle: &str) -> bool {
    [
        Some(user.first_name.as_str()),
        Some(user.last_name.as_str()),
        Some(user.email.as_str()),
        user.employee_id.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

fn compare(a: &User, b: &User, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.full_name().to_lowercase().cmp(&b.full_name().to_lowercase()),
        SortKey::Email => a.email.to_lowercase().cmp(&b.email.to_lowercase()),
        SortKey::Role => a.role.as_str().cmp(b.role.as_str()),
        SortKey::Status => b.is_active.cmp(&a.is_active),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::LastSignIn => a.last_sign_in_at.cmp(&b.last_sign_in_at),
    }
}

/// Apply the query to `users` and return the display list.
///
/// Filters are conjunctive. The sort is stable, so ties keep input order in
/// both directions.
#[must_use]
pub fn filter_and_sort(users: &[User], query: &UserQuery) -> Vec<User> {
    let needle = query.search.trim().to_lowercase();

    let mut view: Vec<User> = users
        .iter()
        .filter(|u| needle.is_empty() || matches_search(u, &needle))
        .filter(|u| query.role.matches(u))
        .filter(|u| query.status.matches(u))
        .cloned()
        .collect();

    view.sort_by(|a, b| {
        let ord = compare(a, b, query.sort_by);
        match query.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    view
}
