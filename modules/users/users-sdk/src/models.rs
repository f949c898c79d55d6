//! Public models for the users module.
//!
//! Field names follow the backend's camelCase JSON (`firstName`, `isActive`,
//! `photoURL`, ...).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::errors::UsersError;

/// Access role of a crew member.
///
/// Unrecognised or missing wire values read as [`Role::Unknown`] and are only
/// displayed, never sent back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Employee,
    Contractor,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Assignable roles, in display order.
    pub const ASSIGNABLE: [Role; 4] = [Role::Admin, Role::Manager, Role::Employee, Role::Contractor];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Employee => "employee",
            Self::Contractor => "contractor",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Manager => "Manager",
            Self::Employee => "Employee",
            Self::Contractor => "Contractor",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = UsersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ASSIGNABLE
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UsersError::validation("role", format!("unknown role '{s}'")))
    }
}

fn default_active() -> bool {
    true
}

/// A user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend record id
    #[serde(default)]
    pub id: String,
    /// Identity-provider uid; the store's key for item operations
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, with = "crate::timestamp")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "crate::timestamp")]
    pub last_sign_in_at: Option<OffsetDateTime>,
}

impl User {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Overwrite the fields present in `partial`. `id` and `uid` never change.
    pub fn merge(&mut self, partial: PartialUser) {
        let PartialUser {
            first_name,
            last_name,
            email,
            phone,
            role,
            is_active,
            photo_url,
            employee_id,
            created_at,
            last_sign_in_at,
        } = partial;

        if let Some(v) = first_name {
            self.first_name = v;
        }
        if let Some(v) = last_name {
            self.last_name = v;
        }
        if let Some(v) = email {
            self.email = v;
        }
        if phone.is_some() {
            self.phone = phone;
        }
        if let Some(v) = role {
            self.role = v;
        }
        if let Some(v) = is_active {
            self.is_active = v;
        }
        if photo_url.is_some() {
            self.photo_url = photo_url;
        }
        if employee_id.is_some() {
            self.employee_id = employee_id;
        }
        if created_at.is_some() {
            self.created_at = created_at;
        }
        if last_sign_in_at.is_some() {
            self.last_sign_in_at = last_sign_in_at;
        }
    }
}

/// Update response: only the fields the server chose to echo back.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(
        with = "crate::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        with = "crate::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_sign_in_at: Option<OffsetDateTime>,
}

/// Create payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    /// Initial sign-in password for the identity provider account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl NewUser {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            phone: None,
            role,
            is_active: true,
            photo_url: None,
            employee_id: None,
            password: None,
        }
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("photo_url", &self.photo_url)
            .field("employee_id", &self.employee_id)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Partial update payload; absent fields are left unchanged server-side.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
}

impl UserPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Patch toggling the active flag, used by the list's status switch.
    #[must_use]
    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }
}

/// `/health` reply; any JSON object is accepted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> User {
        serde_json::from_value(json!({
            "id": "doc-1",
            "uid": "uid-1",
            "firstName": "Ada",
            "lastName": "Byron",
            "email": "ada@sitecrew.example",
            "role": "manager",
            "photoURL": "https://cdn.sitecrew.example/ada.png",
            "createdAt": "2024-03-01T08:30:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn reads_backend_shape() {
        let user = sample();
        assert_eq!(user.full_name(), "Ada Byron");
        assert_eq!(user.role, Role::Manager);
        assert!(user.is_active, "isActive defaults to true");
        assert_eq!(
            user.photo_url.as_deref(),
            Some("https://cdn.sitecrew.example/ada.png")
        );
        assert_eq!(user.created_at.unwrap().year(), 2024);
        assert!(user.last_sign_in_at.is_none());
    }

    #[test]
    fn unknown_role_reads_as_unknown() {
        let user: User = serde_json::from_value(json!({
            "id": "d", "uid": "u", "email": "x@y.io", "role": "superintendent"
        }))
        .unwrap();
        assert_eq!(user.role, Role::Unknown);
        assert_eq!(user.role.label(), "Unknown");
    }

    #[test]
    fn missing_role_reads_as_unknown() {
        let user: User =
            serde_json::from_value(json!({"id": "d", "uid": "u", "email": "x@y.io"})).unwrap();
        assert_eq!(user.role, Role::Unknown);
    }

    #[test]
    fn odd_timestamps_do_not_reject_the_list() {
        let users: Vec<User> = serde_json::from_value(json!([
            {"uid": "u-1", "createdAt": "2024-02-01T09:00:00Z"},
            {"uid": "u-2", "lastSignInAt": "Sat, 03 Feb 2024 04:05:06 GMT"},
            {"uid": "u-3", "createdAt": {"_seconds": 1_706_933_106, "_nanoseconds": 0}},
            {"uid": "u-4", "createdAt": "yesterday", "lastSignInAt": 42}
        ]))
        .unwrap();

        assert_eq!(users.len(), 4);
        assert_eq!(users[0].created_at.unwrap().month(), time::Month::February);
        assert_eq!(users[1].last_sign_in_at.unwrap().day(), 3);
        assert_eq!(users[2].created_at.unwrap().unix_timestamp(), 1_706_933_106);
        assert!(users[3].created_at.is_none());
        assert!(users[3].last_sign_in_at.is_none());
    }

    #[test]
    fn merge_overwrites_present_fields_only() {
        let mut user = sample();
        user.merge(PartialUser {
            is_active: Some(false),
            last_name: Some("Lovelace".to_owned()),
            ..PartialUser::default()
        });

        assert_eq!(user.id, "doc-1");
        assert_eq!(user.uid, "uid-1");
        assert_eq!(user.full_name(), "Ada Lovelace");
        assert!(!user.is_active);
        assert_eq!(user.role, Role::Manager);
        assert_eq!(user.email, "ada@sitecrew.example");
    }

    #[test]
    fn partial_user_ignores_identifiers() {
        let partial: PartialUser =
            serde_json::from_value(json!({"id": "other", "uid": "other", "isActive": false}))
                .unwrap();
        let mut user = sample();
        user.merge(partial);
        assert_eq!(user.uid, "uid-1");
        assert!(!user.is_active);
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let value = serde_json::to_value(UserPatch::active(false)).unwrap();
        assert_eq!(value, json!({"isActive": false}));
        assert!(UserPatch::default().is_empty());
    }

    #[test]
    fn new_user_wire_shape_and_redacted_debug() {
        let mut new_user = NewUser::new("Sam", "Reyes", "sam@sitecrew.example", Role::Contractor);
        new_user.password = Some("hunter22".to_owned());

        let value = serde_json::to_value(&new_user).unwrap();
        assert_eq!(value["firstName"], "Sam");
        assert_eq!(value["role"], "contractor");
        assert_eq!(value["isActive"], true);
        assert!(value.get("photoURL").is_none());

        assert!(!format!("{new_user:?}").contains("hunter22"));
    }

    #[test]
    fn role_parses_ui_values() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" Contractor ".parse::<Role>().unwrap(), Role::Contractor);
        assert!("unknown".parse::<Role>().is_err());
    }

    #[test]
    fn health_accepts_any_object() {
        let health: HealthStatus =
            serde_json::from_value(json!({"status": "ok", "uptime": 12})).unwrap();
        assert_eq!(health.status.as_deref(), Some("ok"));
        assert_eq!(health.details["uptime"], 12);
    }
}
