//! Client-side validation for write payloads.
//!
//! Failures surface as [`UsersError::Validation`] before any request is sent.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::errors::UsersError;
use crate::models::{NewUser, Role, UserPatch};

pub const MIN_PASSWORD_LEN: usize = 6;

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex should not panic")
});

#[allow(clippy::expect_used)]
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9\s\-().]{7,20}$").expect("static regex should not panic")
});

/// # Errors
/// Returns `Validation` when the trimmed value is empty.
pub fn validate_name(field: &'static str, value: &str) -> Result<(), UsersError> {
    if value.trim().is_empty() {
        return Err(UsersError::validation(field, format!("{} is required", label(field))));
    }
    Ok(())
}

/// # Errors
/// Returns `Validation` for an empty or malformed address.
pub fn validate_email(value: &str) -> Result<(), UsersError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(UsersError::validation("email", "Email is required"));
    }
    if !EMAIL_RE.is_match(value) {
        return Err(UsersError::validation("email", "Enter a valid email address"));
    }
    Ok(())
}

/// Blank phone numbers are treated as absent.
///
/// # Errors
/// Returns `Validation` when a non-blank number does not look like a phone number.
pub fn validate_phone(value: &str) -> Result<(), UsersError> {
    let value = value.trim();
    if value.is_empty() || PHONE_RE.is_match(value) {
        return Ok(());
    }
    Err(UsersError::validation("phone", "Enter a valid phone number"))
}

/// # Errors
/// Returns `Validation` unless the value is an absolute http(s) URL.
pub fn validate_photo_url(value: &str) -> Result<(), UsersError> {
    match Url::parse(value.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(_) => Err(UsersError::validation(
            "photoURL",
            "Photo URL must use http or https",
        )),
        Err(_) => Err(UsersError::validation("photoURL", "Enter a valid photo URL")),
    }
}

/// # Errors
/// Returns `Validation` for [`Role::Unknown`].
pub fn validate_role(role: Role) -> Result<(), UsersError> {
    if role == Role::Unknown {
        return Err(UsersError::validation("role", "Select a role"));
    }
    Ok(())
}

/// # Errors
/// Returns `Validation` for passwords shorter than [`MIN_PASSWORD_LEN`] characters.
pub fn validate_password(value: &str) -> Result<(), UsersError> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(UsersError::validation(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

fn label(field: &str) -> &str {
    match field {
        "firstName" => "First name",
        "lastName" => "Last name",
        other => other,
    }
}

impl NewUser {
    /// Validate every field; the first failure wins.
    ///
    /// # Errors
    /// Returns `UsersError::Validation` naming the offending field.
    pub fn validate(&self) -> Result<(), UsersError> {
        validate_name("firstName", &self.first_name)?;
        validate_name("lastName", &self.last_name)?;
        validate_email(&self.email)?;
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        validate_role(self.role)?;
        if let Some(photo_url) = &self.photo_url {
            validate_photo_url(photo_url)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }
}

impl UserPatch {
    /// Validate the fields that are present.
    ///
    /// # Errors
    /// Returns `UsersError::Validation` naming the offending field.
    pub fn validate(&self) -> Result<(), UsersError> {
        if let Some(first_name) = &self.first_name {
            validate_name("firstName", first_name)?;
        }
        if let Some(last_name) = &self.last_name {
            validate_name("lastName", last_name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        if let Some(role) = self.role {
            validate_role(role)?;
        }
        if let Some(photo_url) = &self.photo_url {
            validate_photo_url(photo_url)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn valid() -> NewUser {
        NewUser::new("Dana", "Okafor", "dana@sitecrew.example", Role::Employee)
    }

    fn field_of(err: UsersError) -> &'static str {
        match err {
            UsersError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_new_user_passes() {
        let mut user = valid();
        user.phone = Some("+1 (555) 010-2000".to_owned());
        user.photo_url = Some("https://cdn.sitecrew.example/dana.jpg".to_owned());
        user.password = Some("s3cret!".to_owned());
        assert!(user.validate().is_ok());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("a@b.co").is_ok());
        for bad in ["", "   ", "plain", "a@b", "a b@c.io", "@c.io"] {
            assert!(validate_email(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn phone_rules() {
        assert!(validate_phone("").is_ok());
        assert!(validate_phone("555-0100").is_ok());
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone("12").is_err());
    }

    #[test]
    fn photo_url_requires_http_scheme() {
        assert!(validate_photo_url("http://example.com/p.png").is_ok());
        assert!(validate_photo_url("ftp://example.com/p.png").is_err());
        assert!(validate_photo_url("not a url").is_err());
    }

    #[test]
    fn first_failure_names_field() {
        let mut user = valid();
        user.first_name = "  ".to_owned();
        user.email = "broken".to_owned();
        assert_eq!(field_of(user.validate().unwrap_err()), "firstName");

        let mut user = valid();
        user.password = Some("12345".to_owned());
        assert_eq!(field_of(user.validate().unwrap_err()), "password");

        let mut user = valid();
        user.role = Role::Unknown;
        assert_eq!(field_of(user.validate().unwrap_err()), "role");
    }

    #[test]
    fn patch_checks_present_fields_only() {
        assert!(UserPatch::default().validate().is_ok());
        assert!(UserPatch::active(false).validate().is_ok());

        let patch = UserPatch {
            email: Some("nope".to_owned()),
            ..UserPatch::default()
        };
        assert_eq!(field_of(patch.validate().unwrap_err()), "email");
    }
}
