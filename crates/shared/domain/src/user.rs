//! User domain entity and related types.

use serde::{Deserialize, Serialize};

use crate::constants::{
    MSG_ID_REQUIRED, MSG_PASSWORD_MISMATCH, MSG_USERNAME_IMMUTABLE, ROLE_ADMIN, ROLE_USER,
};
use crate::error::{DomainError, DomainResult};

/// User roles enumeration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum UserRole {
    #[default]
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl UserRole {
    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Wire/storage representation of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => ROLE_ADMIN,
            UserRole::User => ROLE_USER,
        }
    }
}

/// Unknown values degrade to the least privileged role.
impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        match s {
            ROLE_ADMIN => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

impl From<String> for UserRole {
    fn from(s: String) -> Self {
        UserRole::from(s.as_str())
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User domain entity.
///
/// `id` is `None` until the record has been persisted; storage always hands
/// back records with an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Option<i32>,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
}

impl User {
    /// Create a new, not yet persisted user with the default role
    pub fn new(username: String, email: String, password: String) -> Self {
        Self {
            id: None,
            username,
            email,
            password,
            first_name: None,
            last_name: None,
            role: UserRole::User,
        }
    }

    /// Set first and last name
    pub fn with_names(mut self, first_name: Option<String>, last_name: Option<String>) -> Self {
        self.first_name = first_name;
        self.last_name = last_name;
        self
    }

    /// Check if user has admin role
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether the record has been persisted
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Reset the role to the default. Applied on every create and update.
    pub fn normalize_role(&mut self) {
        self.role = UserRole::User;
    }
}

/// Profile changes submitted by an authenticated caller.
///
/// `None` means "not specified" and keeps the caller's current value.
/// An explicit `Some("")` is kept for the name fields; a blank email is
/// treated as unspecified.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub id: Option<i32>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    /// Merge this update onto the caller's stored record.
    ///
    /// The username must match the caller and the password must match the
    /// caller's stored password (re-authentication, not a password change).
    /// The returned user targets the `id` named in the update, which is not
    /// required to be the caller's own id.
    pub fn merge_onto(self, caller: &User) -> DomainResult<User> {
        if self.username.as_deref() != Some(caller.username.as_str()) {
            return Err(DomainError::not_found(MSG_USERNAME_IMMUTABLE));
        }
        if self.password.as_deref() != Some(caller.password.as_str()) {
            return Err(DomainError::not_found(MSG_PASSWORD_MISMATCH));
        }

        let email = self
            .email
            .filter(|email| !email.trim().is_empty())
            .unwrap_or_else(|| caller.email.clone());
        let first_name = self.first_name.or_else(|| caller.first_name.clone());
        let last_name = self.last_name.or_else(|| caller.last_name.clone());

        let id = self.id.ok_or_else(|| DomainError::not_found(MSG_ID_REQUIRED))?;

        Ok(User {
            id: Some(id),
            username: caller.username.clone(),
            email,
            password: caller.password.clone(),
            first_name,
            last_name,
            role: UserRole::User,
        })
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// Unique user identifier
    pub id: Option<i32>,
    /// Login name
    pub username: String,
    /// User email address
    pub email: String,
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
    /// User role
    pub role: UserRole,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
        }
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse::from(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: Some(1),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password: "p".to_string(),
            first_name: Some("Alice".to_string()),
            last_name: Some("Liddell".to_string()),
            role: UserRole::Admin,
        }
    }

    fn update_for(caller: &User) -> ProfileUpdate {
        ProfileUpdate {
            id: caller.id,
            username: Some(caller.username.clone()),
            password: Some(caller.password.clone()),
            ..Default::default()
        }
    }

    #[test]
    fn role_parses_wire_values() {
        assert_eq!(UserRole::from("ROLE_ADMIN"), UserRole::Admin);
        assert_eq!(UserRole::from("ROLE_USER"), UserRole::User);
        assert_eq!(UserRole::from("superuser"), UserRole::User);
        assert_eq!(UserRole::Admin.to_string(), "ROLE_ADMIN");
    }

    #[test]
    fn role_serializes_as_wire_value() {
        let json = serde_json::to_string(&UserRole::Admin).unwrap();
        assert_eq!(json, "\"ROLE_ADMIN\"");
        let role: UserRole = serde_json::from_str("\"ROLE_USER\"").unwrap();
        assert_eq!(role, UserRole::User);
    }

    #[test]
    fn merge_fills_unspecified_fields_from_caller() {
        let caller = alice();
        let merged = update_for(&caller).merge_onto(&caller).unwrap();

        assert_eq!(merged.email, caller.email);
        assert_eq!(merged.first_name, caller.first_name);
        assert_eq!(merged.last_name, caller.last_name);
        assert_eq!(merged.id, Some(1));
    }

    #[test]
    fn merge_keeps_explicit_values() {
        let caller = alice();
        let update = ProfileUpdate {
            email: Some("new@x.com".to_string()),
            first_name: Some(String::new()),
            ..update_for(&caller)
        };

        let merged = update.merge_onto(&caller).unwrap();
        assert_eq!(merged.email, "new@x.com");
        assert_eq!(merged.first_name.as_deref(), Some(""));
        assert_eq!(merged.last_name, caller.last_name);
    }

    #[test]
    fn merge_fills_blank_email_from_caller() {
        let caller = alice();
        for blank in ["", "   "] {
            let update = ProfileUpdate {
                email: Some(blank.to_string()),
                ..update_for(&caller)
            };

            let merged = update.merge_onto(&caller).unwrap();
            assert_eq!(merged.email, caller.email);
        }
    }

    #[test]
    fn merge_resets_role() {
        let caller = alice();
        let merged = update_for(&caller).merge_onto(&caller).unwrap();
        assert_eq!(merged.role, UserRole::User);
    }

    #[test]
    fn merge_rejects_username_change() {
        let caller = alice();
        let update = ProfileUpdate {
            username: Some("bob".to_string()),
            ..update_for(&caller)
        };

        let err = update.merge_onto(&caller).unwrap_err();
        assert_eq!(err, DomainError::not_found("Username cannot be changed."));
    }

    #[test]
    fn merge_rejects_wrong_password() {
        let caller = alice();
        let update = ProfileUpdate {
            password: Some("wrong".to_string()),
            ..update_for(&caller)
        };

        let err = update.merge_onto(&caller).unwrap_err();
        assert_eq!(err, DomainError::not_found("Password is not the same."));
    }

    #[test]
    fn merge_requires_id() {
        let caller = alice();
        let update = ProfileUpdate {
            id: None,
            ..update_for(&caller)
        };

        let err = update.merge_onto(&caller).unwrap_err();
        assert_eq!(err, DomainError::not_found("Id cannot be null!"));
    }

    #[test]
    fn update_deserializes_camel_case() {
        let update: ProfileUpdate = serde_json::from_str(
            r#"{"id":3,"username":"alice","password":"p","firstName":"A"}"#,
        )
        .unwrap();
        assert_eq!(update.id, Some(3));
        assert_eq!(update.first_name.as_deref(), Some("A"));
        assert!(update.last_name.is_none());
    }
}
