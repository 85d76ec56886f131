//! Domain-level constants.
//!
//! These constants define business rules and wire values shared by every layer.

// =============================================================================
// User Roles
// =============================================================================

/// Default role assigned to every registered or updated user
pub const ROLE_USER: &str = "ROLE_USER";

/// Administrator role with elevated privileges
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

/// All valid role values
pub const VALID_ROLES: &[&str] = &[ROLE_USER, ROLE_ADMIN];

/// Check if a role value is valid
pub fn is_valid_role(role: &str) -> bool {
    VALID_ROLES.contains(&role)
}

// =============================================================================
// Authentication
// =============================================================================

/// Minimum JWT secret length (security requirement)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Authorization header prefix for Bearer tokens
pub const BEARER_TOKEN_PREFIX: &str = "Bearer ";

// =============================================================================
// User-facing messages
// =============================================================================

pub const MSG_NO_USER_WITH_ID: &str = "There is no user with that ID.";
pub const MSG_NO_USER_WITH_USERNAME: &str = "There is no user with that username.";
pub const MSG_NO_USER_WITH_EMAIL: &str = "There is no user with that email address.";
pub const MSG_USER_ALREADY_EXISTS: &str = "That username or email already exists.";
pub const MSG_USERNAME_IMMUTABLE: &str = "Username cannot be changed.";
pub const MSG_PASSWORD_MISMATCH: &str = "Password is not the same.";
pub const MSG_ID_REQUIRED: &str = "Id cannot be null!";
