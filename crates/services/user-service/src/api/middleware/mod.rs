//! Request middleware: caller identity and route access control.

mod access;
mod identity;

pub use access::{authorize_middleware, AccessPolicy, Requirement};
pub use identity::{identity_middleware, Claims, CurrentUser, TokenVerifier};
