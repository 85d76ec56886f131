//! Route access policy.
//!
//! Role requirements are declared per `(method, route)` in an
//! [`AccessPolicy`] held by the application state and enforced by
//! [`authorize_middleware`] before any handler runs.

use std::collections::HashMap;

use axum::{
    extract::{MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use common::{AppError, AppResult};
use domain::UserRole;

use super::CurrentUser;
use crate::api::AppState;

/// What a caller needs to reach a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any verified caller
    Authenticated,
    /// A verified caller holding this role
    Role(UserRole),
}

/// Declared access rules keyed by method and route template.
///
/// Routes without a rule are public.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: HashMap<(Method, String), Requirement>,
}

impl AccessPolicy {
    /// Empty policy: every route is public.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for the user routes: profile updates need a caller, deletion
    /// needs an admin.
    pub fn standard() -> Self {
        Self::new()
            .require(Method::PUT, "/users", Requirement::Authenticated)
            .require(
                Method::DELETE,
                "/users/id/:id",
                Requirement::Role(UserRole::Admin),
            )
    }

    /// Add or replace the rule for `method` on `route`.
    pub fn require(mut self, method: Method, route: impl Into<String>, rule: Requirement) -> Self {
        self.rules.insert((method, route.into()), rule);
        self
    }

    /// Look up the rule for a matched route.
    pub fn requirement(&self, method: &Method, route: &str) -> Option<Requirement> {
        self.rules.get(&(method.clone(), route.to_string())).copied()
    }

    /// Decide whether `caller` may reach `route`.
    pub fn check(
        &self,
        method: &Method,
        route: &str,
        caller: Option<&CurrentUser>,
    ) -> AppResult<()> {
        let Some(rule) = self.requirement(method, route) else {
            return Ok(());
        };

        let caller = caller.ok_or(AppError::Unauthorized)?;
        match rule {
            Requirement::Authenticated => Ok(()),
            Requirement::Role(role) if caller.has_role(role) => Ok(()),
            Requirement::Role(role) => {
                tracing::warn!(
                    username = %caller.username,
                    required = %role,
                    %method,
                    route,
                    "Access denied"
                );
                Err(AppError::Forbidden)
            }
        }
    }
}

/// Enforce the application's access policy on the matched route.
pub async fn authorize_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(route) = request.extensions().get::<MatchedPath>() {
        state.access_policy.check(
            request.method(),
            route.as_str(),
            request.extensions().get::<CurrentUser>(),
        )?;
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(roles: &[UserRole]) -> CurrentUser {
        CurrentUser {
            username: "alice".to_string(),
            roles: roles.to_vec(),
        }
    }

    #[test]
    fn unlisted_routes_are_public() {
        let policy = AccessPolicy::standard();
        assert!(policy.check(&Method::GET, "/users", None).is_ok());
        assert!(policy.check(&Method::POST, "/users", None).is_ok());
    }

    #[test]
    fn delete_requires_admin() {
        let policy = AccessPolicy::standard();

        let result = policy.check(&Method::DELETE, "/users/id/:id", Some(&caller(&[UserRole::User])));
        assert!(matches!(result, Err(AppError::Forbidden)));

        let result = policy.check(&Method::DELETE, "/users/id/:id", Some(&caller(&[UserRole::Admin])));
        assert!(result.is_ok());
    }

    #[test]
    fn anonymous_caller_is_unauthorized() {
        let policy = AccessPolicy::standard();
        let result = policy.check(&Method::DELETE, "/users/id/:id", None);
        assert!(matches!(result, Err(AppError::Unauthorized)));

        let result = policy.check(&Method::PUT, "/users", None);
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn rules_can_be_overridden() {
        let policy = AccessPolicy::standard().require(
            Method::GET,
            "/users",
            Requirement::Role(UserRole::Admin),
        );

        assert_eq!(
            policy.requirement(&Method::GET, "/users"),
            Some(Requirement::Role(UserRole::Admin))
        );
        assert!(policy
            .check(&Method::GET, "/users", Some(&caller(&[UserRole::User])))
            .is_err());
    }
}
