//! Caller identity - bearer token verification.
//!
//! Tokens are issued by an external authentication component. This service
//! only verifies them and exposes the caller as [`CurrentUser`].

use axum::{
    async_trait,
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use common::{AppError, AppResult, JwtConfig};
use domain::{is_valid_role, UserRole, BEARER_TOKEN_PREFIX};

use crate::api::AppState;

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the caller
    pub sub: String,
    /// Granted role names, e.g. `ROLE_ADMIN`
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Verifies bearer tokens against the shared secret.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            key: DecodingKey::from_secret(config.secret_bytes()),
            validation: Validation::default(),
        }
    }

    /// Verify a token and extract its claims
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(token_data.claims)
    }
}

/// Authenticated caller for the current request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub username: String,
    pub roles: Vec<UserRole>,
}

impl CurrentUser {
    /// Check if the caller was granted `role`.
    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }

    /// Check if the caller holds the admin role.
    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }
}

/// Unrecognised role names are dropped.
impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            roles: claims
                .roles
                .iter()
                .filter(|role| is_valid_role(role))
                .map(|role| UserRole::from(role.as_str()))
                .collect(),
        }
    }
}

/// Handlers taking a `CurrentUser` reject anonymous requests with 401.
#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Identity middleware.
///
/// A valid bearer token stores the caller as `CurrentUser` in the request
/// extensions. Requests without an `Authorization` header continue
/// anonymously. A bad header is rejected with 401 on routes the access
/// policy guards and ignored on public routes.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return Ok(next.run(request).await);
    };

    let verified = header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix(BEARER_TOKEN_PREFIX))
        .ok_or(AppError::Unauthorized)
        .and_then(|token| state.verifier.verify(token));

    match verified {
        Ok(claims) => {
            let current_user = CurrentUser::from(claims);
            tracing::debug!(username = %current_user.username, "Caller authenticated");
            request.extensions_mut().insert(current_user);
        }
        Err(err) if is_guarded(&state, &request) => return Err(err),
        Err(err) => {
            tracing::debug!(error = %err, "Ignoring invalid credentials on public route");
        }
    }

    Ok(next.run(request).await)
}

fn is_guarded(state: &AppState, request: &Request) -> bool {
    request
        .extensions()
        .get::<MatchedPath>()
        .map_or(true, |route| {
            state
                .access_policy
                .requirement(request.method(), route.as_str())
                .is_some()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-key-for-testing-only-32chars";

    fn config() -> JwtConfig {
        JwtConfig {
            secret: SECRET.to_string(),
        }
    }

    fn token(sub: &str, roles: &[&str], expires_in: Duration) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn verifies_token_and_maps_roles() {
        let verifier = TokenVerifier::new(&config());
        let claims = verifier
            .verify(&token("alice", &["ROLE_USER", "ROLE_ADMIN"], Duration::hours(1)))
            .unwrap();

        let user = CurrentUser::from(claims);
        assert_eq!(user.username, "alice");
        assert!(user.is_admin());
        assert!(user.has_role(UserRole::User));
    }

    #[test]
    fn unknown_roles_grant_nothing() {
        let verifier = TokenVerifier::new(&config());
        let claims = verifier
            .verify(&token("mallory", &["ROLE_SUPERUSER"], Duration::hours(1)))
            .unwrap();

        let user = CurrentUser::from(claims);
        assert!(user.roles.is_empty());
        assert!(!user.is_admin());
    }

    #[test]
    fn rejects_expired_token() {
        let verifier = TokenVerifier::new(&config());
        let result = verifier.verify(&token("alice", &["ROLE_USER"], Duration::hours(-2)));
        assert!(matches!(result, Err(AppError::Jwt(_))));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let verifier = TokenVerifier::new(&JwtConfig {
            secret: "a-completely-different-secret-of-32+".to_string(),
        });
        let result = verifier.verify(&token("alice", &["ROLE_USER"], Duration::hours(1)));
        assert!(result.is_err());
    }
}
