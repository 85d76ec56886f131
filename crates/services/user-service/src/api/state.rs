//! Application state for dependency injection.

use std::sync::Arc;

use crate::api::middleware::{AccessPolicy, TokenVerifier};
use crate::config::UserServiceConfig;
use crate::infra::Database;
use crate::service::UserService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserService>,
    pub verifier: Arc<TokenVerifier>,
    pub access_policy: Arc<AccessPolicy>,
    pub strict_update_ownership: bool,
    /// Checked by `/health`; absent when running over a non-database store
    pub database: Option<Arc<Database>>,
}

impl AppState {
    /// Create new app state with the standard access policy.
    pub fn new(user_service: Arc<dyn UserService>, config: &UserServiceConfig) -> Self {
        Self {
            user_service,
            verifier: Arc::new(TokenVerifier::new(&config.jwt)),
            access_policy: Arc::new(AccessPolicy::standard()),
            strict_update_ownership: config.strict_update_ownership,
            database: None,
        }
    }

    /// Attach the database used for health checks.
    pub fn with_database(mut self, database: Arc<Database>) -> Self {
        self.database = Some(database);
        self
    }

    /// Replace the access policy.
    pub fn with_access_policy(mut self, policy: AccessPolicy) -> Self {
        self.access_policy = Arc::new(policy);
        self
    }
}
