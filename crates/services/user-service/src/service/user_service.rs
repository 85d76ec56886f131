//! User service - Handles user-related business logic.
//!
//! Absence is never an error here: lookups return `Option` and mutations
//! return whether they took effect. The API layer decides what a missing
//! record means to the client.

use async_trait::async_trait;
use std::sync::Arc;

use common::{AppError, AppResult};
use domain::User;

use crate::repository::UserRepository;

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// List all users
    async fn find_all_users(&self) -> AppResult<Vec<User>>;

    /// Find user by ID
    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>>;

    /// Find user by username
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Find user by email
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Register a new user. Returns `None` if the username or email is taken.
    async fn add_user(&self, candidate: User) -> AppResult<Option<User>>;

    /// Persist an updated user. Returns `false` if the row could not be written.
    async fn update_user(&self, user: User) -> AppResult<bool>;

    /// Delete user by ID. Returns `false` if no such user exists.
    async fn delete_user_by_id(&self, id: i32) -> AppResult<bool>;
}

/// Concrete implementation of UserService using repository.
pub struct UserManager {
    repo: Arc<dyn UserRepository>,
}

impl UserManager {
    /// Create new user service instance with repository
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn find_all_users(&self) -> AppResult<Vec<User>> {
        self.repo.find_all().await
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        self.repo.find_by_id(id).await
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.repo.find_by_username(username).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.repo.find_by_email(email).await
    }

    async fn add_user(&self, mut candidate: User) -> AppResult<Option<User>> {
        if self.repo.find_by_username(&candidate.username).await?.is_some() {
            tracing::debug!(username = %candidate.username, "Registration rejected: username taken");
            return Ok(None);
        }
        if self.repo.find_by_email(&candidate.email).await?.is_some() {
            tracing::debug!(email = %candidate.email, "Registration rejected: email taken");
            return Ok(None);
        }

        candidate.id = None;
        candidate.normalize_role();

        match self.repo.save(candidate).await {
            Ok(saved) => {
                tracing::info!(id = ?saved.id, username = %saved.username, "User registered");
                Ok(Some(saved))
            }
            // Lost a race against a concurrent registration
            Err(AppError::Conflict(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update_user(&self, mut user: User) -> AppResult<bool> {
        user.normalize_role();
        let id = user.id;

        match self.repo.save(user).await {
            Ok(_) => {
                tracing::info!(id = ?id, "User updated");
                Ok(true)
            }
            Err(AppError::NotFound(_)) | Err(AppError::Conflict(_)) => {
                tracing::warn!(id = ?id, "User update was not persisted");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn delete_user_by_id(&self, id: i32) -> AppResult<bool> {
        let Some(user) = self.repo.find_by_id(id).await? else {
            return Ok(false);
        };

        self.repo.delete(&user).await?;
        tracing::info!(id, "User deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserRepository;
    use domain::UserRole;
    use mockall::predicate::eq;

    fn stored_user(id: i32, username: &str, email: &str) -> User {
        User {
            id: Some(id),
            username: username.to_string(),
            email: email.to_string(),
            password: "p".to_string(),
            first_name: None,
            last_name: None,
            role: UserRole::User,
        }
    }

    fn service(repo: MockUserRepository) -> UserManager {
        UserManager::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn add_user_forces_default_role() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_username().returning(|_| Ok(None));
        repo.expect_find_by_email().returning(|_| Ok(None));
        repo.expect_save()
            .withf(|user| user.role == UserRole::User && user.id.is_none())
            .times(1)
            .returning(|user| Ok(User { id: Some(7), ..user }));

        let mut candidate = User::new("alice".into(), "a@x.com".into(), "p".into());
        candidate.role = UserRole::Admin;
        candidate.id = Some(99);

        let saved = service(repo).add_user(candidate).await.unwrap().unwrap();
        assert_eq!(saved.id, Some(7));
        assert_eq!(saved.role, UserRole::User);
    }

    #[tokio::test]
    async fn add_user_rejects_taken_username_without_checking_email() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_username()
            .with(eq("alice"))
            .returning(|_| Ok(Some(stored_user(1, "alice", "other@x.com"))));
        repo.expect_find_by_email().never();
        repo.expect_save().never();

        let candidate = User::new("alice".into(), "a@x.com".into(), "p".into());
        let result = service(repo).add_user(candidate).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn add_user_rejects_taken_email() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_username().returning(|_| Ok(None));
        repo.expect_find_by_email()
            .with(eq("a@x.com"))
            .returning(|_| Ok(Some(stored_user(1, "carol", "a@x.com"))));
        repo.expect_save().never();

        let candidate = User::new("alice".into(), "a@x.com".into(), "p".into());
        let result = service(repo).add_user(candidate).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn add_user_treats_storage_conflict_as_collision() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_username().returning(|_| Ok(None));
        repo.expect_find_by_email().returning(|_| Ok(None));
        repo.expect_save()
            .returning(|_| Err(AppError::conflict("User")));

        let candidate = User::new("alice".into(), "a@x.com".into(), "p".into());
        let result = service(repo).add_user(candidate).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn add_user_propagates_infrastructure_errors() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_username()
            .returning(|_| Err(AppError::internal("connection refused")));

        let candidate = User::new("alice".into(), "a@x.com".into(), "p".into());
        let result = service(repo).add_user(candidate).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn update_user_resets_role() {
        let mut repo = MockUserRepository::new();
        repo.expect_save()
            .withf(|user| user.role == UserRole::User)
            .times(1)
            .returning(Ok);

        let mut admin = stored_user(3, "root", "root@x.com");
        admin.role = UserRole::Admin;

        assert!(service(repo).update_user(admin).await.unwrap());
    }

    #[tokio::test]
    async fn update_user_reports_missing_row() {
        let mut repo = MockUserRepository::new();
        repo.expect_save()
            .returning(|_| Err(AppError::not_found("User not found")));

        let updated = service(repo)
            .update_user(stored_user(3, "root", "root@x.com"))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn delete_user_by_id_removes_existing_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id()
            .with(eq(5))
            .returning(|id| Ok(Some(stored_user(id, "dave", "d@x.com"))));
        repo.expect_delete()
            .withf(|user| user.id == Some(5))
            .times(1)
            .returning(|_| Ok(()));

        assert!(service(repo).delete_user_by_id(5).await.unwrap());
    }

    #[tokio::test]
    async fn delete_user_by_id_reports_missing_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));
        repo.expect_delete().never();

        assert!(!service(repo).delete_user_by_id(999).await.unwrap());
    }

    #[tokio::test]
    async fn lookups_return_none_for_missing_users() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));
        repo.expect_find_by_username().returning(|_| Ok(None));
        repo.expect_find_by_email().returning(|_| Ok(None));

        let service = service(repo);
        assert!(service.find_by_id(1).await.unwrap().is_none());
        assert!(service.find_by_username("ghost").await.unwrap().is_none());
        assert!(service.find_by_email("ghost@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_all_users_returns_every_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_all().returning(|| {
            Ok(vec![
                stored_user(1, "alice", "a@x.com"),
                stored_user(2, "bob", "b@x.com"),
            ])
        });

        let users = service(repo).find_all_users().await.unwrap();
        assert_eq!(users.len(), 2);
    }
}
