//! User repository - the storage port and its SeaORM implementation.

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, IsolationLevel, QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use common::{AppError, AppResult};
use domain::{User, MSG_ID_REQUIRED};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
///
/// Lookups return `Ok(None)` for a missing record and never fail because of
/// it. Writes are atomic per call.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// List every user as one consistent snapshot
    async fn find_all(&self) -> AppResult<Vec<User>>;

    /// Find user by ID
    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>>;

    /// Find user by username
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Find user by email address
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Find user by username and stored password
    async fn find_by_username_and_password(
        &self,
        username: &str,
        password: &str,
    ) -> AppResult<Option<User>>;

    /// Insert the user when it has no id, otherwise overwrite the row with
    /// that id. Returns the persisted record.
    ///
    /// A new record colliding on username or email fails with
    /// `AppError::Conflict`; updating a missing row fails with
    /// `AppError::NotFound`.
    async fn save(&self, user: User) -> AppResult<User>;

    /// Remove the user's row
    async fn delete(&self, user: &User) -> AppResult<()>;
}

/// Concrete implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn begin_read(&self, isolation: IsolationLevel) -> AppResult<DatabaseTransaction> {
        self.db
            .begin_with_config(Some(isolation), Some(AccessMode::ReadOnly))
            .await
            .map_err(AppError::from)
    }

    async fn begin_write(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin_with_config(Some(IsolationLevel::ReadCommitted), Some(AccessMode::ReadWrite))
            .await
            .map_err(AppError::from)
    }

    async fn find_one_where<C>(&self, column: C, value: &str) -> AppResult<Option<User>>
    where
        C: ColumnTrait,
    {
        let txn = self.begin_read(IsolationLevel::ReadCommitted).await?;
        let result = UserEntity::find()
            .filter(column.eq(value))
            .one(&txn)
            .await
            .map_err(AppError::from)?;
        txn.commit().await.map_err(AppError::from)?;

        Ok(result.map(User::from))
    }
}

/// Map write failures onto the repository contract.
fn write_error(err: DbErr) -> AppError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        tracing::debug!("Unique constraint violated: {}", detail);
        return AppError::conflict("User");
    }

    match err {
        DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => {
            AppError::not_found("User not found")
        }
        other => AppError::from(other),
    }
}

async fn rollback(txn: DatabaseTransaction) {
    if let Err(rollback_err) = txn.rollback().await {
        tracing::error!("Transaction rollback failed: {}", rollback_err);
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_all(&self) -> AppResult<Vec<User>> {
        let txn = self.begin_read(IsolationLevel::Serializable).await?;
        let models = UserEntity::find()
            .order_by_asc(user::Column::Id)
            .all(&txn)
            .await
            .map_err(AppError::from)?;
        txn.commit().await.map_err(AppError::from)?;

        Ok(models.into_iter().map(User::from).collect())
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let txn = self.begin_read(IsolationLevel::ReadCommitted).await?;
        let result = UserEntity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(AppError::from)?;
        txn.commit().await.map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.find_one_where(user::Column::Username, username).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.find_one_where(user::Column::Email, email).await
    }

    async fn find_by_username_and_password(
        &self,
        username: &str,
        password: &str,
    ) -> AppResult<Option<User>> {
        let txn = self.begin_read(IsolationLevel::ReadCommitted).await?;
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .filter(user::Column::Password.eq(password))
            .one(&txn)
            .await
            .map_err(AppError::from)?;
        txn.commit().await.map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn save(&self, user: User) -> AppResult<User> {
        let is_new = !user.is_persisted();
        let active: ActiveModel = user.into();

        let txn = self.begin_write().await?;
        let result = if is_new {
            active.insert(&txn).await
        } else {
            active.update(&txn).await
        };

        match result {
            Ok(model) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(User::from(model))
            }
            Err(err) => {
                rollback(txn).await;
                Err(write_error(err))
            }
        }
    }

    async fn delete(&self, user: &User) -> AppResult<()> {
        let id = user.id.ok_or_else(|| AppError::not_found(MSG_ID_REQUIRED))?;

        let txn = self.begin_write().await?;
        match UserEntity::delete_by_id(id).exec(&txn).await {
            Ok(result) if result.rows_affected == 0 => {
                rollback(txn).await;
                Err(AppError::not_found("User not found"))
            }
            Ok(_) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(())
            }
            Err(err) => {
                rollback(txn).await;
                Err(write_error(err))
            }
        }
    }
}
