//! User repository for database operations.

use async_trait::async_trait;
use domain::error::StoreResult;
use domain::models::{NewUser, User};
use domain::services::UserStore;
use domain::StoreError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::UserEntity;
use crate::error::store_error;
use crate::metrics::QueryTimer;

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";

/// Repository for user accounts.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map_err(store_error)?.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let timer = QueryTimer::new("find_user_by_email");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map_err(store_error)?.map(User::try_from).transpose()
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        validator::Validate::validate(&new).map_err(|e| StoreError::Validation(e.to_string()))?;

        let timer = QueryTimer::new("create_user");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        User::try_from(result.map_err(store_error)?)
    }
}
