//! User entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::User;
use domain::StoreError;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::corrupt_row;

#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserEntity> for User {
    type Error = StoreError;

    fn try_from(entity: UserEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            role: entity.role.parse().map_err(|e| corrupt_row("users", e))?,
            id: entity.id,
            username: entity.username,
            email: entity.email,
            password_hash: entity.password_hash,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}
