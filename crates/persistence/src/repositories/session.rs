//! Session repository for database operations.

use async_trait::async_trait;
use domain::error::StoreResult;
use domain::models::{NewSession, Session, SessionStatus};
use domain::services::SessionStore;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::entities::SessionEntity;
use crate::error::store_error;
use crate::metrics::QueryTimer;

const SESSION_COLUMNS: &str =
    "id, user_id, device_id, jti, session_key, client_type, status, expires_at, created_at, updated_at";

/// Repository for session records.
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert<'e, E: PgExecutor<'e>>(executor: E, new: &NewSession) -> Result<SessionEntity, sqlx::Error> {
    sqlx::query_as::<_, SessionEntity>(&format!(
        r#"
        INSERT INTO sessions (user_id, device_id, jti, session_key, client_type, status, expires_at)
        VALUES ($1, $2, $3, $4, $5, 'active', $6)
        RETURNING {}
        "#,
        SESSION_COLUMNS
    ))
    .bind(new.user_id)
    .bind(new.device_id)
    .bind(&new.jti)
    .bind(&new.session_key)
    .bind(new.role.as_str())
    .bind(new.expires_at)
    .fetch_one(executor)
    .await
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn create_session(&self, new: NewSession) -> StoreResult<Session> {
        let timer = QueryTimer::new("create_session");
        let result = insert(&self.pool, &new).await;
        timer.record();
        Session::try_from(result.map_err(store_error)?)
    }

    async fn find_session(
        &self,
        user_id: Uuid,
        jti: &str,
        session_key: &str,
        status: Option<SessionStatus>,
    ) -> StoreResult<Option<Session>> {
        let timer = QueryTimer::new("find_session");
        let result = sqlx::query_as::<_, SessionEntity>(&format!(
            r#"
            SELECT {}
            FROM sessions
            WHERE user_id = $1 AND jti = $2 AND session_key = $3
              AND ($4::text IS NULL OR status = $4)
            "#,
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(jti)
        .bind(session_key)
        .bind(status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map_err(store_error)?.map(Session::try_from).transpose()
    }

    async fn revoke_session(&self, id: Uuid) -> StoreResult<bool> {
        let timer = QueryTimer::new("revoke_session");
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET status = 'revoked', updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(store_error)?.rows_affected() > 0)
    }

    async fn revoke_all_sessions(&self, user_id: Uuid) -> StoreResult<u64> {
        let timer = QueryTimer::new("revoke_all_sessions");
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET status = 'revoked', updated_at = NOW()
            WHERE user_id = $1 AND status = 'active'
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(store_error)?.rows_affected())
    }

    async fn rotate_session(
        &self,
        previous_id: Uuid,
        successor: NewSession,
    ) -> StoreResult<Option<Session>> {
        let timer = QueryTimer::new("rotate_session");
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        // The row lock taken by this UPDATE serialises concurrent rotations;
        // the loser sees status = 'revoked' and matches no row.
        let revoked = sqlx::query(
            r#"
            UPDATE sessions
            SET status = 'revoked', updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(previous_id)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;

        if revoked.rows_affected() == 0 {
            tx.rollback().await.map_err(store_error)?;
            timer.record();
            return Ok(None);
        }

        let created = insert(&mut *tx, &successor).await.map_err(store_error)?;
        tx.commit().await.map_err(store_error)?;
        timer.record();

        Session::try_from(created).map(Some)
    }
}
