//! Device repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::error::StoreResult;
use domain::models::{Device, DeviceStatus, NewDevice};
use domain::services::DeviceStore;
use domain::StoreError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::DeviceEntity;
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for desktop endpoints and their presence.
#[derive(Clone)]
pub struct DeviceRepository {
    pool: PgPool,
}

impl DeviceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn require_row(rows: u64, id: Uuid) -> StoreResult<()> {
    if rows == 0 {
        Err(StoreError::NotFound(format!("device {}", id)))
    } else {
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for DeviceRepository {
    async fn find_device(&self, id: Uuid) -> StoreResult<Option<Device>> {
        let timer = QueryTimer::new("find_device_by_id");
        let result = sqlx::query_as::<_, DeviceEntity>(
            r#"
            SELECT id, user_id, name, status, last_active_at, created_at, updated_at
            FROM devices
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map_err(store_error)?.map(Device::try_from).transpose()
    }

    async fn create_device(&self, new: NewDevice) -> StoreResult<Device> {
        validator::Validate::validate(&new).map_err(|e| StoreError::Validation(e.to_string()))?;

        let timer = QueryTimer::new("create_device");
        let result = sqlx::query_as::<_, DeviceEntity>(
            r#"
            INSERT INTO devices (user_id, name, status)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, status, last_active_at, created_at, updated_at
            "#,
        )
        .bind(new.user_id)
        .bind(&new.name)
        .bind(DeviceStatus::Inactive.as_str())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Device::try_from(result.map_err(store_error)?)
    }

    async fn mark_device_active(&self, id: Uuid) -> StoreResult<()> {
        let timer = QueryTimer::new("mark_device_active");
        // Leaves updated_at alone when already active.
        let result = sqlx::query(
            r#"
            UPDATE devices
            SET status = 'active',
                updated_at = CASE WHEN status = 'active' THEN updated_at ELSE NOW() END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await;
        timer.record();
        require_row(result.map_err(store_error)?.rows_affected(), id)
    }

    async fn mark_device_inactive(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let timer = QueryTimer::new("mark_device_inactive");
        let result = sqlx::query(
            r#"
            UPDATE devices
            SET status = 'inactive', last_active_at = $2, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await;
        timer.record();
        require_row(result.map_err(store_error)?.rows_affected(), id)
    }
}
