//! Repository for permission groups and device shares.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::error::StoreResult;
use domain::models::{
    Capabilities, DeviceShare, NewDeviceShare, NewPermissionGroup, PermissionGroup, ShareGrant,
};
use domain::services::ShareStore;
use domain::StoreError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{DeviceShareEntity, PermissionGroupEntity, ShareGrantEntity};
use crate::error::store_error;
use crate::metrics::QueryTimer;

const GROUP_COLUMNS: &str = "id, user_id, name, see_screen, see_system_info, access_mouse, \
     access_keyboard, access_terminal, manage_power, created_at, updated_at";

#[derive(Clone)]
pub struct ShareRepository {
    pool: PgPool,
}

impl ShareRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareStore for ShareRepository {
    async fn find_grant(
        &self,
        user_id: Uuid,
        device_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ShareGrant>> {
        let timer = QueryTimer::new("find_share_grant");
        let result = sqlx::query_as::<_, ShareGrantEntity>(
            r#"
            SELECT s.id, s.device_id, s.user_id, s.permission_group_id, s.status,
                   s.expires_at, s.created_at, s.updated_at,
                   g.user_id AS group_user_id, g.name AS group_name,
                   g.see_screen, g.see_system_info, g.access_mouse, g.access_keyboard,
                   g.access_terminal, g.manage_power,
                   g.created_at AS group_created_at, g.updated_at AS group_updated_at
            FROM device_shares s
            JOIN permission_groups g ON g.id = s.permission_group_id
            WHERE s.user_id = $1
              AND s.device_id = $2
              AND s.status = 'active'
              AND (s.expires_at IS NULL OR s.expires_at > $3)
            ORDER BY s.created_at
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(device_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map_err(store_error)?.map(ShareGrant::try_from).transpose()
    }

    async fn create_permission_group(&self, new: NewPermissionGroup) -> StoreResult<PermissionGroup> {
        let caps = new.capabilities;
        let timer = QueryTimer::new("create_permission_group");
        let result = sqlx::query_as::<_, PermissionGroupEntity>(&format!(
            r#"
            INSERT INTO permission_groups
                (user_id, name, see_screen, see_system_info, access_mouse,
                 access_keyboard, access_terminal, manage_power)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            GROUP_COLUMNS
        ))
        .bind(new.user_id)
        .bind(&new.name)
        .bind(caps.see_screen)
        .bind(caps.see_system_info)
        .bind(caps.access_mouse)
        .bind(caps.access_keyboard)
        .bind(caps.access_terminal)
        .bind(caps.manage_power)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(store_error)?.into())
    }

    async fn update_capabilities(
        &self,
        group_id: Uuid,
        capabilities: Capabilities,
    ) -> StoreResult<PermissionGroup> {
        let timer = QueryTimer::new("update_permission_group");
        let result = sqlx::query_as::<_, PermissionGroupEntity>(&format!(
            r#"
            UPDATE permission_groups
            SET see_screen = $2, see_system_info = $3, access_mouse = $4,
                access_keyboard = $5, access_terminal = $6, manage_power = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            GROUP_COLUMNS
        ))
        .bind(group_id)
        .bind(capabilities.see_screen)
        .bind(capabilities.see_system_info)
        .bind(capabilities.access_mouse)
        .bind(capabilities.access_keyboard)
        .bind(capabilities.access_terminal)
        .bind(capabilities.manage_power)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
            .map_err(store_error)?
            .map(PermissionGroup::from)
            .ok_or_else(|| StoreError::NotFound(format!("permission group {}", group_id)))
    }

    async fn create_share(&self, new: NewDeviceShare) -> StoreResult<DeviceShare> {
        let timer = QueryTimer::new("create_device_share");
        let result = sqlx::query_as::<_, DeviceShareEntity>(
            r#"
            INSERT INTO device_shares (device_id, user_id, permission_group_id, status, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, device_id, user_id, permission_group_id, status, expires_at,
                      created_at, updated_at
            "#,
        )
        .bind(new.device_id)
        .bind(new.user_id)
        .bind(new.permission_group_id)
        .bind(new.status.as_str())
        .bind(new.expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        DeviceShare::try_from(result.map_err(store_error)?)
    }
}
