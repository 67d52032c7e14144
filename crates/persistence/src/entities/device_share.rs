//! Device share entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::{DeviceShare, PermissionGroup, ShareGrant};
use domain::StoreError;
use sqlx::FromRow;
use uuid::Uuid;

use super::permission_group::PermissionGroupEntity;
use crate::error::corrupt_row;

#[derive(Debug, Clone, FromRow)]
pub struct DeviceShareEntity {
    pub id: Uuid,
    pub device_id: Uuid,
    pub user_id: Uuid,
    pub permission_group_id: Uuid,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DeviceShareEntity> for DeviceShare {
    type Error = StoreError;

    fn try_from(entity: DeviceShareEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            status: entity
                .status
                .parse()
                .map_err(|e| corrupt_row("device_shares", e))?,
            id: entity.id,
            device_id: entity.device_id,
            user_id: entity.user_id,
            permission_group_id: entity.permission_group_id,
            expires_at: entity.expires_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

/// A share row joined with its permission group.
#[derive(Debug, Clone, FromRow)]
pub struct ShareGrantEntity {
    #[sqlx(flatten)]
    pub share: DeviceShareEntity,
    pub group_user_id: Uuid,
    pub group_name: Option<String>,
    pub see_screen: bool,
    pub see_system_info: bool,
    pub access_mouse: bool,
    pub access_keyboard: bool,
    pub access_terminal: bool,
    pub manage_power: bool,
    pub group_created_at: DateTime<Utc>,
    pub group_updated_at: DateTime<Utc>,
}

impl TryFrom<ShareGrantEntity> for ShareGrant {
    type Error = StoreError;

    fn try_from(entity: ShareGrantEntity) -> Result<Self, Self::Error> {
        let group = PermissionGroup::from(PermissionGroupEntity {
            id: entity.share.permission_group_id,
            user_id: entity.group_user_id,
            name: entity.group_name,
            see_screen: entity.see_screen,
            see_system_info: entity.see_system_info,
            access_mouse: entity.access_mouse,
            access_keyboard: entity.access_keyboard,
            access_terminal: entity.access_terminal,
            manage_power: entity.manage_power,
            created_at: entity.group_created_at,
            updated_at: entity.group_updated_at,
        });
        Ok(Self {
            share: DeviceShare::try_from(entity.share)?,
            group,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::ShareStatus;

    #[test]
    fn test_grant_entity_to_domain() {
        let group_id = Uuid::new_v4();
        let entity = ShareGrantEntity {
            share: DeviceShareEntity {
                id: Uuid::new_v4(),
                device_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                permission_group_id: group_id,
                status: "active".to_string(),
                expires_at: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            group_user_id: Uuid::new_v4(),
            group_name: Some("helpdesk".to_string()),
            see_screen: true,
            see_system_info: false,
            access_mouse: true,
            access_keyboard: false,
            access_terminal: false,
            manage_power: false,
            group_created_at: Utc::now(),
            group_updated_at: Utc::now(),
        };

        let grant = ShareGrant::try_from(entity).unwrap();
        assert_eq!(grant.group.id, group_id);
        assert_eq!(grant.share.status, ShareStatus::Active);
        assert!(grant.group.capabilities.access_mouse);
        assert!(!grant.group.capabilities.access_keyboard);
    }
}
