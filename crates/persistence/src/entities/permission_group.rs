//! Permission group entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Capabilities, PermissionGroup};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct PermissionGroupEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub see_screen: bool,
    pub see_system_info: bool,
    pub access_mouse: bool,
    pub access_keyboard: bool,
    pub access_terminal: bool,
    pub manage_power: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PermissionGroupEntity> for PermissionGroup {
    fn from(entity: PermissionGroupEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            name: entity.name,
            capabilities: Capabilities {
                see_screen: entity.see_screen,
                see_system_info: entity.see_system_info,
                access_mouse: entity.access_mouse,
                access_keyboard: entity.access_keyboard,
                access_terminal: entity.access_terminal,
                manage_power: entity.manage_power,
            },
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
