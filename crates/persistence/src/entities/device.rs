//! Device entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::Device;
use domain::StoreError;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::corrupt_row;

#[derive(Debug, Clone, FromRow)]
pub struct DeviceEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub status: String,
    pub last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DeviceEntity> for Device {
    type Error = StoreError;

    fn try_from(entity: DeviceEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            status: entity.status.parse().map_err(|e| corrupt_row("devices", e))?,
            id: entity.id,
            user_id: entity.user_id,
            name: entity.name,
            last_active_at: entity.last_active_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::DeviceStatus;

    #[test]
    fn test_entity_to_domain() {
        let entity = DeviceEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Office PC".to_string(),
            status: "active".to_string(),
            last_active_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let device = Device::try_from(entity.clone()).unwrap();
        assert_eq!(device.id, entity.id);
        assert_eq!(device.status, DeviceStatus::Active);
    }
}
