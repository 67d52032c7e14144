//! Session entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::Session;
use domain::StoreError;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::corrupt_row;

#[derive(Debug, Clone, FromRow)]
pub struct SessionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_id: Option<Uuid>,
    pub jti: String,
    pub session_key: String,
    pub client_type: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SessionEntity> for Session {
    type Error = StoreError;

    fn try_from(entity: SessionEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            role: entity
                .client_type
                .parse()
                .map_err(|e| corrupt_row("sessions", e))?,
            status: entity.status.parse().map_err(|e| corrupt_row("sessions", e))?,
            id: entity.id,
            user_id: entity.user_id,
            device_id: entity.device_id,
            jti: entity.jti,
            session_key: entity.session_key,
            expires_at: entity.expires_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{ClientRole, SessionStatus};

    fn entity(client_type: &str, status: &str) -> SessionEntity {
        SessionEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            device_id: Some(Uuid::new_v4()),
            jti: Uuid::new_v4().to_string(),
            session_key: "key".to_string(),
            client_type: client_type.to_string(),
            status: status.to_string(),
            expires_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_entity_to_domain() {
        let session = Session::try_from(entity("desktop", "revoked")).unwrap();
        assert_eq!(session.role, ClientRole::Desktop);
        assert_eq!(session.status, SessionStatus::Revoked);
    }

    #[test]
    fn test_bad_enum_values() {
        assert!(Session::try_from(entity("tablet", "active")).is_err());
        assert!(Session::try_from(entity("web", "paused")).is_err());
    }
}
