//! Delegated device access.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::permission::PermissionGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    #[default]
    Active,
    Inactive,
}

impl ShareStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareStatus::Active => "active",
            ShareStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for ShareStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ShareStatus::Active),
            "inactive" => Ok(ShareStatus::Inactive),
            _ => Err(format!("Invalid share status: {}", s)),
        }
    }
}

impl fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recipient `user_id` may act on `device_id` under `permission_group_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceShare {
    pub id: Uuid,
    pub device_id: Uuid,
    pub user_id: Uuid,
    pub permission_group_id: Uuid,
    pub status: ShareStatus,
    /// `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeviceShare {
    /// Active and not past its expiry.
    pub fn is_effective_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ShareStatus::Active && self.expires_at.map_or(true, |exp| exp > now)
    }
}

#[derive(Debug, Clone)]
pub struct NewDeviceShare {
    pub device_id: Uuid,
    pub user_id: Uuid,
    pub permission_group_id: Uuid,
    pub status: ShareStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

/// An effective share together with the capabilities it grants.
#[derive(Debug, Clone)]
pub struct ShareGrant {
    pub share: DeviceShare,
    pub group: PermissionGroup,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn share(status: ShareStatus, expires_at: Option<DateTime<Utc>>) -> DeviceShare {
        DeviceShare {
            id: Uuid::new_v4(),
            device_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            permission_group_id: Uuid::new_v4(),
            status,
            expires_at,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_share() {
        let now = Utc::now();
        assert!(share(ShareStatus::Active, None).is_effective_at(now));
        assert!(share(ShareStatus::Active, Some(now + Duration::hours(1))).is_effective_at(now));
    }

    #[test]
    fn test_expired_or_inactive_share_is_not_effective() {
        let now = Utc::now();
        assert!(!share(ShareStatus::Active, Some(now)).is_effective_at(now));
        assert!(!share(ShareStatus::Active, Some(now - Duration::hours(1))).is_effective_at(now));
        assert!(!share(ShareStatus::Inactive, None).is_effective_at(now));
    }
}
