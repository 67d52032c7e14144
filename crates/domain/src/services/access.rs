//! Ownership and share resolution for a (user, device) pair.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::store::Stores;
use crate::error::StoreResult;
use crate::models::{Capabilities, Device, ShareGrant};

/// How a user reaches a device.
#[derive(Debug, Clone)]
pub enum DeviceAccess {
    Owner,
    Shared(Box<ShareGrant>),
}

impl DeviceAccess {
    pub fn is_owner(&self) -> bool {
        matches!(self, DeviceAccess::Owner)
    }

    /// `None` for owners, who are not subject to capability checks.
    pub fn capabilities(&self) -> Option<&Capabilities> {
        match self {
            DeviceAccess::Owner => None,
            DeviceAccess::Shared(grant) => Some(&grant.group.capabilities),
        }
    }
}

/// Resolves whether `user_id` owns `device` or holds an effective share on it.
pub async fn resolve_access(
    stores: &Stores,
    user_id: Uuid,
    device: &Device,
    now: DateTime<Utc>,
) -> StoreResult<Option<DeviceAccess>> {
    if device.is_owned_by(user_id) {
        return Ok(Some(DeviceAccess::Owner));
    }
    Ok(stores
        .shares
        .find_grant(user_id, device.id, now)
        .await?
        .map(|grant| DeviceAccess::Shared(Box::new(grant))))
}
