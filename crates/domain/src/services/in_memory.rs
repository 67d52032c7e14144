//! In-memory store backend for development and testing.
//!
//! Implements every store trait over a single mutex, which also makes
//! [`SessionStore::rotate_session`] trivially atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::store::{DeviceStore, SessionStore, ShareStore, UserStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Capabilities, Device, DeviceShare, DeviceStatus, NewDevice, NewDeviceShare,
    NewPermissionGroup, NewSession, NewUser, PermissionGroup, Session, SessionStatus, ShareGrant,
    User,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    devices: HashMap<Uuid, Device>,
    sessions: HashMap<Uuid, Session>,
    groups: HashMap<Uuid, PermissionGroup>,
    shares: HashMap<Uuid, DeviceShare>,
}

/// Store backend holding everything in process memory.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
    presence_failures: AtomicU32,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store poisoned".to_string()))
    }

    fn presence_write(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        let injected = self
            .presence_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected presence failure".to_string()));
        }
        self.tables()
    }
}

/// Fault injection and inspection for tests.
#[cfg(any(test, feature = "test-util"))]
impl InMemoryStore {
    /// Makes every subsequent operation fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes the next `count` device presence writes fail with `Unavailable`.
    pub fn fail_presence_writes(&self, count: u32) {
        self.presence_failures.store(count, Ordering::SeqCst);
    }

    /// Every session of `user_id`, in no particular order.
    pub fn sessions_of(&self, user_id: Uuid) -> Vec<Session> {
        self.tables
            .lock()
            .map(|t| {
                t.sessions
                    .values()
                    .filter(|s| s.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Flips every share received by `user_id` to inactive.
    pub fn deactivate_shares_of(&self, user_id: Uuid) {
        if let Ok(mut tables) = self.tables.lock() {
            for share in tables.shares.values_mut().filter(|s| s.user_id == user_id) {
                share.status = crate::models::ShareStatus::Inactive;
                share.updated_at = Utc::now();
            }
        }
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        new.validate()
            .map_err(|e| StoreError::Validation(e.to_string()))?;
        let mut tables = self.tables()?;
        if tables.users.values().any(|u| u.username == new.username) {
            return Err(StoreError::Conflict("username already taken".to_string()));
        }
        if tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&new.email))
        {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl DeviceStore for InMemoryStore {
    async fn find_device(&self, id: Uuid) -> StoreResult<Option<Device>> {
        Ok(self.tables()?.devices.get(&id).cloned())
    }

    async fn create_device(&self, new: NewDevice) -> StoreResult<Device> {
        new.validate()
            .map_err(|e| StoreError::Validation(e.to_string()))?;
        let mut tables = self.tables()?;
        if !tables.users.contains_key(&new.user_id) {
            return Err(StoreError::NotFound(format!("user {}", new.user_id)));
        }

        let now = Utc::now();
        let device = Device {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            name: new.name,
            status: DeviceStatus::Inactive,
            last_active_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.devices.insert(device.id, device.clone());
        Ok(device)
    }

    async fn mark_device_active(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.presence_write()?;
        let device = tables
            .devices
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("device {}", id)))?;
        if device.status != DeviceStatus::Active {
            device.status = DeviceStatus::Active;
            device.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_device_inactive(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.presence_write()?;
        let device = tables
            .devices
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("device {}", id)))?;
        device.status = DeviceStatus::Inactive;
        device.last_active_at = Some(at);
        device.updated_at = at;
        Ok(())
    }
}

fn insert_session(tables: &mut Tables, new: NewSession) -> Session {
    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4(),
        user_id: new.user_id,
        device_id: new.device_id,
        jti: new.jti,
        session_key: new.session_key,
        role: new.role,
        status: SessionStatus::Active,
        expires_at: new.expires_at,
        created_at: now,
        updated_at: now,
    };
    tables.sessions.insert(session.id, session.clone());
    session
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_session(&self, new: NewSession) -> StoreResult<Session> {
        let mut tables = self.tables()?;
        if !tables.users.contains_key(&new.user_id) {
            return Err(StoreError::NotFound(format!("user {}", new.user_id)));
        }
        Ok(insert_session(&mut tables, new))
    }

    async fn find_session(
        &self,
        user_id: Uuid,
        jti: &str,
        session_key: &str,
        status: Option<SessionStatus>,
    ) -> StoreResult<Option<Session>> {
        Ok(self
            .tables()?
            .sessions
            .values()
            .find(|s| {
                s.user_id == user_id
                    && s.jti == jti
                    && s.session_key == session_key
                    && status.map_or(true, |wanted| s.status == wanted)
            })
            .cloned())
    }

    async fn revoke_session(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables()?;
        match tables.sessions.get_mut(&id) {
            Some(session) if session.is_active() => {
                session.status = SessionStatus::Revoked;
                session.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_sessions(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables()?;
        let now = Utc::now();
        let mut revoked = 0;
        for session in tables
            .sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && s.is_active())
        {
            session.status = SessionStatus::Revoked;
            session.updated_at = now;
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn rotate_session(
        &self,
        previous_id: Uuid,
        successor: NewSession,
    ) -> StoreResult<Option<Session>> {
        let mut tables = self.tables()?;
        match tables.sessions.get_mut(&previous_id) {
            Some(previous) if previous.is_active() => {
                previous.status = SessionStatus::Revoked;
                previous.updated_at = Utc::now();
            }
            _ => return Ok(None),
        }
        Ok(Some(insert_session(&mut tables, successor)))
    }
}

#[async_trait]
impl ShareStore for InMemoryStore {
    async fn find_grant(
        &self,
        user_id: Uuid,
        device_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ShareGrant>> {
        let tables = self.tables()?;
        let grant = tables
            .shares
            .values()
            .filter(|s| s.user_id == user_id && s.device_id == device_id && s.is_effective_at(now))
            .find_map(|share| {
                tables
                    .groups
                    .get(&share.permission_group_id)
                    .map(|group| ShareGrant {
                        share: share.clone(),
                        group: group.clone(),
                    })
            });
        Ok(grant)
    }

    async fn create_permission_group(&self, new: NewPermissionGroup) -> StoreResult<PermissionGroup> {
        let mut tables = self.tables()?;
        if !tables.users.contains_key(&new.user_id) {
            return Err(StoreError::NotFound(format!("user {}", new.user_id)));
        }
        let now = Utc::now();
        let group = PermissionGroup {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            name: new.name,
            capabilities: new.capabilities,
            created_at: now,
            updated_at: now,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn update_capabilities(
        &self,
        group_id: Uuid,
        capabilities: Capabilities,
    ) -> StoreResult<PermissionGroup> {
        let mut tables = self.tables()?;
        let group = tables
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| StoreError::NotFound(format!("permission group {}", group_id)))?;
        group.capabilities = capabilities;
        group.updated_at = Utc::now();
        Ok(group.clone())
    }

    async fn create_share(&self, new: NewDeviceShare) -> StoreResult<DeviceShare> {
        let mut tables = self.tables()?;
        if !tables.devices.contains_key(&new.device_id) {
            return Err(StoreError::NotFound(format!("device {}", new.device_id)));
        }
        if !tables.users.contains_key(&new.user_id) {
            return Err(StoreError::NotFound(format!("user {}", new.user_id)));
        }
        if !tables.groups.contains_key(&new.permission_group_id) {
            return Err(StoreError::NotFound(format!(
                "permission group {}",
                new.permission_group_id
            )));
        }
        let now = Utc::now();
        let share = DeviceShare {
            id: Uuid::new_v4(),
            device_id: new.device_id,
            user_id: new.user_id,
            permission_group_id: new.permission_group_id,
            status: new.status,
            expires_at: new.expires_at,
            created_at: now,
            updated_at: now,
        };
        tables.shares.insert(share.id, share.clone());
        Ok(share)
    }
}
