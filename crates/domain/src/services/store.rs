//! Store traits: the persistence contract the relay core depends on.
//!
//! Implementations: [`super::InMemoryStore`] for development and tests, and
//! the PostgreSQL repositories in the `persistence` crate.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{
    Capabilities, Device, DeviceShare, NewDevice, NewDeviceShare, NewPermissionGroup, NewSession,
    NewUser, PermissionGroup, Session, SessionStatus, ShareGrant, User,
};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Fails with `Conflict` when the username or email is taken.
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
}

#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn find_device(&self, id: Uuid) -> StoreResult<Option<Device>>;

    /// Fails with `Validation` when the name is outside 1..=32 characters.
    async fn create_device(&self, new: NewDevice) -> StoreResult<Device>;

    /// Idempotent.
    async fn mark_device_active(&self, id: Uuid) -> StoreResult<()>;

    /// Sets status inactive and stamps `last_active_at`, even if already inactive.
    async fn mark_device_inactive(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, new: NewSession) -> StoreResult<Session>;

    /// Looks up by the compound key. `status = None` matches any status.
    async fn find_session(
        &self,
        user_id: Uuid,
        jti: &str,
        session_key: &str,
        status: Option<SessionStatus>,
    ) -> StoreResult<Option<Session>>;

    /// Returns `false` if the session was already revoked or does not exist.
    async fn revoke_session(&self, id: Uuid) -> StoreResult<bool>;

    /// Returns the number of sessions that changed state.
    async fn revoke_all_sessions(&self, user_id: Uuid) -> StoreResult<u64>;

    /// Atomically revokes `previous_id` and creates `successor`.
    ///
    /// Returns `None` without creating anything when `previous_id` is no
    /// longer active, so concurrent rotations of one session yield at most
    /// one successor.
    async fn rotate_session(
        &self,
        previous_id: Uuid,
        successor: NewSession,
    ) -> StoreResult<Option<Session>>;
}

#[async_trait]
pub trait ShareStore: Send + Sync {
    /// The share naming (`user_id`, `device_id`) that is effective at `now`,
    /// joined with its permission group.
    async fn find_grant(
        &self,
        user_id: Uuid,
        device_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<ShareGrant>>;

    async fn create_permission_group(&self, new: NewPermissionGroup) -> StoreResult<PermissionGroup>;

    async fn update_capabilities(
        &self,
        group_id: Uuid,
        capabilities: Capabilities,
    ) -> StoreResult<PermissionGroup>;

    async fn create_share(&self, new: NewDeviceShare) -> StoreResult<DeviceShare>;
}

/// The full set of stores, shared across request handlers and connections.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub devices: Arc<dyn DeviceStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub shares: Arc<dyn ShareStore>,
}

impl Stores {
    /// Uses one backend for every store.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: UserStore + DeviceStore + SessionStore + ShareStore + 'static,
    {
        Self {
            users: backend.clone(),
            devices: backend.clone(),
            sessions: backend.clone(),
            shares: backend,
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
