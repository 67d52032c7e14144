//! Persistent-connection handshake and device presence.
//!
//! A handshake either yields an immutable [`ConnectionIdentity`] plus a
//! [`PresenceGuard`], or a [`HandshakeError`]. The guard marks a desktop's
//! device inactive exactly once when the connection goes away, whether it
//! is released explicitly or dropped by an aborted task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::models::{ClientRole, Device, User};
use domain::services::{resolve_access, DeviceAccess, DeviceStore};
use domain::StoreError;
use metrics::gauge;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::services::auth::{AuthFailure, AuthService, TokenSources};

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("Unauthorized: {0}")]
    Unauthorized(AuthFailure),

    #[error("Target device is required")]
    MissingDevice,

    #[error("Device not found")]
    DeviceNotFound,

    #[error("Device does not match session")]
    DeviceMismatch,

    #[error("Access to device denied")]
    AccessDenied,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl HandshakeError {
    pub fn reason(&self) -> &'static str {
        match self {
            HandshakeError::Unauthorized(failure) => failure.reason(),
            HandshakeError::MissingDevice => "missing_device",
            HandshakeError::DeviceNotFound => "device_not_found",
            HandshakeError::DeviceMismatch => "device_mismatch",
            HandshakeError::AccessDenied => "access_denied",
            HandshakeError::Store(_) => "store_unavailable",
        }
    }
}

impl From<AuthFailure> for HandshakeError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::Store(err) => HandshakeError::Store(err),
            other => HandshakeError::Unauthorized(other),
        }
    }
}

/// Handshake input taken from the upgrade request.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandshakeRequest<'a> {
    pub tokens: TokenSources<'a>,
    /// Target device for web clients; optional echo of the bound device for
    /// desktop clients.
    pub device_id: Option<Uuid>,
}

/// Who is on the other end of an accepted connection.
#[derive(Debug, Clone)]
pub struct ConnectionIdentity {
    pub user: User,
    pub session_id: Uuid,
    pub role: ClientRole,
    /// The desktop's own device.
    pub device: Option<Device>,
    /// The device a web client drives.
    pub target_device: Option<Device>,
    /// How a web client reaches its target.
    pub access: Option<DeviceAccess>,
}

impl ConnectionIdentity {
    /// The device this connection relays for, whichever side it is on.
    pub fn relay_device(&self) -> Option<&Device> {
        self.device.as_ref().or(self.target_device.as_ref())
    }

    pub fn is_device_owner(&self) -> bool {
        self.relay_device()
            .map(|device| device.is_owned_by(self.user.id))
            .unwrap_or(false)
    }
}

/// An accepted handshake.
#[derive(Debug)]
pub struct Admission {
    pub identity: ConnectionIdentity,
    pub presence: PresenceGuard,
}

#[derive(Debug, Clone, Copy)]
enum PresenceChange {
    Active,
    Inactive(DateTime<Utc>),
}

/// Best-effort device presence writes, retried while the store reports
/// itself unavailable.
#[derive(Clone)]
pub struct PresenceWriter {
    devices: Arc<dyn DeviceStore>,
    retries: u32,
    retry_delay: Duration,
}

impl std::fmt::Debug for PresenceWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceWriter")
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

impl PresenceWriter {
    pub fn new(devices: Arc<dyn DeviceStore>, config: &RelayConfig) -> Self {
        Self {
            devices,
            retries: config.presence_retries,
            retry_delay: Duration::from_millis(config.presence_retry_delay_ms),
        }
    }

    pub async fn activate(&self, device_id: Uuid) -> bool {
        self.write(device_id, PresenceChange::Active).await
    }

    pub async fn deactivate(&self, device_id: Uuid, at: DateTime<Utc>) -> bool {
        self.write(device_id, PresenceChange::Inactive(at)).await
    }

    /// Returns whether the write landed. Never fails the caller.
    async fn write(&self, device_id: Uuid, change: PresenceChange) -> bool {
        let mut attempt = 0;
        loop {
            let result = match change {
                PresenceChange::Active => self.devices.mark_device_active(device_id).await,
                PresenceChange::Inactive(at) => {
                    self.devices.mark_device_inactive(device_id, at).await
                }
            };

            match result {
                Ok(()) => return true,
                Err(StoreError::Unavailable(msg)) if attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        device_id = %device_id,
                        attempt,
                        error = %msg,
                        "Presence write failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    error!(
                        device_id = %device_id,
                        change = ?change,
                        error = %e,
                        "Presence write abandoned"
                    );
                    return false;
                }
            }
        }
    }
}

/// Connection-lifetime token that runs disconnect side effects once.
#[derive(Debug)]
pub struct PresenceGuard {
    writer: PresenceWriter,
    role: ClientRole,
    device_id: Option<Uuid>,
    released: bool,
}

impl PresenceGuard {
    fn new(writer: PresenceWriter, role: ClientRole, device_id: Option<Uuid>) -> Self {
        gauge!("relay_connections_active", "role" => role.as_str()).increment(1.0);
        Self {
            writer,
            role,
            device_id,
            released: false,
        }
    }

    /// Runs the disconnect side effects and waits for them.
    ///
    /// The write runs on its own task, so cancelling this future does not
    /// cancel the write.
    pub async fn release(mut self) {
        self.released = true;
        gauge!("relay_connections_active", "role" => self.role.as_str()).decrement(1.0);
        if let Some(device_id) = self.device_id {
            let writer = self.writer.clone();
            let at = Utc::now();
            let task = tokio::spawn(async move { writer.deactivate(device_id, at).await });
            if let Err(e) = task.await {
                error!(device_id = %device_id, error = %e, "Presence task failed");
            }
        }
    }
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        gauge!("relay_connections_active", "role" => self.role.as_str()).decrement(1.0);

        let Some(device_id) = self.device_id else {
            return;
        };
        let at = Utc::now();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let writer = self.writer.clone();
                handle.spawn(async move {
                    writer.deactivate(device_id, at).await;
                });
            }
            Err(_) => {
                error!(device_id = %device_id, "No runtime to mark device inactive");
            }
        }
    }
}

/// Admits or rejects persistent connections.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    auth: AuthService,
    presence: PresenceWriter,
}

impl Gatekeeper {
    pub fn new(auth: AuthService, config: &RelayConfig) -> Self {
        let presence = PresenceWriter::new(auth.stores().devices.clone(), config);
        Self { auth, presence }
    }

    pub async fn admit(&self, request: &HandshakeRequest<'_>) -> Result<Admission, HandshakeError> {
        match self.try_admit(request).await {
            Ok(admission) => {
                let identity = &admission.identity;
                info!(
                    user_id = %identity.user.id,
                    role = %identity.role,
                    device_id = ?identity.relay_device().map(|d| d.id),
                    "Connection accepted"
                );
                Ok(admission)
            }
            Err(e) => {
                warn!(reason = e.reason(), device_id = ?request.device_id, "Connection rejected");
                Err(e)
            }
        }
    }

    async fn try_admit(&self, request: &HandshakeRequest<'_>) -> Result<Admission, HandshakeError> {
        let session = self.auth.authorize(&request.tokens).await?;
        let stores = self.auth.stores();
        let user = stores
            .users
            .find_user(session.user_id)
            .await?
            .ok_or(HandshakeError::Unauthorized(AuthFailure::SessionNotFound))?;

        let identity = match session.role {
            ClientRole::Desktop => {
                let bound = session.device_id.ok_or(HandshakeError::MissingDevice)?;
                if request.device_id.is_some_and(|claimed| claimed != bound) {
                    return Err(HandshakeError::DeviceMismatch);
                }
                let device = stores
                    .devices
                    .find_device(bound)
                    .await?
                    .ok_or(HandshakeError::DeviceNotFound)?;
                if !device.is_owned_by(user.id) {
                    return Err(HandshakeError::AccessDenied);
                }

                self.presence.activate(device.id).await;
                ConnectionIdentity {
                    user,
                    session_id: session.id,
                    role: ClientRole::Desktop,
                    device: Some(device),
                    target_device: None,
                    access: None,
                }
            }
            ClientRole::Web => {
                let target = request.device_id.ok_or(HandshakeError::MissingDevice)?;
                let device = stores
                    .devices
                    .find_device(target)
                    .await?
                    .ok_or(HandshakeError::DeviceNotFound)?;
                let access = resolve_access(stores, user.id, &device, Utc::now())
                    .await?
                    .ok_or(HandshakeError::AccessDenied)?;

                ConnectionIdentity {
                    user,
                    session_id: session.id,
                    role: ClientRole::Web,
                    device: None,
                    target_device: Some(device),
                    access: Some(access),
                }
            }
        };

        let presence = PresenceGuard::new(
            self.presence.clone(),
            identity.role,
            identity.device.as_ref().map(|d| d.id),
        );
        Ok(Admission { identity, presence })
    }

    /// Re-runs the ownership/share check for a subscription request.
    pub async fn authorize_subscription(
        &self,
        identity: &ConnectionIdentity,
    ) -> Result<(), HandshakeError> {
        let device_id = identity
            .relay_device()
            .map(|d| d.id)
            .ok_or(HandshakeError::MissingDevice)?;
        let device = self
            .auth
            .stores()
            .devices
            .find_device(device_id)
            .await?
            .ok_or(HandshakeError::DeviceNotFound)?;

        match identity.role {
            ClientRole::Desktop if device.is_owned_by(identity.user.id) => Ok(()),
            ClientRole::Desktop => Err(HandshakeError::AccessDenied),
            ClientRole::Web => resolve_access(self.auth.stores(), identity.user.id, &device, Utc::now())
                .await?
                .map(|_| ())
                .ok_or(HandshakeError::AccessDenied),
        }
    }
}
