//! Session records: one node in an authenticated token lineage.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use shared::crypto::{generate_jti, generate_session_key};

/// Which kind of client a session authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientRole {
    /// Viewer driving a device from the browser.
    Web,
    /// The controlled endpoint itself.
    Desktop,
}

impl ClientRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientRole::Web => "web",
            ClientRole::Desktop => "desktop",
        }
    }
}

impl FromStr for ClientRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(ClientRole::Web),
            "desktop" => Ok(ClientRole::Desktop),
            _ => Err(format!("Invalid client role: {}", s)),
        }
    }
}

impl fmt::Display for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Revoked,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Revoked => "revoked",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "revoked" => Ok(SessionStatus::Revoked),
            _ => Err(format!("Invalid session status: {}", s)),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted session. `jti` and `session_key` never change once written;
/// the only mutation is `status` flipping to revoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Set only for desktop sessions.
    pub device_id: Option<Uuid>,
    pub jti: String,
    pub session_key: String,
    pub role: ClientRole,
    pub status: SessionStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn is_revoked(&self) -> bool {
        self.status == SessionStatus::Revoked
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A session about to be created, with freshly generated identifiers.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: Uuid,
    pub device_id: Option<Uuid>,
    pub jti: String,
    pub session_key: String,
    pub role: ClientRole,
    pub expires_at: DateTime<Utc>,
}

impl NewSession {
    fn issue(user_id: Uuid, role: ClientRole, device_id: Option<Uuid>, lifetime: Duration) -> Self {
        Self {
            user_id,
            device_id,
            jti: generate_jti(),
            session_key: generate_session_key(),
            role,
            expires_at: Utc::now() + lifetime,
        }
    }

    /// A browser session. Never bound to a device.
    pub fn web(user_id: Uuid, lifetime: Duration) -> Self {
        Self::issue(user_id, ClientRole::Web, None, lifetime)
    }

    /// A desktop session bound to `device_id`.
    pub fn desktop(user_id: Uuid, device_id: Uuid, lifetime: Duration) -> Self {
        Self::issue(user_id, ClientRole::Desktop, Some(device_id), lifetime)
    }

    /// The next node of `previous`'s lineage: same user, role and device,
    /// new identifiers and expiry.
    pub fn successor(previous: &Session, lifetime: Duration) -> Self {
        Self::issue(previous.user_id, previous.role, previous.device_id, lifetime)
    }
}
