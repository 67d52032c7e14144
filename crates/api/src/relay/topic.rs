//! Traffic classes and topic naming.

use std::fmt;
use std::str::FromStr;

use domain::models::ClientRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::ConnectionIdentity;

/// Independent traffic class. Each has its own topic family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Commands to the desktop and their responses.
    Command,
    /// WebRTC negotiation for the screen stream.
    Signaling,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Command, Channel::Signaling];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Command => "command",
            Channel::Signaling => "signaling",
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "command" => Ok(Channel::Command),
            "signaling" => Ok(Channel::Signaling),
            _ => Err(format!("Unknown channel: {}", s)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A broadcast topic name.
///
/// `<channel>:device:<device_id>` is a desktop's inbox.
/// `<channel>:viewer:<user_id>:<device_id>` is one user's return channel
/// for one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    pub fn device(channel: Channel, device_id: Uuid) -> Self {
        Topic(format!("{}:device:{}", channel, device_id))
    }

    pub fn viewer(channel: Channel, user_id: Uuid, device_id: Uuid) -> Self {
        Topic(format!("{}:viewer:{}:{}", channel, user_id, device_id))
    }

    /// The single topic `identity` listens on for `channel`.
    pub fn inbox(channel: Channel, identity: &ConnectionIdentity) -> Option<Self> {
        let device = identity.relay_device()?;
        Some(match identity.role {
            ClientRole::Desktop => Topic::device(channel, device.id),
            ClientRole::Web => Topic::viewer(channel, identity.user.id, device.id),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
