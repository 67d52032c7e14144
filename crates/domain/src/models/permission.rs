//! Capability grants for shared devices.
//!
//! A [`PermissionGroup`] is a named, fixed-size record of six boolean
//! capabilities. Every capability defaults to denied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One grantable capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    SeeScreen,
    SeeSystemInfo,
    AccessMouse,
    AccessKeyboard,
    AccessTerminal,
    ManagePower,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::SeeScreen,
        Capability::SeeSystemInfo,
        Capability::AccessMouse,
        Capability::AccessKeyboard,
        Capability::AccessTerminal,
        Capability::ManagePower,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::SeeScreen => "see_screen",
            Capability::SeeSystemInfo => "see_system_info",
            Capability::AccessMouse => "access_mouse",
            Capability::AccessKeyboard => "access_keyboard",
            Capability::AccessTerminal => "access_terminal",
            Capability::ManagePower => "manage_power",
        }
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown capability: {}", s))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six capability flags of a permission group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub see_screen: bool,
    pub see_system_info: bool,
    pub access_mouse: bool,
    pub access_keyboard: bool,
    pub access_terminal: bool,
    pub manage_power: bool,
}

impl Capabilities {
    /// Nothing granted.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::SeeScreen => self.see_screen,
            Capability::SeeSystemInfo => self.see_system_info,
            Capability::AccessMouse => self.access_mouse,
            Capability::AccessKeyboard => self.access_keyboard,
            Capability::AccessTerminal => self.access_terminal,
            Capability::ManagePower => self.manage_power,
        }
    }

    pub fn set(&mut self, capability: Capability, granted: bool) {
        let flag = match capability {
            Capability::SeeScreen => &mut self.see_screen,
            Capability::SeeSystemInfo => &mut self.see_system_info,
            Capability::AccessMouse => &mut self.access_mouse,
            Capability::AccessKeyboard => &mut self.access_keyboard,
            Capability::AccessTerminal => &mut self.access_terminal,
            Capability::ManagePower => &mut self.manage_power,
        };
        *flag = granted;
    }

    /// Builder form of [`Capabilities::set`] with `granted = true`.
    pub fn with(mut self, capability: Capability) -> Self {
        self.set(capability, true);
        self
    }

    pub fn granted(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.allows(*c))
            .collect()
    }
}

/// A reusable bundle of capabilities owned by the granting user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub capabilities: Capabilities,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPermissionGroup {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub capabilities: Capabilities,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_denies_everything() {
        let caps = Capabilities::default();
        for capability in Capability::ALL {
            assert!(!caps.allows(capability), "{} should be denied", capability);
        }
        assert!(caps.granted().is_empty());
    }

    #[test]
    fn test_flags_are_independent() {
        let caps = Capabilities::none().with(Capability::AccessKeyboard);
        assert!(caps.allows(Capability::AccessKeyboard));
        assert!(!caps.allows(Capability::AccessMouse));
        assert_eq!(caps.granted(), vec![Capability::AccessKeyboard]);
    }

    #[test]
    fn test_set_can_revoke() {
        let mut caps = Capabilities::none().with(Capability::ManagePower);
        caps.set(Capability::ManagePower, false);
        assert_eq!(caps, Capabilities::none());
    }

    #[test]
    fn test_capability_names_parse_back() {
        for capability in Capability::ALL {
            assert_eq!(capability.as_str().parse::<Capability>().unwrap(), capability);
        }
        assert!("fly".parse::<Capability>().is_err());
    }

    #[test]
    fn test_missing_fields_deserialize_as_denied() {
        let caps: Capabilities = serde_json::from_str(r#"{"see_screen": true}"#).unwrap();
        assert!(caps.see_screen);
        assert!(!caps.access_terminal);
    }
}
