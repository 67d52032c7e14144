//! Command permission policy for non-owner senders.
//!
//! Commands are dot-namespaced (`keyboard.press`, `terminal.execute`). The
//! policy is an ordered table of prefix rules; the first rule whose prefix
//! matches decides which capability is required. Unmatched commands are
//! denied.

use serde::{Deserialize, Serialize};

use crate::models::{Capabilities, Capability};

/// Maps a command prefix to the capability it requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRule {
    pub prefix: String,
    pub capability: Capability,
}

impl CommandRule {
    pub fn new(prefix: impl Into<String>, capability: Capability) -> Self {
        Self {
            prefix: prefix.into(),
            capability,
        }
    }

    pub fn matches(&self, command: &str) -> bool {
        command.starts_with(&self.prefix)
    }
}

/// Outcome of evaluating one command against a capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Allowed(Capability),
    Denied(Capability),
    /// No rule covers the command.
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPolicy {
    rules: Vec<CommandRule>,
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self::new(vec![
            CommandRule::new("keyboard.", Capability::AccessKeyboard),
            CommandRule::new("mouse.", Capability::AccessMouse),
            CommandRule::new("terminal.", Capability::AccessTerminal),
            CommandRule::new("screen.", Capability::SeeScreen),
            CommandRule::new("system.", Capability::SeeSystemInfo),
            CommandRule::new("power.", Capability::ManagePower),
        ])
    }
}

impl CommandPolicy {
    pub fn new(rules: Vec<CommandRule>) -> Self {
        Self { rules }
    }

    /// First matching rule wins.
    pub fn required_capability(&self, command: &str) -> Option<Capability> {
        self.rules
            .iter()
            .find(|rule| rule.matches(command))
            .map(|rule| rule.capability)
    }

    pub fn evaluate(&self, command: &str, granted: &Capabilities) -> PolicyDecision {
        match self.required_capability(command) {
            None => PolicyDecision::Unmatched,
            Some(cap) if granted.allows(cap) => PolicyDecision::Allowed(cap),
            Some(cap) => PolicyDecision::Denied(cap),
        }
    }
}
