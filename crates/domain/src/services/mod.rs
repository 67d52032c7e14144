//! Domain services for deskrelay.

pub mod access;
pub mod command_policy;
pub mod in_memory;
pub mod store;

pub use access::{resolve_access, DeviceAccess};
pub use command_policy::{CommandPolicy, CommandRule, PolicyDecision};
pub use in_memory::InMemoryStore;
pub use store::{DeviceStore, SessionStore, ShareStore, Stores, UserStore};
