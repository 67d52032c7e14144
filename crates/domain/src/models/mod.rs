//! Domain models for deskrelay.

pub mod device;
pub mod device_share;
pub mod permission;
pub mod session;
pub mod user;

pub use device::{Device, DeviceStatus, NewDevice};
pub use device_share::{DeviceShare, NewDeviceShare, ShareGrant, ShareStatus};
pub use permission::{Capabilities, Capability, NewPermissionGroup, PermissionGroup};
pub use session::{ClientRole, NewSession, Session, SessionStatus};
pub use user::{NewUser, User, UserRole};
