//! Database entity definitions.
//!
//! Entities are direct mappings to database rows. Enum columns are stored as
//! text and parsed on conversion into domain models.

pub mod device;
pub mod device_share;
pub mod permission_group;
pub mod session;
pub mod user;

pub use device::DeviceEntity;
pub use device_share::{DeviceShareEntity, ShareGrantEntity};
pub use permission_group::PermissionGroupEntity;
pub use session::SessionEntity;
pub use user::UserEntity;
