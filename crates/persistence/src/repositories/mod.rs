//! Repository implementations of the domain store traits.

pub mod device;
pub mod session;
pub mod share;
pub mod user;

pub use device::DeviceRepository;
pub use session::SessionRepository;
pub use share::ShareRepository;
pub use user::UserRepository;
