//! Domain layer for the deskrelay backend.
//!
//! This crate contains:
//! - Entity models (User, Device, Session, PermissionGroup, DeviceShare)
//! - Store traits consumed by the API layer, plus an in-memory implementation
//! - The command permission policy
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::StoreError;
