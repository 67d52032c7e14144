//! Persistence layer for the deskrelay backend.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Repositories implementing the domain store traits

use std::sync::Arc;

use domain::services::Stores;
use sqlx::PgPool;

pub mod db;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod repositories;

use repositories::{DeviceRepository, SessionRepository, ShareRepository, UserRepository};

/// Builds the PostgreSQL-backed store set.
pub fn stores(pool: PgPool) -> Stores {
    Stores {
        users: Arc::new(UserRepository::new(pool.clone())),
        devices: Arc::new(DeviceRepository::new(pool.clone())),
        sessions: Arc::new(SessionRepository::new(pool.clone())),
        shares: Arc::new(ShareRepository::new(pool)),
    }
}
