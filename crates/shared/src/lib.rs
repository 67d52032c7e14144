//! Shared utilities for the deskrelay backend.
//!
//! - Access/refresh token codec
//! - Password hashing with Argon2id
//! - Random session identifiers
//! - Common field validation

pub mod crypto;
pub mod jwt;
pub mod password;
pub mod validation;
