//! HTTP route handlers.

pub mod auth;
pub mod cable;
pub mod health;
