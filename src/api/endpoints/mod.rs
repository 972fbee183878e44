//! API endpoint handlers.
//!
//! Blocking work (password hashing, inference, PDF rendering, SQLite)
//! runs on the blocking pool via `spawn_blocking`.

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod patients;
pub mod predict;
pub mod reports;
pub mod uploads;
