//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Rate limiter: per-client request budget
//! 2. Session validator: cookie or bearer token
//! 3. Audit logger: runs inside the session layer, so the username is known

pub mod audit;
pub mod auth;
pub mod rate;
