//! Repository layer: entity-scoped database operations.
//!
//! Functions take a borrowed `Connection` so callers decide whether they
//! run inside a transaction (`Transaction` derefs to `Connection`).

mod doctor;
mod patient;

pub use doctor::*;
pub use patient::*;
