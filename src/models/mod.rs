pub mod doctor;
pub mod patient;

pub use doctor::*;
pub use patient::*;
