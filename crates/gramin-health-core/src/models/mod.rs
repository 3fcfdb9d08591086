//! Domain models for the gramin-health system.

mod patient;
mod reading;
mod triage;

pub use patient::*;
pub use reading::*;
pub use triage::*;
