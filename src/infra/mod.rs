//! Infrastructure adapters: the two REST collaborators and runtime bootstrap.

pub mod confluence;
pub mod error;
pub mod figma;
pub mod telemetry;
