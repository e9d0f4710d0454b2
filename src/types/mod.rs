//! Core types: type-safe vector spaces, angle arithmetic, sensor readings

pub mod angles;
pub mod measurement;
pub mod spaces;
