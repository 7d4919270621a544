//! Core domain model and contracts for Lodestar.

pub mod benchmark;
pub mod botec;
pub mod error;
pub mod evidence;
pub mod idea;
pub mod sources;

pub use error::*;
