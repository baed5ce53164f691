//! Helper utilities for integration tests.

pub mod assertions;
pub mod data_generator;

pub use assertions::*;
pub use data_generator::*;
