//! CLI command implementations.

pub mod specs;
