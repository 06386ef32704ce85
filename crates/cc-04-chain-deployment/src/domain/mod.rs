//! Domain layer for chain deployment.

pub mod error;
pub mod transaction;
