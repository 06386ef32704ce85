//! # Shared Types Crate
//!
//! Identifiers, wire helpers and records shared by every committee subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all cross-subsystem types are defined here.
//! - **Fixed Widths**: identifiers have a fixed byte layout and compare byte-wise.
//! - **Bounded Reads**: decoding goes through [`wire::WireReader`], which checks
//!   lengths before interpreting bytes.

pub mod entities;
pub mod errors;
pub mod hashing;
pub mod identifiers;
pub mod wire;

pub use entities::*;
pub use errors::*;
pub use hashing::{hash_data, random_hash};
pub use identifiers::*;
pub use wire::{WireReader, WireWrite};
