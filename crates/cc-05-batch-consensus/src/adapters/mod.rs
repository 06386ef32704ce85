//! Adapters layer (Hexagonal Architecture)

mod peering;

pub use peering::*;
