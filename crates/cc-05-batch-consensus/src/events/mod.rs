//! Events layer
//!
//! - consumed: inputs of the round actor
//! - published: events and status observed by the rest of the node

mod consumed;
mod published;

pub use consumed::*;
pub use published::*;
