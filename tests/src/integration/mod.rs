//! Integration scenarios spanning several committee crates.

#[cfg(test)]
mod fixtures;

pub mod committee_consensus;
pub mod deployment_flow;
pub mod wire_compat;
