//! # Committee-Chain Test Suite
//!
//! Cross-crate scenarios. Unit tests live next to the code in each crate.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs           # logging and shared helpers
//!     ├── wire_compat.rs        # pinned byte layouts through the peering envelope
//!     ├── deployment_flow.rs    # DKG + deployment against a simulated ledger
//!     └── committee_consensus.rs# several chains over one peering network
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cc-tests
//! cargo test -p cc-tests integration::deployment_flow::
//! ```

pub mod integration;
