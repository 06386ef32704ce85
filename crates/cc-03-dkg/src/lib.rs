//! # DKG Orchestrator (cc-03)
//!
//! Asks one committee node to run distributed key generation and returns the
//! resulting threshold control address.
//!
//! ```text
//! [Deployment] ──run_dkg──→ [DkgOrchestrator] ──post_dk_shares──→ [random initiator node]
//!                                   ↑                                    │
//!                                   └──────── DkSharesInfo.address ──────┘
//! ```
//!
//! The initiator coordinates the protocol with the other peers; this crate
//! only picks it, bounds the wait and validates the answer.

pub mod error;
pub mod orchestrator;
pub mod ports;

pub use error::{DkgError, DkgResult};
pub use orchestrator::{effective_timeout_ms, DkgOrchestrator, DEFAULT_DKG_TIMEOUT_MS};
pub use ports::{DkSharesInfo, DkSharesPostRequest, DkgClientError, DkgNodeClient};
