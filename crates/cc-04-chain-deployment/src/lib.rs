//! # Chain Deployment (cc-04)
//!
//! Brings a new chain into existence for a committee:
//!
//! ```text
//!  1. put CommitteeRecord ──→ every node API
//!  2. fetch originator outputs ←── ledger
//!  3. origin tx (anchor at control address) ──→ ledger, wait for confirmation
//!  4. put ChainRecord ──→ every node API
//!  5. activate chain ──→ every node API
//!  6. re-fetch originator outputs ←── ledger
//!  7. root-init request tx ──→ ledger, wait for confirmation
//!  8. poll every node until the root-init request is processed
//! ```
//!
//! Steps run strictly in order. The first failure aborts the workflow with an
//! error naming the step; nothing is rolled back.

pub mod config;
pub mod domain;
pub mod ports;
pub mod progress;
pub mod service;

pub use config::{CommitteeConfig, ConfigError};
pub use domain::error::{DeploymentError, DeploymentResult, DeploymentStep};
pub use domain::transaction::{
    chain_origin_transaction, originator_address, root_init_request_transaction, LedgerOutput,
    Transaction, TxOutput, DESCRIPTION_VARIABLE, ROOT_INIT_REQUEST_CODE,
};
pub use ports::{LedgerClient, NodeApiClient, SystemTimeSource, TimeSource};
pub use progress::{NullProgress, ProgressSink, TracingProgress, WriterProgress};
pub use service::{ChainDeployer, CreateChainParams};
