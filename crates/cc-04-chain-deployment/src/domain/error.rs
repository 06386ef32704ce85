//! Error types for chain deployment.

use cc_03_dkg::DkgError;
use std::fmt;
use thiserror::Error;

/// Workflow step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeploymentStep {
    Validate,
    Dkg,
    PutCommitteeRecord,
    FetchOutputs,
    OriginTransaction,
    PutChainRecord,
    ActivateChain,
    RefetchOutputs,
    RootInitRequest,
    AwaitProcessing,
}

impl fmt::Display for DeploymentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validate => "validate parameters",
            Self::Dkg => "run DKG",
            Self::PutCommitteeRecord => "put committee record",
            Self::FetchOutputs => "fetch outputs",
            Self::OriginTransaction => "origin transaction",
            Self::PutChainRecord => "put chain record",
            Self::ActivateChain => "activate chain",
            Self::RefetchOutputs => "re-fetch outputs",
            Self::RootInitRequest => "root init request",
            Self::AwaitProcessing => "await processing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeploymentError {
    #[error("Invalid deployment parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("DKG failed: {0}")]
    Dkg(#[from] DkgError),

    #[error("Committee record rejected by {endpoint}: {reason}")]
    CommitteeRecordDistributionFailed { endpoint: String, reason: String },

    #[error("Fetching outputs failed ({step}): {reason}")]
    OutputFetchFailed {
        step: DeploymentStep,
        reason: String,
    },

    #[error("Origin transaction failed: {reason}")]
    OriginTransactionFailed { reason: String },

    #[error("Chain record rejected by {endpoint}: {reason}")]
    ChainRecordDistributionFailed { endpoint: String, reason: String },

    #[error("Chain activation failed on {endpoint}: {reason}")]
    ChainActivationFailed { endpoint: String, reason: String },

    #[error("Root init request failed: {reason}")]
    RootInitFailed { reason: String },

    #[error("Root init request not processed by: {pending:?}")]
    QuorumProcessingTimeout { pending: Vec<String> },
}

impl DeploymentError {
    /// Step the workflow was in when it failed.
    pub fn step(&self) -> DeploymentStep {
        match self {
            Self::InvalidParameters { .. } => DeploymentStep::Validate,
            Self::Dkg(_) => DeploymentStep::Dkg,
            Self::CommitteeRecordDistributionFailed { .. } => DeploymentStep::PutCommitteeRecord,
            Self::OutputFetchFailed { step, .. } => *step,
            Self::OriginTransactionFailed { .. } => DeploymentStep::OriginTransaction,
            Self::ChainRecordDistributionFailed { .. } => DeploymentStep::PutChainRecord,
            Self::ChainActivationFailed { .. } => DeploymentStep::ActivateChain,
            Self::RootInitFailed { .. } => DeploymentStep::RootInitRequest,
            Self::QuorumProcessingTimeout { .. } => DeploymentStep::AwaitProcessing,
        }
    }
}

pub type DeploymentResult<T> = Result<T, DeploymentError>;
