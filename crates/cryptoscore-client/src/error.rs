use chain_sol::{Pubkey, Signature, SolError};
use cryptoscore_layout::{DecodeError, EncodeError, ProgramError, ProgramKind};
use serde::Serialize;
use thiserror::Error;

use crate::transport::{TransactionFailure, TransportError};

/// Machine-checkable class of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Bad arguments, caught before any network call.
    Validation,
    /// Account bytes did not match the expected layout.
    Decode,
    /// Network failure that outlasted the retry policy.
    Transient,
    /// Non-retryable transport failure.
    Network,
    /// The blockhash aged out on every allowed attempt.
    Expired,
    /// A program rejected the transaction.
    Program,
    Signing,
    /// The confirmation poll was cancelled by the caller.
    Cancelled,
    /// Confirmation did not arrive within the configured timeout.
    Timeout,
    NotFound,
    Config,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid argument: {0}")]
    Validation(#[from] EncodeError),

    #[error("could not compose transaction: {0}")]
    Compose(SolError),

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("{operation} failed after {attempts} attempts: {source}")]
    Transient {
        operation: &'static str,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("fee estimation unavailable after {attempts} attempts: {source}")]
    FeeEstimationUnavailable {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("{operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("transaction expired after {refreshes} blockhash refreshes")]
    Expired { refreshes: u32 },

    #[error("{program} program error {error} at instruction {instruction_index}")]
    Program {
        program: ProgramKind,
        instruction_index: u8,
        error: ProgramError,
    },

    #[error("transaction failed: {0}")]
    TransactionFailed(TransactionFailure),

    #[error("signing failed: {0}")]
    Signing(SolError),

    #[error("confirmation of {signature} cancelled; the transaction may still land")]
    Cancelled { signature: Signature },

    #[error("{signature} not confirmed within {timeout_secs}s")]
    ConfirmationTimeout {
        signature: Signature,
        timeout_secs: u64,
    },

    #[error("account {0} not found")]
    AccountNotFound(Pubkey),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation(_) | ClientError::Compose(_) => ErrorKind::Validation,
            ClientError::Decode(_) => ErrorKind::Decode,
            ClientError::Transient { .. } | ClientError::FeeEstimationUnavailable { .. } => {
                ErrorKind::Transient
            }
            ClientError::Transport { .. } => ErrorKind::Network,
            ClientError::Expired { .. } => ErrorKind::Expired,
            ClientError::Program { .. } | ClientError::TransactionFailed(_) => ErrorKind::Program,
            ClientError::Signing(_) => ErrorKind::Signing,
            ClientError::Cancelled { .. } => ErrorKind::Cancelled,
            ClientError::ConfirmationTimeout { .. } => ErrorKind::Timeout,
            ClientError::AccountNotFound(_) => ErrorKind::NotFound,
            ClientError::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether the caller may resubmit the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transient | ErrorKind::Expired)
    }

    /// Attempts made before a transient failure was surfaced.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            ClientError::Transient { attempts, .. }
            | ClientError::FeeEstimationUnavailable { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// The mapped program error, if a program rejected the transaction.
    pub fn program_error(&self) -> Option<ProgramError> {
        match self {
            ClientError::Program { error, .. } => Some(*error),
            _ => None,
        }
    }
}

impl From<SolError> for ClientError {
    fn from(e: SolError) -> Self {
        match e {
            SolError::IncompleteSignatures { .. }
            | SolError::SigningError(_)
            | SolError::InvalidPrivateKey(_) => ClientError::Signing(e),
            SolError::MaxSeedLengthExceeded { .. }
            | SolError::TooManySeeds { .. }
            | SolError::NoValidBumpFound => ClientError::Validation(EncodeError::Address(e)),
            other => ClientError::Compose(other),
        }
    }
}
