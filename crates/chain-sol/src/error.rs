use thiserror::Error;

/// Solana primitive errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("seed {index} is {len} bytes, max is {max}")]
    MaxSeedLengthExceeded { index: usize, len: usize, max: usize },

    #[error("too many seeds: {count}, max is {max}")]
    TooManySeeds { count: usize, max: usize },

    #[error("no valid bump seed found for program address")]
    NoValidBumpFound,

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("missing signatures for required signers: {}", .missing.join(", "))]
    IncompleteSignatures { missing: Vec<String> },

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}
