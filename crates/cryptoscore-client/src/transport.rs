//! The network interface the client consumes.
//!
//! No concrete RPC implementation lives here. Callers plug in their own
//! HTTP or websocket client behind [`Transport`]; tests use an in-memory
//! ledger.

use std::fmt;

use async_trait::async_trait;
use chain_sol::{Hash, Pubkey, Signature};
use cryptoscore_layout::AccountKind;
use serde::Serialize;
use thiserror::Error;

/// Server-side narrowing of a program account scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AccountFilter {
    /// Account data is exactly this many bytes.
    DataSize(usize),
    /// `bytes` appear at `offset` in the account data.
    Memcmp { offset: usize, bytes: Vec<u8> },
}

impl AccountFilter {
    pub fn memcmp(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        AccountFilter::Memcmp {
            offset,
            bytes: bytes.into(),
        }
    }

    /// Size and discriminator filters selecting every account of `kind`.
    pub fn for_kind(kind: AccountKind) -> Vec<AccountFilter> {
        vec![
            AccountFilter::DataSize(kind.len()),
            AccountFilter::memcmp(0, kind.discriminator()),
        ]
    }

    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            AccountFilter::DataSize(len) => data.len() == *len,
            AccountFilter::Memcmp { offset, bytes } => offset
                .checked_add(bytes.len())
                .and_then(|end| data.get(*offset..end))
                .is_some_and(|window| window == bytes.as_slice()),
        }
    }
}

/// A recent blockhash and the last block height at which it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestBlockhash {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Why the ledger refused or failed a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransactionFailure {
    /// A program returned a numeric error code.
    Custom { instruction_index: u8, code: u32 },
    /// Any other execution failure, verbatim.
    Other(String),
}

impl fmt::Display for TransactionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionFailure::Custom {
                instruction_index,
                code,
            } => write!(f, "instruction {instruction_index} failed with custom error {code}"),
            TransactionFailure::Other(reason) => f.write_str(reason),
        }
    }
}

/// Ledger view of a submitted signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Confirmed { slot: u64 },
    Failed(TransactionFailure),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited by endpoint")]
    RateLimited,

    #[error("endpoint unavailable: {0}")]
    Unavailable(String),

    #[error("blockhash not found")]
    BlockhashNotFound,

    #[error("transaction rejected: {0}")]
    Rejected(TransactionFailure),

    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Failures worth retrying unchanged after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout | TransportError::RateLimited | TransportError::Unavailable(_)
        )
    }
}

/// Read and submit operations against a ledger endpoint.
///
/// Implementations are shared across concurrent operations and must not
/// require `&mut self`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Raw account data, or `None` if the account does not exist.
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, TransportError>;

    /// Every account owned by `program_id` that passes all `filters`.
    async fn fetch_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, TransportError>;

    /// Broadcast a signed wire-format transaction.
    async fn send_transaction(&self, wire: &[u8]) -> Result<Signature, TransportError>;

    async fn get_latest_blockhash(&self) -> Result<LatestBlockhash, TransportError>;

    /// Fee in lamports for a serialized message.
    async fn get_fee_for_message(&self, message: &[u8]) -> Result<u64, TransportError>;

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<TransactionStatus, TransportError>;

    async fn get_block_height(&self) -> Result<u64, TransportError>;
}
