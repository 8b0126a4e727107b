//! Async client for the CryptoScore prediction-market programs.
//!
//! [`CryptoScoreClient`] wraps a [`Transport`] with retrying reads, batch
//! fetches and the full submit pipeline in [`TransactionBuilder`]. Account
//! and instruction layouts come from `cryptoscore-layout`.

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod retry;
pub mod transport;

pub use builder::{FeeEstimate, SubmitOutcome, TransactionBuilder, TxState};
pub use client::CryptoScoreClient;
pub use config::{ClientConfig, Cluster, RetryPolicy};
pub use error::{ClientError, ErrorKind};
pub use fetch::{partition, Fetched};
pub use transport::{
    AccountFilter, LatestBlockhash, TransactionFailure, TransactionStatus, Transport,
    TransportError,
};

pub use tokio_util::sync::CancellationToken;
