//! Fetch-then-decode, one account or many.

use chain_sol::Pubkey;
use cryptoscore_layout::{AccountLayout, DecodeError};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::retry::with_retry;
use crate::transport::{AccountFilter, Transport};

/// One account from a batch. Decode failures stay with their account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched<T> {
    pub address: Pubkey,
    pub record: Result<T, DecodeError>,
}

impl<T> Fetched<T> {
    pub fn ok(self) -> Option<(Pubkey, T)> {
        self.record.ok().map(|record| (self.address, record))
    }
}

/// Split a batch into decoded records and the addresses that failed.
pub fn partition<T>(batch: Vec<Fetched<T>>) -> (Vec<(Pubkey, T)>, Vec<(Pubkey, DecodeError)>) {
    let mut decoded = Vec::new();
    let mut failed = Vec::new();
    for item in batch {
        match item.record {
            Ok(record) => decoded.push((item.address, record)),
            Err(e) => failed.push((item.address, e)),
        }
    }
    (decoded, failed)
}

fn decode_logged<T: AccountLayout>(address: Pubkey, data: &[u8]) -> Fetched<T> {
    let record = T::decode(data);
    if let Err(e) = &record {
        warn!(%address, account = T::NAME, error = %e, "skipping undecodable account");
    }
    Fetched { address, record }
}

/// Fetch and decode a single account.
pub async fn fetch_one<T: AccountLayout>(
    transport: &dyn Transport,
    config: &ClientConfig,
    address: &Pubkey,
) -> Result<T, ClientError> {
    let data = with_retry(&config.retry, "fetch_account", || transport.fetch_account(address))
        .await?
        .ok_or(ClientError::AccountNotFound(*address))?;
    Ok(T::decode(&data)?)
}

/// Fetch many accounts with at most `fetch_concurrency` requests in flight.
///
/// Results come back in input order. Missing accounts are `None`. A failed
/// request or undecodable account affects only its own slot.
pub async fn fetch_many<T: AccountLayout>(
    transport: &dyn Transport,
    config: &ClientConfig,
    addresses: &[Pubkey],
) -> Vec<(Pubkey, Result<Option<T>, ClientError>)> {
    debug!(
        count = addresses.len(),
        concurrency = config.fetch_concurrency,
        account = T::NAME,
        "batch fetch"
    );
    stream::iter(addresses.iter().copied())
        .map(|address| async move {
            let fetched =
                with_retry(&config.retry, "fetch_account", || transport.fetch_account(&address))
                    .await;
            let result = match fetched {
                Ok(Some(data)) => decode_logged::<T>(address, &data)
                    .record
                    .map(Some)
                    .map_err(ClientError::from),
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            };
            (address, result)
        })
        .buffered(config.fetch_concurrency.max(1))
        .collect()
        .await
}

/// Scan `program_id` for accounts of type `T`, narrowed by `extra` filters.
///
/// Size and discriminator filters for `T` are always applied first, so the
/// endpoint only returns candidates of the right kind.
pub async fn scan<T: AccountLayout>(
    transport: &dyn Transport,
    config: &ClientConfig,
    program_id: &Pubkey,
    extra: Vec<AccountFilter>,
) -> Result<Vec<Fetched<T>>, ClientError> {
    let mut filters = vec![
        AccountFilter::DataSize(T::LEN),
        AccountFilter::memcmp(0, T::DISCRIMINATOR),
    ];
    filters.extend(extra);

    let accounts = with_retry(&config.retry, "fetch_program_accounts", || {
        transport.fetch_program_accounts(program_id, &filters)
    })
    .await?;
    debug!(account = T::NAME, found = accounts.len(), "program scan");

    Ok(accounts
        .into_iter()
        .map(|(address, data)| decode_logged::<T>(address, &data))
        .collect())
}
