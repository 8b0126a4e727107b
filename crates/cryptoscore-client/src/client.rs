use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chain_sol::{Instruction, Keypair, Pubkey};
use cryptoscore_layout::instructions;
use cryptoscore_layout::{
    CreateMarketArgs, Factory, Market, MarketRegistry, MatchOutcome, Participant,
    UpdateUserStatsArgs, UserStats,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::builder::{FeeEstimate, SubmitOutcome, TransactionBuilder};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::fetch::{self, Fetched};
use crate::transport::{AccountFilter, Transport};

/// Entry point for reading and mutating CryptoScore state.
///
/// Cloning is cheap; clones share the transport.
pub struct CryptoScoreClient<T> {
    transport: Arc<T>,
    config: ClientConfig,
}

impl<T> Clone for CryptoScoreClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
        }
    }
}

impl<T: Transport> CryptoScoreClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_shared(Arc::new(transport), config)
    }

    pub fn with_shared(transport: Arc<T>, config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -- Addresses -------------------------------------------------------------

    pub fn factory_address(&self) -> Result<Pubkey, ClientError> {
        Ok(self.config.programs.factory_address()?.0)
    }

    pub fn market_address(&self, match_id: &str) -> Result<Pubkey, ClientError> {
        let factory = self.factory_address()?;
        Ok(self.config.programs.market_address(&factory, match_id)?.0)
    }

    pub fn market_registry_address(&self, match_id: &str) -> Result<Pubkey, ClientError> {
        let factory = self.factory_address()?;
        Ok(self.config.programs.market_registry_address(&factory, match_id)?.0)
    }

    pub fn participant_address(&self, market: &Pubkey, user: &Pubkey) -> Result<Pubkey, ClientError> {
        Ok(self.config.programs.participant_address(market, user)?.0)
    }

    pub fn user_stats_address(&self, user: &Pubkey) -> Result<Pubkey, ClientError> {
        Ok(self.config.programs.user_stats_address(user)?.0)
    }

    // -- Transactions ----------------------------------------------------------

    pub fn builder(&self, fee_payer: Pubkey) -> TransactionBuilder<'_> {
        TransactionBuilder::new(&*self.transport, &self.config, fee_payer)
    }

    /// Price `instructions` without sending them.
    pub async fn estimate_fee(
        &self,
        fee_payer: &Pubkey,
        instructions: Vec<Instruction>,
    ) -> Result<FeeEstimate, ClientError> {
        let mut builder = self.builder(*fee_payer);
        builder.add_instructions(instructions);
        builder.estimate_fee().await
    }

    /// Send `instructions` paid for by the first signer, with a
    /// caller-controlled confirmation cancel.
    pub async fn send_cancellable(
        &self,
        instructions: Vec<Instruction>,
        signers: &[&Keypair],
        cancel: &CancellationToken,
    ) -> Result<SubmitOutcome, ClientError> {
        let payer = signers
            .first()
            .ok_or_else(|| ClientError::Config("at least one signer is required".into()))?;
        let mut builder = self.builder(payer.pubkey());
        builder.add_instructions(instructions);
        builder.send_and_confirm(signers, cancel).await
    }

    pub async fn send(
        &self,
        instructions: Vec<Instruction>,
        signers: &[&Keypair],
    ) -> Result<SubmitOutcome, ClientError> {
        self.send_cancellable(instructions, signers, &CancellationToken::new())
            .await
    }

    pub async fn initialize_factory(
        &self,
        authority: &Keypair,
        platform_fee_bps: u16,
    ) -> Result<SubmitOutcome, ClientError> {
        let ix = instructions::initialize_factory(
            &self.config.programs,
            &authority.pubkey(),
            platform_fee_bps,
        )?;
        self.send(vec![ix], &[authority]).await
    }

    /// Create the market and its registry entry in one transaction.
    /// Returns the new market address.
    pub async fn create_market(
        &self,
        creator: &Keypair,
        args: &CreateMarketArgs,
    ) -> Result<(Pubkey, SubmitOutcome), ClientError> {
        args.validate()?;
        args.validate_schedule(unix_now())?;
        let [init, register] =
            instructions::create_market(&self.config.programs, &creator.pubkey(), args)?;
        let market = self.market_address(&args.match_id)?;
        let outcome = self.send(vec![init, register], &[creator]).await?;
        info!(%market, match_id = %args.match_id, "market created");
        Ok((market, outcome))
    }

    pub async fn join_market(
        &self,
        user: &Keypair,
        market: &Pubkey,
        prediction: MatchOutcome,
    ) -> Result<SubmitOutcome, ClientError> {
        let ix = instructions::join_market(&self.config.programs, market, &user.pubkey(), prediction)?;
        self.send(vec![ix], &[user]).await
    }

    pub async fn resolve_market(
        &self,
        creator: &Keypair,
        market: &Pubkey,
        outcome: MatchOutcome,
    ) -> Result<SubmitOutcome, ClientError> {
        let ix = instructions::resolve_market(&self.config.programs, market, &creator.pubkey(), outcome)?;
        self.send(vec![ix], &[creator]).await
    }

    pub async fn withdraw_rewards(
        &self,
        user: &Keypair,
        market: &Pubkey,
    ) -> Result<SubmitOutcome, ClientError> {
        let ix = instructions::withdraw_rewards(&self.config.programs, market, &user.pubkey())?;
        self.send(vec![ix], &[user]).await
    }

    pub async fn update_user_stats(
        &self,
        user: &Keypair,
        args: UpdateUserStatsArgs,
    ) -> Result<SubmitOutcome, ClientError> {
        let ix = instructions::update_user_stats(&self.config.programs, &user.pubkey(), args)?;
        self.send(vec![ix], &[user]).await
    }

    // -- Single accounts -------------------------------------------------------

    pub async fn fetch_factory(&self) -> Result<Factory, ClientError> {
        let address = self.factory_address()?;
        fetch::fetch_one(&*self.transport, &self.config, &address).await
    }

    pub async fn fetch_market(&self, address: &Pubkey) -> Result<Market, ClientError> {
        fetch::fetch_one(&*self.transport, &self.config, address).await
    }

    pub async fn fetch_market_registry(&self, address: &Pubkey) -> Result<MarketRegistry, ClientError> {
        fetch::fetch_one(&*self.transport, &self.config, address).await
    }

    pub async fn fetch_participant(&self, address: &Pubkey) -> Result<Participant, ClientError> {
        fetch::fetch_one(&*self.transport, &self.config, address).await
    }

    /// Stats live at an address derived from the user.
    pub async fn fetch_user_stats(&self, user: &Pubkey) -> Result<UserStats, ClientError> {
        let address = self.user_stats_address(user)?;
        fetch::fetch_one(&*self.transport, &self.config, &address).await
    }

    // -- Batches ---------------------------------------------------------------

    pub async fn fetch_many_markets(
        &self,
        addresses: &[Pubkey],
    ) -> Vec<(Pubkey, Result<Option<Market>, ClientError>)> {
        fetch::fetch_many(&*self.transport, &self.config, addresses).await
    }

    pub async fn fetch_all_markets(&self) -> Result<Vec<Fetched<Market>>, ClientError> {
        fetch::scan(&*self.transport, &self.config, &self.config.programs.market, vec![]).await
    }

    pub async fn fetch_markets_by_creator(
        &self,
        creator: &Pubkey,
    ) -> Result<Vec<Fetched<Market>>, ClientError> {
        let filter = AccountFilter::memcmp(Market::CREATOR_OFFSET, creator.to_bytes());
        fetch::scan(
            &*self.transport,
            &self.config,
            &self.config.programs.market,
            vec![filter],
        )
        .await
    }

    pub async fn fetch_participants_by_user(
        &self,
        user: &Pubkey,
    ) -> Result<Vec<Fetched<Participant>>, ClientError> {
        let filter = AccountFilter::memcmp(Participant::USER_OFFSET, user.to_bytes());
        fetch::scan(
            &*self.transport,
            &self.config,
            &self.config.programs.market,
            vec![filter],
        )
        .await
    }

    pub async fn fetch_participants_by_market(
        &self,
        market: &Pubkey,
    ) -> Result<Vec<Fetched<Participant>>, ClientError> {
        let filter = AccountFilter::memcmp(Participant::MARKET_OFFSET, market.to_bytes());
        fetch::scan(
            &*self.transport,
            &self.config,
            &self.config.programs.market,
            vec![filter],
        )
        .await
    }

    pub async fn fetch_registry_entries(&self) -> Result<Vec<Fetched<MarketRegistry>>, ClientError> {
        fetch::scan(&*self.transport, &self.config, &self.config.programs.factory, vec![]).await
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
