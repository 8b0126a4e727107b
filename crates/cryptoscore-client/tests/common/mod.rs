//! In-memory ledger that executes CryptoScore instructions.
//!
//! Stands in for an RPC endpoint: transactions are verified, run atomically
//! against a key/value account store and recorded by signature. Faults can
//! be injected per operation.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chain_sol::{Hash, Keypair, Message, Pubkey, Signature, Transaction};
use cryptoscore_client::{
    AccountFilter, ClientConfig, CryptoScoreClient, LatestBlockhash, RetryPolicy,
    TransactionFailure, TransactionStatus, Transport, TransportError,
};
use cryptoscore_layout::program_error::{DashboardError, FactoryError, FrameworkError, MarketError};
use cryptoscore_layout::{
    AccountLayout, CreateMarketArgs, Factory, Market, MarketInstruction, MarketRegistry,
    MarketResult, MarketStatus, MatchOutcome, Participant, ProgramIds,
    UpdateUserStatsArgs, UserStats, MAX_MATCH_ID_LEN,
};

pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;
pub const STARTING_BALANCE: u64 = 10_000_000_000;

/// System program custom codes surfaced by account creation and transfers.
const ACCOUNT_ALREADY_IN_USE: u32 = 0;
const INSUFFICIENT_LAMPORTS: u32 = 1;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn keypair(n: u8) -> Keypair {
    Keypair::from_seed(&[n; 32])
}

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Fast retries and polling so paused-clock tests stay short.
pub fn test_config() -> ClientConfig {
    ClientConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            initial_delay_ms: 10,
            max_delay_ms: 100,
            backoff_multiplier: 2.0,
        },
        poll_interval_ms: 100,
        confirm_timeout_secs: 30,
        ..ClientConfig::default()
    }
}

pub fn client(ledger: &std::sync::Arc<Ledger>) -> CryptoScoreClient<Ledger> {
    CryptoScoreClient::with_shared(ledger.clone(), test_config()).unwrap()
}

/// A market kicking off in an hour and ending an hour later.
pub fn market_args(match_id: &str, entry_fee: u64) -> CreateMarketArgs {
    let now = unix_now();
    CreateMarketArgs {
        match_id: match_id.into(),
        entry_fee,
        kickoff_time: now + 3_600,
        end_time: now + 7_200,
        is_public: true,
    }
}

#[derive(Clone)]
struct StoredAccount {
    owner: Pubkey,
    data: Vec<u8>,
}

#[derive(Default)]
struct Faults {
    /// Remaining transient failures per operation name.
    transient: HashMap<&'static str, u32>,
    /// Accept the next N transactions without ever landing them.
    drop: u32,
    /// Report the next N blockhashes as unknown on send.
    stale: u32,
    /// Report execution failures synchronously from `send_transaction`.
    preflight: bool,
    /// Hold the next N transactions and land them during the following
    /// block height query, which also jumps past their blockhash window.
    land_on_height_check: u32,
}

struct State {
    accounts: HashMap<Pubkey, StoredAccount>,
    lamports: HashMap<Pubkey, u64>,
    clock_offset: i64,
    block_height: u64,
    slot: u64,
    blockhash_window: u64,
    next_blockhash: u64,
    blockhashes: HashMap<Hash, u64>,
    statuses: HashMap<Signature, TransactionStatus>,
    calls: HashMap<&'static str, u32>,
    faults: Faults,
    held: Vec<Transaction>,
}

pub struct Ledger {
    programs: ProgramIds,
    state: Mutex<State>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(ProgramIds::default())
    }
}

impl Ledger {
    pub fn new(programs: ProgramIds) -> Self {
        Self {
            programs,
            state: Mutex::new(State {
                accounts: HashMap::new(),
                lamports: HashMap::new(),
                clock_offset: 0,
                block_height: 1_000,
                slot: 5_000,
                blockhash_window: 150,
                next_blockhash: 1,
                blockhashes: HashMap::new(),
                statuses: HashMap::new(),
                calls: HashMap::new(),
                faults: Faults::default(),
                held: Vec::new(),
            }),
        }
    }

    // ─── Test controls ──────────────────────────────────────────────

    pub fn airdrop(&self, to: &Pubkey, lamports: u64) {
        let mut state = self.state.lock().unwrap();
        *state.lamports.entry(*to).or_default() += lamports;
    }

    pub fn balance(&self, of: &Pubkey) -> u64 {
        let state = self.state.lock().unwrap();
        state.lamports.get(of).copied().unwrap_or(0)
    }

    pub fn advance_clock(&self, secs: i64) {
        self.state.lock().unwrap().clock_offset += secs;
    }

    pub fn now(&self) -> i64 {
        unix_now() + self.state.lock().unwrap().clock_offset
    }

    pub fn fail_next(&self, operation: &'static str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .faults
            .transient
            .insert(operation, times);
    }

    pub fn drop_next(&self, transactions: u32) {
        self.state.lock().unwrap().faults.drop = transactions;
    }

    pub fn stale_next(&self, transactions: u32) {
        self.state.lock().unwrap().faults.stale = transactions;
    }

    pub fn land_on_height_check(&self, transactions: u32) {
        self.state.lock().unwrap().faults.land_on_height_check = transactions;
    }

    pub fn set_preflight(&self, enabled: bool) {
        self.state.lock().unwrap().faults.preflight = enabled;
    }

    pub fn set_blockhash_window(&self, blocks: u64) {
        self.state.lock().unwrap().blockhash_window = blocks;
    }

    pub fn calls(&self, operation: &str) -> u32 {
        let state = self.state.lock().unwrap();
        state.calls.get(operation).copied().unwrap_or(0)
    }

    pub fn status(&self, signature: &Signature) -> Option<TransactionStatus> {
        self.state.lock().unwrap().statuses.get(signature).cloned()
    }

    pub fn landed_transactions(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .statuses
            .values()
            .filter(|s| matches!(s, TransactionStatus::Confirmed { .. }))
            .count()
    }

    /// Store arbitrary bytes, bypassing the programs.
    pub fn put_raw(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        state.accounts.insert(address, StoredAccount { owner, data });
    }

    pub fn raw(&self, address: &Pubkey) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.accounts.get(address).map(|a| a.data.clone())
    }

    // ─── Internals ──────────────────────────────────────────────────

    /// Count the call and consume one injected transient failure, if any.
    fn enter(&self, operation: &'static str) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(operation).or_default() += 1;
        match state.faults.transient.get_mut(operation) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(TransportError::Timeout)
            }
            _ => Ok(()),
        }
    }

    fn process(&self, tx: &Transaction) -> Result<Signature, TransportError> {
        let signature = tx
            .signature()
            .copied()
            .ok_or_else(|| TransportError::Other("unsigned transaction".into()))?;
        tx.verify()
            .map_err(|e| TransportError::Other(format!("signature verification failed: {e}")))?;

        let mut state = self.state.lock().unwrap();
        let now = unix_now() + state.clock_offset;

        if state.faults.stale > 0 {
            state.faults.stale -= 1;
            return Err(TransportError::BlockhashNotFound);
        }
        let height = state.block_height;
        match state.blockhashes.get(&tx.message.recent_blockhash) {
            Some(&last_valid) if height <= last_valid => {}
            _ => return Err(TransportError::BlockhashNotFound),
        }

        if state.statuses.contains_key(&signature) {
            return Ok(signature);
        }
        if state.faults.drop > 0 {
            state.faults.drop -= 1;
            return Ok(signature);
        }
        if state.faults.land_on_height_check > 0 {
            state.faults.land_on_height_check -= 1;
            state.held.push(tx.clone());
            return Ok(signature);
        }

        self.execute(&mut state, tx, signature, now)
    }

    /// Run `tx` atomically and record its status.
    fn execute(
        &self,
        state: &mut State,
        tx: &Transaction,
        signature: Signature,
        now: i64,
    ) -> Result<Signature, TransportError> {
        let accounts_before = state.accounts.clone();
        let lamports_before = state.lamports.clone();
        let mut exec = Executor {
            programs: &self.programs,
            state: &mut *state,
            message: &tx.message,
            now,
        };
        match exec.run() {
            Ok(()) => {
                state.slot += 1;
                let slot = state.slot;
                state
                    .statuses
                    .insert(signature, TransactionStatus::Confirmed { slot });
                Ok(signature)
            }
            Err(failure) => {
                state.accounts = accounts_before;
                state.lamports = lamports_before;
                if state.faults.preflight {
                    return Err(TransportError::Rejected(failure));
                }
                state
                    .statuses
                    .insert(signature, TransactionStatus::Failed(failure));
                Ok(signature)
            }
        }
    }
}

#[async_trait]
impl Transport for Ledger {
    async fn fetch_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, TransportError> {
        self.enter("fetch_account")?;
        Ok(self.raw(address))
    }

    async fn fetch_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, TransportError> {
        self.enter("fetch_program_accounts")?;
        let state = self.state.lock().unwrap();
        let mut found: Vec<_> = state
            .accounts
            .iter()
            .filter(|(_, a)| a.owner == *program_id)
            .filter(|(_, a)| filters.iter().all(|f| f.matches(&a.data)))
            .map(|(k, a)| (*k, a.data.clone()))
            .collect();
        found.sort_by_key(|(k, _)| *k);
        Ok(found)
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<Signature, TransportError> {
        self.enter("send_transaction")?;
        let tx = Transaction::deserialize(wire)
            .map_err(|e| TransportError::Other(format!("malformed transaction: {e}")))?;
        self.process(&tx)
    }

    async fn get_latest_blockhash(&self) -> Result<LatestBlockhash, TransportError> {
        self.enter("get_latest_blockhash")?;
        let mut state = self.state.lock().unwrap();
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&state.next_blockhash.to_le_bytes());
        state.next_blockhash += 1;
        let blockhash = Hash::new(bytes);
        let last_valid_block_height = state.block_height + state.blockhash_window;
        state.blockhashes.insert(blockhash, last_valid_block_height);
        Ok(LatestBlockhash {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn get_fee_for_message(&self, message: &[u8]) -> Result<u64, TransportError> {
        self.enter("get_fee_for_message")?;
        let message = Message::deserialize(message)
            .map_err(|e| TransportError::Other(format!("malformed message: {e}")))?;
        Ok(LAMPORTS_PER_SIGNATURE * u64::from(message.num_required_signatures))
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<TransactionStatus, TransportError> {
        self.enter("get_signature_status")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .statuses
            .get(signature)
            .cloned()
            .unwrap_or(TransactionStatus::Pending))
    }

    /// Each query advances the chain by one block.
    async fn get_block_height(&self) -> Result<u64, TransportError> {
        self.enter("get_block_height")?;
        let mut state = self.state.lock().unwrap();
        state.block_height += 1;
        let now = unix_now() + state.clock_offset;
        for tx in std::mem::take(&mut state.held) {
            let Some(signature) = tx.signature().copied() else {
                continue;
            };
            if let Some(&last_valid) = state.blockhashes.get(&tx.message.recent_blockhash) {
                state.block_height = state.block_height.max(last_valid + 1);
            }
            let _ = self.execute(&mut state, &tx, signature, now);
        }
        Ok(state.block_height)
    }
}

// ─── Program execution ──────────────────────────────────────────────────

struct Executor<'a> {
    programs: &'a ProgramIds,
    state: &'a mut State,
    message: &'a Message,
    now: i64,
}

/// Accounts of one instruction as (key, is_signer).
struct Accounts(Vec<(Pubkey, bool)>);

impl Accounts {
    fn key(&self, i: usize) -> Result<Pubkey, u32> {
        self.0
            .get(i)
            .map(|(k, _)| *k)
            .ok_or(FrameworkError::InstructionDidNotDeserialize.code())
    }

    fn signer(&self, i: usize) -> Result<Pubkey, u32> {
        match self.0.get(i) {
            Some((k, true)) => Ok(*k),
            _ => Err(FrameworkError::ConstraintSigner.code()),
        }
    }
}

impl Executor<'_> {
    fn run(&mut self) -> Result<(), TransactionFailure> {
        let message = self.message;
        for (index, ix) in message.instructions.iter().enumerate() {
            let fail = |code| TransactionFailure::Custom {
                instruction_index: index as u8,
                code,
            };
            let program_id = message.account_keys[usize::from(ix.program_id_index)];
            let accounts = Accounts(
                ix.account_indices
                    .iter()
                    .map(|&i| {
                        let i = usize::from(i);
                        (
                            message.account_keys[i],
                            i < usize::from(message.num_required_signatures),
                        )
                    })
                    .collect(),
            );
            let Some(program) = self.programs.kind_of(&program_id) else {
                return Err(TransactionFailure::Other(format!(
                    "program {program_id} is not deployed"
                )));
            };
            let instruction = MarketInstruction::decode(&ix.data)
                .map_err(|_| fail(FrameworkError::InstructionDidNotDeserialize.code()))?;
            if instruction.program() != program {
                return Err(fail(FrameworkError::InstructionFallbackNotFound.code()));
            }
            self.execute(instruction, &accounts).map_err(fail)?;
        }
        Ok(())
    }

    fn execute(&mut self, instruction: MarketInstruction, accounts: &Accounts) -> Result<(), u32> {
        match instruction {
            MarketInstruction::InitializeFactory { platform_fee_bps } => {
                self.initialize_factory(accounts, platform_fee_bps)
            }
            MarketInstruction::InitializeMarket(args) => self.initialize_market(accounts, &args),
            MarketInstruction::CreateMarket(args) => self.register_market(accounts, &args),
            MarketInstruction::JoinMarket { prediction } => self.join_market(accounts, prediction),
            MarketInstruction::ResolveMarket { outcome } => self.resolve_market(accounts, outcome),
            MarketInstruction::WithdrawRewards => self.withdraw_rewards(accounts),
            MarketInstruction::UpdateUserStats(args) => self.update_user_stats(accounts, args),
        }
    }

    fn load<T: AccountLayout>(&self, key: &Pubkey) -> Result<T, u32> {
        let account = self
            .state
            .accounts
            .get(key)
            .ok_or(FrameworkError::AccountNotInitialized.code())?;
        T::decode(&account.data).map_err(|_| FrameworkError::AccountDidNotDeserialize.code())
    }

    fn store<T: AccountLayout>(&mut self, key: Pubkey, owner: Pubkey, record: &T) {
        self.state.accounts.insert(
            key,
            StoredAccount {
                owner,
                data: record.to_account_bytes(),
            },
        );
    }

    fn create<T: AccountLayout>(&mut self, key: Pubkey, owner: Pubkey, record: &T) -> Result<(), u32> {
        if self.state.accounts.contains_key(&key) {
            return Err(ACCOUNT_ALREADY_IN_USE);
        }
        self.store(key, owner, record);
        Ok(())
    }

    fn expect_address(&self, actual: &Pubkey, derived: Result<(Pubkey, u8), chain_sol::SolError>) -> Result<u8, u32> {
        match derived {
            Ok((expected, bump)) if expected == *actual => Ok(bump),
            _ => Err(FrameworkError::ConstraintSeeds.code()),
        }
    }

    fn transfer(&mut self, from: &Pubkey, to: &Pubkey, lamports: u64, shortfall: u32) -> Result<(), u32> {
        let balance = self.state.lamports.get(from).copied().unwrap_or(0);
        let remaining = balance.checked_sub(lamports).ok_or(shortfall)?;
        self.state.lamports.insert(*from, remaining);
        *self.state.lamports.entry(*to).or_default() += lamports;
        Ok(())
    }

    // -- factory ---------------------------------------------------------

    fn initialize_factory(&mut self, accounts: &Accounts, platform_fee_bps: u16) -> Result<(), u32> {
        let factory = accounts.key(0)?;
        let authority = accounts.signer(1)?;
        let bump = self.expect_address(&factory, self.programs.factory_address())?;
        if platform_fee_bps > Factory::MAX_PLATFORM_FEE_BPS {
            return Err(FactoryError::InvalidPlatformFee.code());
        }
        let record = Factory {
            authority,
            market_count: 0,
            platform_fee_bps,
            bump,
        };
        self.create(factory, self.programs.factory, &record)
    }

    fn register_market(&mut self, accounts: &Accounts, args: &CreateMarketArgs) -> Result<(), u32> {
        let factory_key = accounts.key(0)?;
        let registry = accounts.key(1)?;
        let market = accounts.key(2)?;
        let creator = accounts.signer(3)?;

        if args.match_id.is_empty() {
            return Err(FactoryError::InvalidMatchId.code());
        }
        if args.match_id.len() > MAX_MATCH_ID_LEN {
            return Err(FactoryError::MatchIdTooLong.code());
        }
        if args.entry_fee == 0 {
            return Err(FactoryError::ZeroEntryFee.code());
        }
        if args.kickoff_time <= self.now {
            return Err(FactoryError::InvalidKickoffTime.code());
        }
        if args.end_time <= args.kickoff_time {
            return Err(FactoryError::InvalidEndTime.code());
        }

        let mut factory: Factory = self.load(&factory_key)?;
        let bump = self.expect_address(
            &registry,
            self.programs
                .market_registry_address(&factory_key, &args.match_id),
        )?;
        let entry = MarketRegistry {
            factory: factory_key,
            market_address: market,
            creator,
            match_id: args.match_id.clone(),
            created_at: self.now,
            is_public: args.is_public,
            entry_fee: args.entry_fee,
            kickoff_time: args.kickoff_time,
            end_time: args.end_time,
            bump,
        };
        self.create(registry, self.programs.factory, &entry)?;

        factory.market_count = factory
            .market_count
            .checked_add(1)
            .ok_or(FactoryError::MarketCountOverflow.code())?;
        self.store(factory_key, self.programs.factory, &factory);
        Ok(())
    }

    // -- market ----------------------------------------------------------

    fn initialize_market(&mut self, accounts: &Accounts, args: &CreateMarketArgs) -> Result<(), u32> {
        let market = accounts.key(0)?;
        let factory = accounts.key(1)?;
        let creator = accounts.signer(2)?;

        if args.match_id.is_empty() {
            return Err(MarketError::InvalidMatchId.code());
        }
        if args.match_id.len() > MAX_MATCH_ID_LEN {
            return Err(MarketError::MatchIdTooLong.code());
        }
        if args.entry_fee == 0 {
            return Err(MarketError::ZeroEntryFee.code());
        }
        if args.kickoff_time <= self.now {
            return Err(MarketError::InvalidKickoffTime.code());
        }
        if args.end_time <= args.kickoff_time {
            return Err(MarketError::InvalidEndTime.code());
        }
        let bump = self.expect_address(
            &market,
            self.programs.market_address(&factory, &args.match_id),
        )?;

        let record = Market {
            factory,
            creator,
            match_id: args.match_id.clone(),
            entry_fee: args.entry_fee,
            kickoff_time: args.kickoff_time,
            end_time: args.end_time,
            status: MarketStatus::Open,
            outcome: None,
            total_pool: 0,
            participant_count: 0,
            home_count: 0,
            draw_count: 0,
            away_count: 0,
            is_public: args.is_public,
            bump,
        };
        self.create(market, self.programs.market, &record)
    }

    fn join_market(&mut self, accounts: &Accounts, prediction: MatchOutcome) -> Result<(), u32> {
        let market_key = accounts.key(0)?;
        let participant = accounts.key(1)?;
        let user = accounts.signer(2)?;

        let mut market: Market = self.load(&market_key)?;
        if market.status != MarketStatus::Open {
            return Err(MarketError::MarketNotOpen.code());
        }
        if self.now >= market.kickoff_time {
            return Err(MarketError::MarketAlreadyStarted.code());
        }
        let bump = self.expect_address(
            &participant,
            self.programs.participant_address(&market_key, &user),
        )?;

        let record = Participant {
            market: market_key,
            user,
            prediction,
            joined_at: self.now,
            has_withdrawn: false,
            bump,
        };
        self.create(participant, self.programs.market, &record)?;
        self.transfer(&user, &market_key, market.entry_fee, INSUFFICIENT_LAMPORTS)?;

        market.total_pool = market
            .total_pool
            .checked_add(market.entry_fee)
            .ok_or(MarketError::PoolOverflow.code())?;
        market.participant_count = market
            .participant_count
            .checked_add(1)
            .ok_or(MarketError::ParticipantOverflow.code())?;
        let count = match prediction {
            MatchOutcome::Home => &mut market.home_count,
            MatchOutcome::Draw => &mut market.draw_count,
            MatchOutcome::Away => &mut market.away_count,
        };
        *count = count.checked_add(1).ok_or(MarketError::CountOverflow.code())?;
        self.store(market_key, self.programs.market, &market);
        Ok(())
    }

    fn resolve_market(&mut self, accounts: &Accounts, outcome: MatchOutcome) -> Result<(), u32> {
        let market_key = accounts.key(0)?;
        let creator = accounts.signer(1)?;

        let mut market: Market = self.load(&market_key)?;
        if market.creator != creator {
            return Err(MarketError::UnauthorizedResolver.code());
        }
        if market.status == MarketStatus::Resolved {
            return Err(MarketError::MarketAlreadyResolved.code());
        }
        if self.now < market.end_time {
            return Err(MarketError::MarketNotEnded.code());
        }
        market.status = MarketStatus::Resolved;
        market.outcome = Some(outcome);
        self.store(market_key, self.programs.market, &market);
        Ok(())
    }

    fn withdraw_rewards(&mut self, accounts: &Accounts) -> Result<(), u32> {
        let market_key = accounts.key(0)?;
        let participant_key = accounts.key(1)?;
        let user = accounts.signer(2)?;

        let market: Market = self.load(&market_key)?;
        let mut participant: Participant = self.load(&participant_key)?;
        if participant.user != user || participant.market != market_key {
            return Err(FrameworkError::ConstraintSeeds.code());
        }
        if market.status != MarketStatus::Resolved {
            return Err(MarketError::MarketNotResolved.code());
        }
        if participant.has_withdrawn {
            return Err(MarketError::AlreadyWithdrawn.code());
        }
        let outcome = market.outcome.ok_or(MarketError::NoOutcome.code())?;
        if participant.prediction != outcome {
            return Err(MarketError::NotAWinner.code());
        }
        let winners = market.count_for(outcome);
        if winners == 0 {
            return Err(MarketError::NoWinners.code());
        }

        let reward = expected_reward(market.total_pool, winners);
        self.transfer(
            &market_key,
            &user,
            reward,
            MarketError::InsufficientFunds.code(),
        )?;
        participant.has_withdrawn = true;
        self.store(participant_key, self.programs.market, &participant);
        Ok(())
    }

    // -- dashboard -------------------------------------------------------

    fn update_user_stats(&mut self, accounts: &Accounts, args: UpdateUserStatsArgs) -> Result<(), u32> {
        let stats_key = accounts.key(0)?;
        let user = accounts.signer(1)?;
        let bump = self.expect_address(&stats_key, self.programs.user_stats_address(&user))?;

        let mut stats = if self.state.accounts.contains_key(&stats_key) {
            self.load::<UserStats>(&stats_key)?
        } else {
            UserStats {
                user,
                total_markets: 0,
                wins: 0,
                losses: 0,
                total_wagered: 0,
                total_won: 0,
                current_streak: 0,
                best_streak: 0,
                last_updated: 0,
                bump,
            }
        };

        let overflow = DashboardError::StatOverflow.code();
        stats.total_markets = stats.total_markets.checked_add(1).ok_or(overflow)?;
        stats.total_wagered = stats
            .total_wagered
            .checked_add(args.amount_wagered)
            .ok_or(overflow)?;
        match args.market_result {
            MarketResult::Win => {
                stats.wins = stats.wins.checked_add(1).ok_or(overflow)?;
                stats.total_won = stats.total_won.checked_add(args.amount_won).ok_or(overflow)?;
                stats.current_streak = if stats.current_streak >= 0 {
                    stats.current_streak.checked_add(1).ok_or(overflow)?
                } else {
                    1
                };
                stats.best_streak = stats.best_streak.max(stats.current_streak as u32);
            }
            MarketResult::Loss => {
                stats.losses = stats.losses.checked_add(1).ok_or(overflow)?;
                stats.current_streak = if stats.current_streak <= 0 {
                    stats.current_streak.checked_sub(1).ok_or(overflow)?
                } else {
                    -1
                };
            }
        }
        stats.last_updated = self.now;
        self.store(stats_key, self.programs.dashboard, &stats);
        Ok(())
    }
}

/// Payout per winner: the pool less a 1% creator and a 1% platform cut.
pub fn expected_reward(total_pool: u64, winners: u32) -> u64 {
    let creator_fee = total_pool * 100 / 10_000;
    let platform_fee = total_pool * 100 / 10_000;
    (total_pool - creator_fee - platform_fee) / u64::from(winners)
}
