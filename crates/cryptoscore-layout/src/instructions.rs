//! Instruction data and account tables for every supported program call.
//!
//! Instruction data is `selector || borsh(args)`, where the selector is
//! `sha256("global:" || method)[..8]` and `method` is the snake_case name
//! the program declares. Account order is fixed per method and never
//! inferred from the arguments.

use chain_sol::{AccountMeta, Instruction, Pubkey, SYSTEM_PROGRAM_ID};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::accounts::{Factory, MAX_MATCH_ID_LEN};
use crate::codec::{Reader, Writer};
use crate::error::{CodecError, DecodeError, EncodeError};
use crate::program::{ProgramIds, ProgramKind};
use crate::types::{MarketResult, MatchOutcome};

pub const SELECTOR_LEN: usize = 8;

/// `sha256("global:" || method)[..8]`
pub fn sighash(method: &str) -> [u8; 8] {
    let digest = Sha256::new()
        .chain_update(b"global:")
        .chain_update(method.as_bytes())
        .finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

// -- Account tables ------------------------------------------------------------

/// One slot of a method's account table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSpec {
    pub name: &'static str,
    pub writable: bool,
    pub signer: bool,
}

const fn slot(name: &'static str, writable: bool, signer: bool) -> AccountSpec {
    AccountSpec {
        name,
        writable,
        signer,
    }
}

const INITIALIZE_FACTORY_ACCOUNTS: &[AccountSpec] = &[
    slot("factory", true, false),
    slot("authority", true, true),
    slot("system_program", false, false),
];

const CREATE_MARKET_ACCOUNTS: &[AccountSpec] = &[
    slot("factory", true, false),
    slot("market_registry", true, false),
    slot("market_account", false, false),
    slot("creator", true, true),
    slot("system_program", false, false),
];

const INITIALIZE_MARKET_ACCOUNTS: &[AccountSpec] = &[
    slot("market", true, false),
    slot("factory", false, false),
    slot("creator", true, true),
    slot("system_program", false, false),
];

const JOIN_MARKET_ACCOUNTS: &[AccountSpec] = &[
    slot("market", true, false),
    slot("participant", true, false),
    slot("user", true, true),
    slot("system_program", false, false),
];

const RESOLVE_MARKET_ACCOUNTS: &[AccountSpec] =
    &[slot("market", true, false), slot("creator", false, true)];

const WITHDRAW_REWARDS_ACCOUNTS: &[AccountSpec] = &[
    slot("market", true, false),
    slot("participant", true, false),
    slot("user", true, true),
    slot("system_program", false, false),
];

const UPDATE_USER_STATS_ACCOUNTS: &[AccountSpec] = &[
    slot("user_stats", true, false),
    slot("user", true, true),
    slot("system_program", false, false),
];

// -- Arguments -----------------------------------------------------------------

/// Arguments shared by factory `create_market` and market `initialize_market`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateMarketArgs {
    pub match_id: String,
    pub entry_fee: u64,
    pub kickoff_time: i64,
    pub end_time: i64,
    pub is_public: bool,
}

impl CreateMarketArgs {
    /// Checks that do not depend on the clock.
    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.match_id.is_empty() {
            return Err(EncodeError::invalid("match_id", "must not be empty"));
        }
        if self.match_id.len() > MAX_MATCH_ID_LEN {
            return Err(EncodeError::invalid(
                "match_id",
                format!(
                    "{} bytes exceeds the maximum of {MAX_MATCH_ID_LEN}",
                    self.match_id.len()
                ),
            ));
        }
        if self.entry_fee == 0 {
            return Err(EncodeError::invalid("entry_fee", "must be greater than zero"));
        }
        if self.end_time <= self.kickoff_time {
            return Err(EncodeError::invalid("end_time", "must be after kickoff_time"));
        }
        Ok(())
    }

    /// Kickoff must lie strictly after `now` (unix seconds).
    pub fn validate_schedule(&self, now: i64) -> Result<(), EncodeError> {
        if self.kickoff_time <= now {
            return Err(EncodeError::invalid(
                "kickoff_time",
                format!("{} is not in the future (now {now})", self.kickoff_time),
            ));
        }
        Ok(())
    }

    fn encode_into(&self, w: &mut Writer) {
        w.write(&self.match_id)
            .write(&self.entry_fee)
            .write(&self.kickoff_time)
            .write(&self.end_time)
            .write(&self.is_public);
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            match_id: r.read()?,
            entry_fee: r.read()?,
            kickoff_time: r.read()?,
            end_time: r.read()?,
            is_public: r.read()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpdateUserStatsArgs {
    pub market_result: MarketResult,
    pub amount_wagered: u64,
    pub amount_won: u64,
}

// -- Instructions --------------------------------------------------------------

/// Every call the client can make, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MarketInstruction {
    InitializeFactory { platform_fee_bps: u16 },
    CreateMarket(CreateMarketArgs),
    InitializeMarket(CreateMarketArgs),
    JoinMarket { prediction: MatchOutcome },
    ResolveMarket { outcome: MatchOutcome },
    WithdrawRewards,
    UpdateUserStats(UpdateUserStatsArgs),
}

const SELECTORS: [(&str, [u8; 8]); 7] = [
    ("initialize_factory", [179, 64, 75, 250, 39, 254, 240, 178]),
    ("create_market", [103, 226, 97, 235, 200, 188, 251, 254]),
    ("initialize_market", [35, 35, 189, 193, 155, 48, 170, 203]),
    ("join_market", [141, 113, 87, 152, 182, 213, 41, 202]),
    ("resolve_market", [155, 23, 80, 173, 46, 74, 23, 239]),
    ("withdraw_rewards", [10, 214, 219, 139, 205, 22, 251, 21]),
    ("update_user_stats", [182, 105, 179, 64, 228, 226, 150, 182]),
];

impl MarketInstruction {
    fn index(&self) -> usize {
        match self {
            MarketInstruction::InitializeFactory { .. } => 0,
            MarketInstruction::CreateMarket(_) => 1,
            MarketInstruction::InitializeMarket(_) => 2,
            MarketInstruction::JoinMarket { .. } => 3,
            MarketInstruction::ResolveMarket { .. } => 4,
            MarketInstruction::WithdrawRewards => 5,
            MarketInstruction::UpdateUserStats(_) => 6,
        }
    }

    /// Method name as declared by the program.
    pub fn method(&self) -> &'static str {
        SELECTORS[self.index()].0
    }

    pub fn selector(&self) -> [u8; 8] {
        SELECTORS[self.index()].1
    }

    /// Program that executes this call.
    pub fn program(&self) -> ProgramKind {
        match self {
            MarketInstruction::InitializeFactory { .. } | MarketInstruction::CreateMarket(_) => {
                ProgramKind::Factory
            }
            MarketInstruction::InitializeMarket(_)
            | MarketInstruction::JoinMarket { .. }
            | MarketInstruction::ResolveMarket { .. }
            | MarketInstruction::WithdrawRewards => ProgramKind::Market,
            MarketInstruction::UpdateUserStats(_) => ProgramKind::Dashboard,
        }
    }

    /// Accounts the call expects, in the order the program declares them.
    pub fn account_schema(&self) -> &'static [AccountSpec] {
        match self {
            MarketInstruction::InitializeFactory { .. } => INITIALIZE_FACTORY_ACCOUNTS,
            MarketInstruction::CreateMarket(_) => CREATE_MARKET_ACCOUNTS,
            MarketInstruction::InitializeMarket(_) => INITIALIZE_MARKET_ACCOUNTS,
            MarketInstruction::JoinMarket { .. } => JOIN_MARKET_ACCOUNTS,
            MarketInstruction::ResolveMarket { .. } => RESOLVE_MARKET_ACCOUNTS,
            MarketInstruction::WithdrawRewards => WITHDRAW_REWARDS_ACCOUNTS,
            MarketInstruction::UpdateUserStats(_) => UPDATE_USER_STATS_ACCOUNTS,
        }
    }

    /// Reject arguments the program would reject. Clock-dependent checks
    /// are left to [`CreateMarketArgs::validate_schedule`].
    pub fn validate(&self) -> Result<(), EncodeError> {
        match self {
            MarketInstruction::InitializeFactory { platform_fee_bps }
                if *platform_fee_bps > Factory::MAX_PLATFORM_FEE_BPS =>
            {
                Err(EncodeError::invalid(
                    "platform_fee_bps",
                    format!(
                        "{platform_fee_bps} exceeds the maximum of {}",
                        Factory::MAX_PLATFORM_FEE_BPS
                    ),
                ))
            }
            MarketInstruction::CreateMarket(args) | MarketInstruction::InitializeMarket(args) => {
                args.validate()
            }
            _ => Ok(()),
        }
    }

    /// Instruction data: selector followed by the arguments.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        self.validate()?;
        let mut w = Writer::with_capacity(SELECTOR_LEN + 96);
        w.put_slice(&self.selector());
        match self {
            MarketInstruction::InitializeFactory { platform_fee_bps } => {
                w.write(platform_fee_bps);
            }
            MarketInstruction::CreateMarket(args) | MarketInstruction::InitializeMarket(args) => {
                args.encode_into(&mut w);
            }
            MarketInstruction::JoinMarket { prediction } => {
                w.write(prediction);
            }
            MarketInstruction::ResolveMarket { outcome } => {
                w.write(outcome);
            }
            MarketInstruction::WithdrawRewards => {}
            MarketInstruction::UpdateUserStats(args) => {
                w.write(&args.market_result)
                    .write(&args.amount_wagered)
                    .write(&args.amount_won);
            }
        }
        Ok(w.into_bytes())
    }

    /// Recover the call and its arguments from instruction data.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let head = data.get(..SELECTOR_LEN).ok_or(DecodeError::Malformed {
            context: "instruction",
            source: CodecError::UnexpectedEof {
                offset: 0,
                expected: SELECTOR_LEN,
                available: data.len(),
            },
        })?;
        let mut selector = [0u8; 8];
        selector.copy_from_slice(head);
        let &(method, _) = SELECTORS
            .iter()
            .find(|(_, s)| *s == selector)
            .ok_or(DecodeError::UnknownSelector(selector))?;

        let mut r = Reader::at(data, SELECTOR_LEN);
        let parsed = Self::decode_args(method, &mut r)
            .map_err(|e| DecodeError::from_codec(method, e))?
            .ok_or(DecodeError::UnknownSelector(selector))?;
        r.finish().map_err(|e| DecodeError::from_codec(method, e))?;
        Ok(parsed)
    }

    /// `None` for a method name with no argument layout.
    fn decode_args(method: &str, r: &mut Reader<'_>) -> Result<Option<Self>, CodecError> {
        Ok(Some(match method {
            "initialize_factory" => MarketInstruction::InitializeFactory {
                platform_fee_bps: r.read()?,
            },
            "create_market" => MarketInstruction::CreateMarket(CreateMarketArgs::decode_from(r)?),
            "initialize_market" => {
                MarketInstruction::InitializeMarket(CreateMarketArgs::decode_from(r)?)
            }
            "join_market" => MarketInstruction::JoinMarket {
                prediction: r.read()?,
            },
            "resolve_market" => MarketInstruction::ResolveMarket { outcome: r.read()? },
            "withdraw_rewards" => MarketInstruction::WithdrawRewards,
            "update_user_stats" => MarketInstruction::UpdateUserStats(UpdateUserStatsArgs {
                market_result: r.read()?,
                amount_wagered: r.read()?,
                amount_won: r.read()?,
            }),
            _ => return Ok(None),
        }))
    }

    /// Pair the encoded data with `accounts`, given in schema order.
    pub fn to_instruction(
        &self,
        program_id: Pubkey,
        accounts: &[Pubkey],
    ) -> Result<Instruction, EncodeError> {
        let schema = self.account_schema();
        if accounts.len() != schema.len() {
            return Err(EncodeError::invalid(
                "accounts",
                format!(
                    "{} expects {} accounts, got {}",
                    self.method(),
                    schema.len(),
                    accounts.len()
                ),
            ));
        }
        let metas = schema
            .iter()
            .zip(accounts)
            .map(|(spec, key)| AccountMeta {
                pubkey: *key,
                is_signer: spec.signer,
                is_writable: spec.writable,
            })
            .collect();
        Ok(Instruction {
            program_id,
            accounts: metas,
            data: self.encode()?,
        })
    }
}

// -- Builders ------------------------------------------------------------------

pub fn initialize_factory(
    ids: &ProgramIds,
    authority: &Pubkey,
    platform_fee_bps: u16,
) -> Result<Instruction, EncodeError> {
    let (factory, _) = ids.factory_address()?;
    MarketInstruction::InitializeFactory { platform_fee_bps }
        .to_instruction(ids.factory, &[factory, *authority, SYSTEM_PROGRAM_ID])
}

/// Market `initialize_market` followed by factory `create_market`; both must
/// land in one transaction.
pub fn create_market(
    ids: &ProgramIds,
    creator: &Pubkey,
    args: &CreateMarketArgs,
) -> Result<[Instruction; 2], EncodeError> {
    args.validate()?;
    let (factory, _) = ids.factory_address()?;
    let (market, _) = ids.market_address(&factory, &args.match_id)?;
    let (registry, _) = ids.market_registry_address(&factory, &args.match_id)?;

    let init = MarketInstruction::InitializeMarket(args.clone()).to_instruction(
        ids.market,
        &[market, factory, *creator, SYSTEM_PROGRAM_ID],
    )?;
    let register = MarketInstruction::CreateMarket(args.clone()).to_instruction(
        ids.factory,
        &[factory, registry, market, *creator, SYSTEM_PROGRAM_ID],
    )?;
    Ok([init, register])
}

pub fn join_market(
    ids: &ProgramIds,
    market: &Pubkey,
    user: &Pubkey,
    prediction: MatchOutcome,
) -> Result<Instruction, EncodeError> {
    let (participant, _) = ids.participant_address(market, user)?;
    MarketInstruction::JoinMarket { prediction }
        .to_instruction(ids.market, &[*market, participant, *user, SYSTEM_PROGRAM_ID])
}

pub fn resolve_market(
    ids: &ProgramIds,
    market: &Pubkey,
    creator: &Pubkey,
    outcome: MatchOutcome,
) -> Result<Instruction, EncodeError> {
    MarketInstruction::ResolveMarket { outcome }.to_instruction(ids.market, &[*market, *creator])
}

pub fn withdraw_rewards(
    ids: &ProgramIds,
    market: &Pubkey,
    user: &Pubkey,
) -> Result<Instruction, EncodeError> {
    let (participant, _) = ids.participant_address(market, user)?;
    MarketInstruction::WithdrawRewards
        .to_instruction(ids.market, &[*market, participant, *user, SYSTEM_PROGRAM_ID])
}

pub fn update_user_stats(
    ids: &ProgramIds,
    user: &Pubkey,
    args: UpdateUserStatsArgs,
) -> Result<Instruction, EncodeError> {
    let (user_stats, _) = ids.user_stats_address(user)?;
    MarketInstruction::UpdateUserStats(args)
        .to_instruction(ids.dashboard, &[user_stats, *user, SYSTEM_PROGRAM_ID])
}
