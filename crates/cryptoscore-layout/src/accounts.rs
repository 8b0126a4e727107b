//! Account records of the three programs and their fixed binary layouts.
//!
//! Every account starts with an 8-byte discriminator,
//! `sha256("account:" || StructName)[..8]`, followed by the fields in
//! declaration order. Accounts are allocated at a fixed size; a record whose
//! match id is shorter than the maximum leaves zero padding at the tail.

use chain_sol::Pubkey;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::codec::{Reader, Writer};
use crate::error::{CodecError, DecodeError};
use crate::program::ProgramKind;
use crate::types::{MarketStatus, MatchOutcome};

pub const DISCRIMINATOR_LEN: usize = 8;

/// Longest match id the programs accept.
pub const MAX_MATCH_ID_LEN: usize = 64;

/// `sha256("account:" || name)[..8]`
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::new()
        .chain_update(b"account:")
        .chain_update(name.as_bytes())
        .finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// A fixed-size account record.
pub trait AccountLayout: Sized {
    const NAME: &'static str;
    /// Allocated account size including the discriminator.
    const LEN: usize;
    const DISCRIMINATOR: [u8; 8];

    fn decode_fields(reader: &mut Reader<'_>) -> Result<Self, CodecError>;

    fn encode_fields(&self, writer: &mut Writer);

    /// Decode a raw account buffer. Size is checked before the
    /// discriminator, and no field is read unless both match.
    fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        if raw.len() != Self::LEN {
            return Err(DecodeError::InvalidAccountSize {
                account: Self::NAME,
                expected: Self::LEN,
                actual: raw.len(),
            });
        }
        let mut found = [0u8; 8];
        found.copy_from_slice(&raw[..DISCRIMINATOR_LEN]);
        if found != Self::DISCRIMINATOR {
            return Err(DecodeError::WrongAccountType {
                account: Self::NAME,
                expected: Self::DISCRIMINATOR,
                found,
            });
        }
        let mut reader = Reader::at(raw, DISCRIMINATOR_LEN);
        Self::decode_fields(&mut reader).map_err(|e| DecodeError::from_codec(Self::NAME, e))
    }

    /// Account bytes as the program would store them, zero-padded to `LEN`.
    fn to_account_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::with_capacity(Self::LEN);
        writer.put_slice(&Self::DISCRIMINATOR);
        self.encode_fields(&mut writer);
        let mut bytes = writer.into_bytes();
        if bytes.len() < Self::LEN {
            bytes.resize(Self::LEN, 0);
        }
        bytes
    }
}

// -- Factory program -----------------------------------------------------------

/// Global factory singleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Factory {
    pub authority: Pubkey,
    pub market_count: u64,
    pub platform_fee_bps: u16,
    pub bump: u8,
}

impl Factory {
    /// Highest platform fee the factory accepts (10%).
    pub const MAX_PLATFORM_FEE_BPS: u16 = 1000;
}

impl AccountLayout for Factory {
    const NAME: &'static str = "Factory";
    const LEN: usize = 8 + 32 + 8 + 2 + 1;
    const DISCRIMINATOR: [u8; 8] = [159, 68, 192, 61, 48, 249, 216, 202];

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            authority: r.read()?,
            market_count: r.read()?,
            platform_fee_bps: r.read()?,
            bump: r.read()?,
        })
    }

    fn encode_fields(&self, w: &mut Writer) {
        w.write(&self.authority)
            .write(&self.market_count)
            .write(&self.platform_fee_bps)
            .write(&self.bump);
    }
}

/// Per-market listing entry kept by the factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketRegistry {
    pub factory: Pubkey,
    pub market_address: Pubkey,
    pub creator: Pubkey,
    pub match_id: String,
    pub created_at: i64,
    pub is_public: bool,
    pub entry_fee: u64,
    pub kickoff_time: i64,
    pub end_time: i64,
    pub bump: u8,
}

impl MarketRegistry {
    pub const CREATOR_OFFSET: usize = 8 + 32 + 32;
}

impl AccountLayout for MarketRegistry {
    const NAME: &'static str = "MarketRegistry";
    const LEN: usize = 8 + 32 + 32 + 32 + 4 + MAX_MATCH_ID_LEN + 8 + 1 + 8 + 8 + 8 + 1;
    const DISCRIMINATOR: [u8; 8] = [200, 118, 217, 126, 179, 169, 172, 104];

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            factory: r.read()?,
            market_address: r.read()?,
            creator: r.read()?,
            match_id: r.read()?,
            created_at: r.read()?,
            is_public: r.read()?,
            entry_fee: r.read()?,
            kickoff_time: r.read()?,
            end_time: r.read()?,
            bump: r.read()?,
        })
    }

    fn encode_fields(&self, w: &mut Writer) {
        w.write(&self.factory)
            .write(&self.market_address)
            .write(&self.creator)
            .write(&self.match_id)
            .write(&self.created_at)
            .write(&self.is_public)
            .write(&self.entry_fee)
            .write(&self.kickoff_time)
            .write(&self.end_time)
            .write(&self.bump);
    }
}

// -- Market program ------------------------------------------------------------

/// A prediction market on a single match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Market {
    pub factory: Pubkey,
    pub creator: Pubkey,
    pub match_id: String,
    pub entry_fee: u64,
    pub kickoff_time: i64,
    pub end_time: i64,
    pub status: MarketStatus,
    /// Set exactly when `status` is `Resolved`.
    pub outcome: Option<MatchOutcome>,
    pub total_pool: u64,
    pub participant_count: u32,
    pub home_count: u32,
    pub draw_count: u32,
    pub away_count: u32,
    pub is_public: bool,
    pub bump: u8,
}

impl Market {
    pub const CREATOR_OFFSET: usize = 8 + 32;

    /// Number of participants that predicted `outcome`.
    pub fn count_for(&self, outcome: MatchOutcome) -> u32 {
        match outcome {
            MatchOutcome::Home => self.home_count,
            MatchOutcome::Draw => self.draw_count,
            MatchOutcome::Away => self.away_count,
        }
    }

    /// Participants holding the winning prediction, once resolved.
    pub fn winner_count(&self) -> Option<u32> {
        self.outcome.map(|outcome| self.count_for(outcome))
    }

    pub fn participant_counts_consistent(&self) -> bool {
        u64::from(self.home_count) + u64::from(self.draw_count) + u64::from(self.away_count)
            == u64::from(self.participant_count)
    }

    pub fn outcome_matches_status(&self) -> bool {
        self.outcome.is_some() == (self.status == MarketStatus::Resolved)
    }

    /// Whether a join at unix time `now` would pass the program's checks.
    pub fn is_joinable(&self, now: i64) -> bool {
        self.status == MarketStatus::Open && now < self.kickoff_time
    }
}

impl AccountLayout for Market {
    const NAME: &'static str = "Market";
    const LEN: usize =
        8 + 32 + 32 + 4 + MAX_MATCH_ID_LEN + 8 + 8 + 8 + 1 + 2 + 8 + 4 + 4 + 4 + 4 + 1 + 1;
    const DISCRIMINATOR: [u8; 8] = [219, 190, 213, 55, 0, 227, 198, 154];

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            factory: r.read()?,
            creator: r.read()?,
            match_id: r.read()?,
            entry_fee: r.read()?,
            kickoff_time: r.read()?,
            end_time: r.read()?,
            status: r.read()?,
            outcome: r.read()?,
            total_pool: r.read()?,
            participant_count: r.read()?,
            home_count: r.read()?,
            draw_count: r.read()?,
            away_count: r.read()?,
            is_public: r.read()?,
            bump: r.read()?,
        })
    }

    fn encode_fields(&self, w: &mut Writer) {
        w.write(&self.factory)
            .write(&self.creator)
            .write(&self.match_id)
            .write(&self.entry_fee)
            .write(&self.kickoff_time)
            .write(&self.end_time)
            .write(&self.status)
            .write(&self.outcome)
            .write(&self.total_pool)
            .write(&self.participant_count)
            .write(&self.home_count)
            .write(&self.draw_count)
            .write(&self.away_count)
            .write(&self.is_public)
            .write(&self.bump);
    }
}

/// One user's entry in a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub market: Pubkey,
    pub user: Pubkey,
    pub prediction: MatchOutcome,
    pub joined_at: i64,
    pub has_withdrawn: bool,
    pub bump: u8,
}

impl Participant {
    pub const MARKET_OFFSET: usize = 8;
    pub const USER_OFFSET: usize = 8 + 32;

    pub fn is_winner(&self, market: &Market) -> bool {
        market.status == MarketStatus::Resolved && market.outcome == Some(self.prediction)
    }

    /// A winner that has not claimed yet.
    pub fn can_withdraw(&self, market: &Market) -> bool {
        !self.has_withdrawn && self.is_winner(market)
    }
}

impl AccountLayout for Participant {
    const NAME: &'static str = "Participant";
    const LEN: usize = 8 + 32 + 32 + 1 + 8 + 1 + 1;
    const DISCRIMINATOR: [u8; 8] = [32, 142, 108, 79, 247, 179, 54, 6];

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            market: r.read()?,
            user: r.read()?,
            prediction: r.read()?,
            joined_at: r.read()?,
            has_withdrawn: r.read()?,
            bump: r.read()?,
        })
    }

    fn encode_fields(&self, w: &mut Writer) {
        w.write(&self.market)
            .write(&self.user)
            .write(&self.prediction)
            .write(&self.joined_at)
            .write(&self.has_withdrawn)
            .write(&self.bump);
    }
}

// -- Dashboard program ---------------------------------------------------------

/// Lifetime statistics of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub user: Pubkey,
    pub total_markets: u32,
    pub wins: u32,
    pub losses: u32,
    pub total_wagered: u64,
    pub total_won: u64,
    /// Positive for a win streak, negative for a loss streak.
    pub current_streak: i32,
    /// Longest win streak.
    pub best_streak: u32,
    pub last_updated: i64,
    pub bump: u8,
}

impl UserStats {
    /// `wins + losses == total_markets`, and a running win streak never
    /// exceeds the best one. Loss streaks are not tracked by `best_streak`.
    pub fn is_consistent(&self) -> bool {
        let totals = u64::from(self.wins) + u64::from(self.losses) == u64::from(self.total_markets);
        let streak = self.current_streak <= 0 || self.best_streak >= self.current_streak.unsigned_abs();
        totals && streak
    }
}

impl AccountLayout for UserStats {
    const NAME: &'static str = "UserStats";
    const LEN: usize = 8 + 32 + 4 + 4 + 4 + 8 + 8 + 4 + 4 + 8 + 1;
    const DISCRIMINATOR: [u8; 8] = [176, 223, 136, 27, 122, 79, 32, 227];

    fn decode_fields(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            user: r.read()?,
            total_markets: r.read()?,
            wins: r.read()?,
            losses: r.read()?,
            total_wagered: r.read()?,
            total_won: r.read()?,
            current_streak: r.read()?,
            best_streak: r.read()?,
            last_updated: r.read()?,
            bump: r.read()?,
        })
    }

    fn encode_fields(&self, w: &mut Writer) {
        w.write(&self.user)
            .write(&self.total_markets)
            .write(&self.wins)
            .write(&self.losses)
            .write(&self.total_wagered)
            .write(&self.total_won)
            .write(&self.current_streak)
            .write(&self.best_streak)
            .write(&self.last_updated)
            .write(&self.bump);
    }
}

// -- Closed set of records -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AccountKind {
    Factory,
    MarketRegistry,
    Market,
    Participant,
    UserStats,
}

impl AccountKind {
    pub const ALL: [AccountKind; 5] = [
        AccountKind::Factory,
        AccountKind::MarketRegistry,
        AccountKind::Market,
        AccountKind::Participant,
        AccountKind::UserStats,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AccountKind::Factory => Factory::NAME,
            AccountKind::MarketRegistry => MarketRegistry::NAME,
            AccountKind::Market => Market::NAME,
            AccountKind::Participant => Participant::NAME,
            AccountKind::UserStats => UserStats::NAME,
        }
    }

    pub fn len(self) -> usize {
        match self {
            AccountKind::Factory => Factory::LEN,
            AccountKind::MarketRegistry => MarketRegistry::LEN,
            AccountKind::Market => Market::LEN,
            AccountKind::Participant => Participant::LEN,
            AccountKind::UserStats => UserStats::LEN,
        }
    }

    pub fn discriminator(self) -> [u8; 8] {
        match self {
            AccountKind::Factory => Factory::DISCRIMINATOR,
            AccountKind::MarketRegistry => MarketRegistry::DISCRIMINATOR,
            AccountKind::Market => Market::DISCRIMINATOR,
            AccountKind::Participant => Participant::DISCRIMINATOR,
            AccountKind::UserStats => UserStats::DISCRIMINATOR,
        }
    }

    /// Program that owns accounts of this kind.
    pub fn program(self) -> ProgramKind {
        match self {
            AccountKind::Factory | AccountKind::MarketRegistry => ProgramKind::Factory,
            AccountKind::Market | AccountKind::Participant => ProgramKind::Market,
            AccountKind::UserStats => ProgramKind::Dashboard,
        }
    }

    pub fn from_discriminator(disc: &[u8; 8]) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.discriminator() == *disc)
    }
}

/// Any decoded account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Record {
    Factory(Factory),
    MarketRegistry(MarketRegistry),
    Market(Market),
    Participant(Participant),
    UserStats(UserStats),
}

impl Record {
    pub fn kind(&self) -> AccountKind {
        match self {
            Record::Factory(_) => AccountKind::Factory,
            Record::MarketRegistry(_) => AccountKind::MarketRegistry,
            Record::Market(_) => AccountKind::Market,
            Record::Participant(_) => AccountKind::Participant,
            Record::UserStats(_) => AccountKind::UserStats,
        }
    }

    pub fn to_account_bytes(&self) -> Vec<u8> {
        match self {
            Record::Factory(r) => r.to_account_bytes(),
            Record::MarketRegistry(r) => r.to_account_bytes(),
            Record::Market(r) => r.to_account_bytes(),
            Record::Participant(r) => r.to_account_bytes(),
            Record::UserStats(r) => r.to_account_bytes(),
        }
    }
}

/// Decode `raw` as an account of the given kind.
pub fn decode(kind: AccountKind, raw: &[u8]) -> Result<Record, DecodeError> {
    Ok(match kind {
        AccountKind::Factory => Record::Factory(Factory::decode(raw)?),
        AccountKind::MarketRegistry => Record::MarketRegistry(MarketRegistry::decode(raw)?),
        AccountKind::Market => Record::Market(Market::decode(raw)?),
        AccountKind::Participant => Record::Participant(Participant::decode(raw)?),
        AccountKind::UserStats => Record::UserStats(UserStats::decode(raw)?),
    })
}

/// Decode `raw` as whichever account kind its discriminator names.
pub fn decode_any(raw: &[u8]) -> Result<Record, DecodeError> {
    let head = raw
        .get(..DISCRIMINATOR_LEN)
        .ok_or(DecodeError::Malformed {
            context: "account",
            source: CodecError::UnexpectedEof {
                offset: 0,
                expected: DISCRIMINATOR_LEN,
                available: raw.len(),
            },
        })?;
    let mut disc = [0u8; 8];
    disc.copy_from_slice(head);
    let kind = AccountKind::from_discriminator(&disc).ok_or(DecodeError::UnknownDiscriminator(disc))?;
    decode(kind, raw)
}
