//! Binary contract with the CryptoScore on-chain programs.
//!
//! Everything here is pure and synchronous: account decoding, instruction
//! encoding, derived addresses and the program error table. Fetching bytes
//! and submitting transactions lives in `cryptoscore-client`.

pub mod accounts;
pub mod codec;
pub mod error;
pub mod instructions;
pub mod program;
pub mod program_error;
pub mod types;

pub use accounts::{
    account_discriminator, decode, decode_any, AccountKind, AccountLayout, Factory, Market,
    MarketRegistry, Participant, Record, UserStats, MAX_MATCH_ID_LEN,
};
pub use error::{CodecError, DecodeError, EncodeError};
pub use instructions::{sighash, CreateMarketArgs, MarketInstruction, UpdateUserStatsArgs};
pub use program::{ProgramIds, ProgramKind};
pub use program_error::ProgramError;
pub use types::{MarketResult, MarketStatus, MatchOutcome};
