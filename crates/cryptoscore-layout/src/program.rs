//! Program-id table and the derived-address seeds of each account kind.
//!
//! | Address         | Program   | Seeds                                       |
//! |-----------------|-----------|---------------------------------------------|
//! | factory         | factory   | `"factory"`                                 |
//! | market registry | factory   | `"market_registry"`, factory, match id      |
//! | market          | market    | `"market"`, factory, match id               |
//! | participant     | market    | `"participant"`, market, user               |
//! | user stats      | dashboard | `"user_stats"`, user                        |

use std::fmt;

use chain_sol::{find_program_address, Pubkey, SolError};
use serde::{Deserialize, Serialize};

pub const FACTORY_SEED: &[u8] = b"factory";
pub const MARKET_REGISTRY_SEED: &[u8] = b"market_registry";
pub const MARKET_SEED: &[u8] = b"market";
pub const PARTICIPANT_SEED: &[u8] = b"participant";
pub const USER_STATS_SEED: &[u8] = b"user_stats";

/// `5zADKCecxATSEsCuH5MJa1JdfXGeBLNwEYnkCbqdaYmZ`
pub const FACTORY_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0x4a, 0x13, 0x45, 0x2c, 0x93, 0xdd, 0x04, 0xdb, 0x1c, 0xe9, 0x0f, 0x92, 0x43, 0x51, 0xf7, 0x7d,
    0xed, 0x39, 0x9d, 0x67, 0x2a, 0xb1, 0x5b, 0xce, 0x49, 0x7c, 0x21, 0xa6, 0xa9, 0x59, 0x4d, 0xdc,
]);

/// `94CjfuYYswDbcjasA1PTUmHhsqFsBQC4JnsiKB8nKJhQ`
pub const MARKET_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0x77, 0xaf, 0x81, 0xe7, 0x97, 0xd1, 0xc3, 0xcf, 0x6f, 0x58, 0x6c, 0xc9, 0xa9, 0xe8, 0x62, 0xfb,
    0xc5, 0x7a, 0xaa, 0x29, 0xc1, 0x8f, 0x33, 0xe7, 0xb2, 0x43, 0x4d, 0x97, 0xcf, 0x33, 0xc7, 0x0b,
]);

/// `DHJASkp8vNuyR5xPSyj1G66xExRjnPBUuUN4QKiTnadZ`
pub const DASHBOARD_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0xb6, 0x78, 0xf1, 0x2f, 0xaa, 0xb6, 0x77, 0xd7, 0xd7, 0xa8, 0xa1, 0xb0, 0xa3, 0x91, 0x7c, 0xd2,
    0x72, 0xb3, 0xe3, 0x4c, 0xc1, 0x04, 0xd6, 0xcc, 0xcf, 0xe4, 0x6f, 0x4c, 0xbb, 0xce, 0x20, 0x34,
]);

/// Which of the three deployed programs an id or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramKind {
    Factory,
    Market,
    Dashboard,
}

impl fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramKind::Factory => write!(f, "factory"),
            ProgramKind::Market => write!(f, "market"),
            ProgramKind::Dashboard => write!(f, "dashboard"),
        }
    }
}

/// Deployed program ids. Defaults to the mainnet deployment; redeploys on
/// devnet or a local validator override them through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramIds {
    pub factory: Pubkey,
    pub market: Pubkey,
    pub dashboard: Pubkey,
}

impl Default for ProgramIds {
    fn default() -> Self {
        Self {
            factory: FACTORY_PROGRAM_ID,
            market: MARKET_PROGRAM_ID,
            dashboard: DASHBOARD_PROGRAM_ID,
        }
    }
}

impl ProgramIds {
    pub fn id(&self, kind: ProgramKind) -> Pubkey {
        match kind {
            ProgramKind::Factory => self.factory,
            ProgramKind::Market => self.market,
            ProgramKind::Dashboard => self.dashboard,
        }
    }

    /// Reverse lookup, used to attribute a failed instruction to its program.
    pub fn kind_of(&self, program_id: &Pubkey) -> Option<ProgramKind> {
        [ProgramKind::Factory, ProgramKind::Market, ProgramKind::Dashboard]
            .into_iter()
            .find(|kind| self.id(*kind) == *program_id)
    }

    pub fn factory_address(&self) -> Result<(Pubkey, u8), SolError> {
        find_program_address(&[FACTORY_SEED], &self.factory)
    }

    pub fn market_registry_address(
        &self,
        factory: &Pubkey,
        match_id: &str,
    ) -> Result<(Pubkey, u8), SolError> {
        find_program_address(
            &[MARKET_REGISTRY_SEED, factory.as_ref(), match_id.as_bytes()],
            &self.factory,
        )
    }

    /// Match ids longer than a single seed (32 bytes) have no address.
    pub fn market_address(
        &self,
        factory: &Pubkey,
        match_id: &str,
    ) -> Result<(Pubkey, u8), SolError> {
        find_program_address(
            &[MARKET_SEED, factory.as_ref(), match_id.as_bytes()],
            &self.market,
        )
    }

    pub fn participant_address(
        &self,
        market: &Pubkey,
        user: &Pubkey,
    ) -> Result<(Pubkey, u8), SolError> {
        find_program_address(
            &[PARTICIPANT_SEED, market.as_ref(), user.as_ref()],
            &self.market,
        )
    }

    pub fn user_stats_address(&self, user: &Pubkey) -> Result<(Pubkey, u8), SolError> {
        find_program_address(&[USER_STATS_SEED, user.as_ref()], &self.dashboard)
    }
}
