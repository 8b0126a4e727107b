//! Numeric error codes returned by the deployed programs.
//!
//! Custom program errors start at 6000 and follow declaration order.
//! Codes below 6000 come from the framework and are shared by every program.

use std::fmt;

use serde::Serialize;

use crate::program::ProgramKind;

/// First custom error code of every program.
pub const CUSTOM_ERROR_OFFSET: u32 = 6000;

macro_rules! error_table {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $code:literal => $msg:literal,)* }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            pub fn from_code(code: u32) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub fn code(self) -> u32 {
                match self {
                    $(Self::$variant => $code,)*
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)*
                }
            }

            pub fn message(self) -> &'static str {
                match self {
                    $(Self::$variant => $msg,)*
                }
            }
        }
    };
}

error_table! {
    /// Errors raised by the factory program.
    FactoryError {
        InvalidPlatformFee = 6000 => "Platform fee cannot exceed 10% (1000 bps)",
        InvalidMatchId = 6001 => "Match ID cannot be empty",
        MatchIdTooLong = 6002 => "Match ID is too long (max 64 characters)",
        ZeroEntryFee = 6003 => "Entry fee must be greater than zero",
        InvalidKickoffTime = 6004 => "Kickoff time must be in the future",
        InvalidEndTime = 6005 => "End time must be after kickoff time",
        MarketCountOverflow = 6006 => "Market count overflow",
    }
}

error_table! {
    /// Errors raised by the market program.
    MarketError {
        InvalidMatchId = 6000 => "Match ID cannot be empty",
        MatchIdTooLong = 6001 => "Match ID is too long (max 64 characters)",
        ZeroEntryFee = 6002 => "Entry fee must be greater than zero",
        InvalidKickoffTime = 6003 => "Kickoff time must be in the future",
        InvalidEndTime = 6004 => "End time must be after kickoff time",
        MarketNotOpen = 6005 => "Market is not open for joining",
        MarketAlreadyStarted = 6006 => "Market has already started",
        PoolOverflow = 6007 => "Pool amount overflow",
        ParticipantOverflow = 6008 => "Participant count overflow",
        CountOverflow = 6009 => "Prediction count overflow",
        UnauthorizedResolver = 6010 => "Only market creator can resolve",
        MarketAlreadyResolved = 6011 => "Market is already resolved",
        MarketNotEnded = 6012 => "Market has not ended yet",
        MarketNotResolved = 6013 => "Market is not resolved yet",
        AlreadyWithdrawn = 6014 => "Rewards already withdrawn",
        NoOutcome = 6015 => "No outcome set for market",
        NotAWinner = 6016 => "User is not a winner",
        NoWinners = 6017 => "No winners in this market",
        CalculationError = 6018 => "Calculation error",
        InsufficientFunds = 6019 => "Insufficient funds in market",
    }
}

error_table! {
    /// Errors raised by the dashboard program.
    DashboardError {
        StatOverflow = 6000 => "Statistics overflow",
        InvalidPageSize = 6001 => "Invalid page size",
        InvalidSortOption = 6002 => "Invalid sort option",
    }
}

error_table! {
    /// Framework errors common to all three programs.
    FrameworkError {
        InstructionMissing = 100 => "8 byte instruction identifier not provided",
        InstructionFallbackNotFound = 101 => "Fallback functions are not supported",
        InstructionDidNotDeserialize = 102 => "The program could not deserialize the given instruction",
        ConstraintMut = 2000 => "A mut constraint was violated",
        ConstraintHasOne = 2001 => "A has one constraint was violated",
        ConstraintSigner = 2002 => "A signer constraint was violated",
        ConstraintSeeds = 2006 => "A seeds constraint was violated",
        AccountDiscriminatorNotFound = 3001 => "No 8 byte discriminator was found on the account",
        AccountDiscriminatorMismatch = 3002 => "8 byte discriminator did not match what was expected",
        AccountDidNotDeserialize = 3003 => "Failed to deserialize the account",
        AccountNotInitialized = 3012 => "The program expected this account to be already initialized",
    }
}

/// A program error code resolved to its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProgramError {
    Factory(FactoryError),
    Market(MarketError),
    Dashboard(DashboardError),
    Framework(FrameworkError),
    Unknown(u32),
}

impl ProgramError {
    /// Resolve `code` returned by `program`. Codes missing from the table
    /// come back as `Unknown` rather than failing.
    pub fn from_code(program: ProgramKind, code: u32) -> Self {
        if code < CUSTOM_ERROR_OFFSET {
            return FrameworkError::from_code(code)
                .map(ProgramError::Framework)
                .unwrap_or(ProgramError::Unknown(code));
        }
        let resolved = match program {
            ProgramKind::Factory => FactoryError::from_code(code).map(ProgramError::Factory),
            ProgramKind::Market => MarketError::from_code(code).map(ProgramError::Market),
            ProgramKind::Dashboard => DashboardError::from_code(code).map(ProgramError::Dashboard),
        };
        resolved.unwrap_or(ProgramError::Unknown(code))
    }

    pub fn code(self) -> u32 {
        match self {
            ProgramError::Factory(e) => e.code(),
            ProgramError::Market(e) => e.code(),
            ProgramError::Dashboard(e) => e.code(),
            ProgramError::Framework(e) => e.code(),
            ProgramError::Unknown(code) => code,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProgramError::Factory(e) => e.name(),
            ProgramError::Market(e) => e.name(),
            ProgramError::Dashboard(e) => e.name(),
            ProgramError::Framework(e) => e.name(),
            ProgramError::Unknown(_) => "Unknown",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ProgramError::Factory(e) => e.message(),
            ProgramError::Market(e) => e.message(),
            ProgramError::Dashboard(e) => e.message(),
            ProgramError::Framework(e) => e.message(),
            ProgramError::Unknown(_) => "unrecognized program error code",
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, ProgramError::Unknown(_))
    }
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramError::Unknown(code) => write!(f, "Unknown({code})"),
            known => write!(f, "{} ({}): {}", known.name(), known.code(), known.message()),
        }
    }
}
