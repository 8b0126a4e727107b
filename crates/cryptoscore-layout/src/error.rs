use chain_sol::SolError;
use thiserror::Error;

/// Low-level read failures. Every variant carries the byte offset.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of data at offset {offset}: need {expected} bytes, {available} available")]
    UnexpectedEof {
        offset: usize,
        expected: usize,
        available: usize,
    },

    #[error("invalid bool byte {value} at offset {offset}")]
    InvalidBool { offset: usize, value: u8 },

    #[error("invalid option tag {value} at offset {offset}")]
    InvalidOptionTag { offset: usize, value: u8 },

    #[error("unknown {type_name} variant {tag} at offset {offset}")]
    UnknownVariant {
        offset: usize,
        type_name: &'static str,
        tag: u8,
    },

    #[error("invalid utf-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("{remaining} unexpected trailing bytes at offset {offset}")]
    TrailingBytes { offset: usize, remaining: usize },
}

/// Account and instruction decoding failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{account}: invalid account size, expected {expected} bytes, got {actual}")]
    InvalidAccountSize {
        account: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{account}: wrong account type, discriminator {} != {}", hex::encode(.found), hex::encode(.expected))]
    WrongAccountType {
        account: &'static str,
        expected: [u8; 8],
        found: [u8; 8],
    },

    #[error("{context}: unknown {type_name} variant {tag} at offset {offset}")]
    UnknownVariant {
        context: &'static str,
        type_name: &'static str,
        tag: u8,
        offset: usize,
    },

    #[error("{context}: {source}")]
    Malformed {
        context: &'static str,
        #[source]
        source: CodecError,
    },

    #[error("unrecognized account discriminator {}", hex::encode(.0))]
    UnknownDiscriminator([u8; 8]),

    #[error("unrecognized instruction selector {}", hex::encode(.0))]
    UnknownSelector([u8; 8]),
}

impl DecodeError {
    /// Attach `context` to a codec failure, lifting enum tag errors to
    /// `UnknownVariant`.
    pub fn from_codec(context: &'static str, err: CodecError) -> Self {
        match err {
            CodecError::UnknownVariant {
                offset,
                type_name,
                tag,
            } => DecodeError::UnknownVariant {
                context,
                type_name,
                tag,
                offset,
            },
            source => DecodeError::Malformed { context, source },
        }
    }
}

/// Instruction building failures. Nothing here ever reaches the network.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("invalid argument `{field}`: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    #[error("address derivation failed: {0}")]
    Address(#[from] SolError),
}

impl EncodeError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EncodeError::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }
}
