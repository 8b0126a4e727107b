//! Solana primitives for the CryptoScore client.
//!
//! Address derivation, keypairs and the legacy transaction wire format,
//! implemented by hand on top of `ed25519-dalek`, `curve25519-dalek`,
//! `sha2` and `bs58` instead of pulling in `solana-sdk`.

pub mod address;
pub mod error;
pub mod keypair;
pub mod pda;
pub mod transaction;

pub use address::{validate_address, Pubkey};
pub use error::SolError;
pub use keypair::Keypair;
pub use pda::{create_program_address, find_program_address, is_on_curve, MAX_SEED_LEN};
pub use transaction::{
    decode_compact_u16, encode_compact_u16, AccountMeta, CompiledInstruction, Hash, Instruction,
    Message, Signature, Transaction, PACKET_DATA_SIZE, SYSTEM_PROGRAM_ID,
};
