//! Program Derived Address (PDA) derivation.
//!
//! A PDA is `SHA-256(seed_0 || seed_1 || ... || bump || program_id || "ProgramDerivedAddress")`
//! for the highest bump in `255..=0` whose hash is NOT a valid Ed25519
//! point. Seeds are concatenated without separators, so callers must
//! encode them unambiguously (fixed-width keys, or a final variable seed).

use sha2::{Digest, Sha256};

use crate::address::Pubkey;
use crate::error::SolError;

/// Maximum byte length of a single seed.
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, including the bump.
pub const MAX_SEEDS: usize = 16;

/// The string appended to PDA derivation.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Find the canonical PDA for `seeds` under `program_id`.
///
/// Returns the address together with the bump that produced it. The same
/// inputs always give the same `(address, bump)`, so callers can compute an
/// account address before the account exists.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), SolError> {
    check_seeds(seeds, MAX_SEEDS - 1)?;

    for bump in (0u8..=255).rev() {
        if let Some(address) = hash_off_curve(seeds, &[bump], program_id) {
            return Ok((address, bump));
        }
    }

    Err(SolError::NoValidBumpFound)
}

/// Create a PDA from seeds that already include the bump.
///
/// Fails with `InvalidAddress` if the result lands on the curve.
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<Pubkey, SolError> {
    check_seeds(seeds, MAX_SEEDS)?;

    hash_off_curve(seeds, &[], program_id).ok_or_else(|| {
        SolError::InvalidAddress("derived address lies on the ed25519 curve".into())
    })
}

fn check_seeds(seeds: &[&[u8]], max_count: usize) -> Result<(), SolError> {
    if seeds.len() > max_count {
        return Err(SolError::TooManySeeds {
            count: seeds.len(),
            max: max_count,
        });
    }
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(SolError::MaxSeedLengthExceeded {
                index,
                len: seed.len(),
                max: MAX_SEED_LEN,
            });
        }
    }
    Ok(())
}

/// Hash seeds + bump + program id, returning `None` when the point is on the curve.
fn hash_off_curve(seeds: &[&[u8]], bump_seed: &[u8], program_id: &Pubkey) -> Option<Pubkey> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id.as_ref());
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(Pubkey::new_from_array(hash))
}

/// Check if 32 bytes decompress to an Ed25519 curve point.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}
