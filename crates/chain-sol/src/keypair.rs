//! Ed25519 keypairs for transaction signers.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};
use rand_core::OsRng;
use zeroize::Zeroize;

use crate::address::Pubkey;
use crate::error::SolError;
use crate::transaction::Signature;

/// An Ed25519 signing identity. The secret is zeroized on drop by `ed25519-dalek`.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh random keypair, e.g. for a brand new account address.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Build a keypair from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut copy = *seed;
        let signing_key = SigningKey::from_bytes(&copy);
        copy.zeroize();
        Self { signing_key }
    }

    /// Build a keypair from the 64-byte `secret || public` layout used by
    /// Solana CLI keypair files. The public half must match the secret.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, SolError> {
        let arr: &[u8; 64] = bytes.try_into().map_err(|_| {
            SolError::InvalidPrivateKey(format!("expected 64 bytes, got {}", bytes.len()))
        })?;
        let signing_key = SigningKey::from_keypair_bytes(arr)
            .map_err(|e| SolError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign_message(&self, message: &[u8]) -> Signature {
        Signature::new(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::VerifyingKey;

    #[test]
    fn from_seed_is_deterministic() {
        let a = Keypair::from_seed(&[0x42; 32]);
        let b = Keypair::from_seed(&[0x42; 32]);
        assert_eq!(a.pubkey(), b.pubkey());
    }

    #[test]
    fn generated_keypairs_differ() {
        assert_ne!(Keypair::generate().pubkey(), Keypair::generate().pubkey());
    }

    #[test]
    fn signature_verifies() {
        let keypair = Keypair::from_seed(&[0x55; 32]);
        let sig = keypair.sign_message(b"hello");

        let vk = VerifyingKey::from_bytes(keypair.pubkey().as_array()).unwrap();
        let dalek_sig = ed25519_dalek::Signature::from_bytes(sig.as_bytes());
        assert!(vk.verify_strict(b"hello", &dalek_sig).is_ok());
    }

    #[test]
    fn keypair_bytes_roundtrip() {
        let keypair = Keypair::from_seed(&[0x07; 32]);
        let mut bytes = vec![0x07u8; 32];
        bytes.extend_from_slice(keypair.pubkey().as_ref());

        let restored = Keypair::from_keypair_bytes(&bytes).unwrap();
        assert_eq!(restored.pubkey(), keypair.pubkey());
    }

    #[test]
    fn keypair_bytes_mismatched_public_half_fails() {
        let mut bytes = vec![0x07u8; 32];
        bytes.extend_from_slice(&[0x01; 32]);
        assert!(Keypair::from_keypair_bytes(&bytes).is_err());
    }

    #[test]
    fn keypair_bytes_wrong_length_fails() {
        let err = Keypair::from_keypair_bytes(&[0u8; 32]).unwrap_err();
        assert!(err.to_string().contains("expected 64 bytes"));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let debug = format!("{keypair:?}");
        assert!(debug.contains("pubkey"));
        assert!(!debug.contains("signing_key"));
    }
}
