//! Legacy Solana transaction wire format, built by hand.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use std::fmt;

use ed25519_dalek::VerifyingKey;

use crate::address::Pubkey;
use crate::error::SolError;
use crate::keypair::Keypair;

/// The System Program: 32 zero bytes (`11111111111111111111111111111111`).
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

/// Upper bound on a serialized transaction accepted by the network.
pub const PACKET_DATA_SIZE: usize = 1232;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` in Solana's compact-u16 (LEB128-style) format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 from the front of `data`.
///
/// Returns `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            SolError::SerializationError("unexpected end of data while decoding compact-u16".into())
        })?;
        value |= ((byte & 0x7f) as u32) << (7 * consumed);
        consumed += 1;

        if byte & 0x80 == 0 {
            break;
        }
        if consumed == 3 {
            return Err(SolError::SerializationError(
                "compact-u16 longer than 3 bytes".into(),
            ));
        }
    }

    let value = u16::try_from(value)
        .map_err(|_| SolError::SerializationError("compact-u16 value overflow".into()))?;

    Ok((value, consumed))
}

fn len_u16(len: usize, what: &str) -> Result<u16, SolError> {
    u16::try_from(len)
        .map_err(|_| SolError::SerializationError(format!("too many {what}: {len}")))
}

// ---------------------------------------------------------------------------
// Hash and signature
// ---------------------------------------------------------------------------

/// A 32-byte blockhash.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Hash([u8; 32]);

impl Hash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({self})")
    }
}

impl std::str::FromStr for Hash {
    type Err = SolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| SolError::SerializationError(format!("bad blockhash: {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            SolError::SerializationError(format!("blockhash must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

/// A 64-byte Ed25519 signature. The first signature of a transaction is its id.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

impl Signature {
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Verify this signature against `pubkey` over `message`.
    pub fn verify(&self, pubkey: &Pubkey, message: &[u8]) -> bool {
        let Ok(vk) = VerifyingKey::from_bytes(pubkey.as_array()) else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(&self.0);
        vk.verify_strict(message, &sig).is_ok()
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    /// A writable account.
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// A read-only account.
    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction before it is compiled into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// An instruction whose account references are u8 indices into
/// the message's `account_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A compiled message: the bytes every signer signs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Number of required signatures (the first N account keys).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,
    /// All keys in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Compile instructions into a message paid for by `fee_payer`.
    ///
    /// Accounts referenced by several instructions are merged, keeping the
    /// strongest permission seen. Each instruction keeps its own account
    /// order; only the message-level key table is re-sorted.
    pub fn compile(
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        recent_blockhash: Hash,
    ) -> Result<Self, SolError> {
        struct AccountEntry {
            pubkey: Pubkey,
            is_signer: bool,
            is_writable: bool,
        }

        if instructions.is_empty() {
            return Err(SolError::TransactionBuildError(
                "transaction has no instructions".into(),
            ));
        }

        let mut entries: Vec<AccountEntry> = Vec::new();

        let mut upsert = |pubkey: Pubkey, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(AccountEntry {
                    pubkey,
                    is_signer: signer,
                    is_writable: writable,
                });
            }
        };

        // Fee payer is always signer + writable and comes first.
        upsert(*fee_payer, true, true);

        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        // Stable sort keeps insertion order within a category, so the fee
        // payer stays at index 0.
        entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
            (true, true) => 0u8,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        if entries.len() > u8::MAX as usize + 1 {
            return Err(SolError::TransactionBuildError(format!(
                "too many accounts: {}",
                entries.len()
            )));
        }

        let count = |pred: fn(&AccountEntry) -> bool| entries.iter().filter(|e| pred(e)).count() as u8;
        let num_required_signatures = count(|e| e.is_signer);
        let num_readonly_signed = count(|e| e.is_signer && !e.is_writable);
        let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable);

        let account_keys: Vec<Pubkey> = entries.iter().map(|e| e.pubkey).collect();

        let index_of = |key: &Pubkey| -> Result<u8, SolError> {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .ok_or_else(|| {
                    SolError::TransactionBuildError(format!("{key} missing from account keys"))
                })
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            let account_indices = ix
                .accounts
                .iter()
                .map(|meta| index_of(&meta.pubkey))
                .collect::<Result<Vec<u8>, _>>()?;

            compiled.push(CompiledInstruction {
                program_id_index: index_of(&ix.program_id)?,
                account_indices,
                data: ix.data.clone(),
            });
        }

        Ok(Self {
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    /// The keys that must sign, in signature-slot order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        let n = (self.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.account_keys.first()
    }

    /// Whether the key at `index` is writable under the header rules.
    pub fn is_writable(&self, index: usize) -> bool {
        let signers = self.num_required_signatures as usize;
        if index < signers {
            signers
                .checked_sub(self.num_readonly_signed as usize)
                .is_some_and(|writable| index < writable)
        } else {
            self.account_keys
                .len()
                .checked_sub(self.num_readonly_unsigned as usize)
                .is_some_and(|writable| index < writable)
        }
    }

    /// Header counts must fit inside the account list.
    fn check_header(&self) -> Result<(), SolError> {
        let signers = self.num_required_signatures as usize;
        if self.num_readonly_signed as usize > signers {
            return Err(SolError::SerializationError(format!(
                "{} readonly signers but only {signers} signers",
                self.num_readonly_signed
            )));
        }
        let unsigned = self.account_keys.len().checked_sub(signers).ok_or_else(|| {
            SolError::SerializationError(format!(
                "{signers} signers but only {} accounts",
                self.account_keys.len()
            ))
        })?;
        if self.num_readonly_unsigned as usize > unsigned {
            return Err(SolError::SerializationError(format!(
                "{} readonly unsigned accounts but only {unsigned} unsigned",
                self.num_readonly_unsigned
            )));
        }
        Ok(())
    }

    /// Serialize the message (the bytes that get signed).
    pub fn serialize(&self) -> Result<Vec<u8>, SolError> {
        let mut buf = Vec::with_capacity(256);

        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed);
        buf.push(self.num_readonly_unsigned);

        buf.extend_from_slice(&encode_compact_u16(len_u16(self.account_keys.len(), "accounts")?));
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_ref());
        }

        buf.extend_from_slice(&self.recent_blockhash.to_bytes());

        buf.extend_from_slice(&encode_compact_u16(len_u16(
            self.instructions.len(),
            "instructions",
        )?));
        for ix in &self.instructions {
            buf.push(ix.program_id_index);

            buf.extend_from_slice(&encode_compact_u16(len_u16(
                ix.account_indices.len(),
                "instruction accounts",
            )?));
            buf.extend_from_slice(&ix.account_indices);

            buf.extend_from_slice(&encode_compact_u16(len_u16(ix.data.len(), "data bytes")?));
            buf.extend_from_slice(&ix.data);
        }

        Ok(buf)
    }

    /// Parse a serialized message.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, SolError> {
        let mut cursor = WireCursor { data: bytes, pos: 0 };

        let num_required_signatures = cursor.byte()?;
        let num_readonly_signed = cursor.byte()?;
        let num_readonly_unsigned = cursor.byte()?;

        let num_accounts = cursor.compact()?;
        let mut account_keys = Vec::with_capacity(num_accounts);
        for _ in 0..num_accounts {
            account_keys.push(Pubkey::try_from_slice(cursor.take(32)?)?);
        }

        let blockhash: [u8; 32] = cursor
            .take(32)?
            .try_into()
            .map_err(|_| SolError::SerializationError("short blockhash".into()))?;

        let num_instructions = cursor.compact()?;
        let mut instructions = Vec::with_capacity(num_instructions);
        for _ in 0..num_instructions {
            let program_id_index = cursor.byte()?;
            let n = cursor.compact()?;
            let account_indices = cursor.take(n)?.to_vec();
            let len = cursor.compact()?;
            let data = cursor.take(len)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                account_indices,
                data,
            });
        }

        if cursor.pos != bytes.len() {
            return Err(SolError::SerializationError(format!(
                "{} trailing bytes after message",
                bytes.len() - cursor.pos
            )));
        }

        let message = Self {
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            account_keys,
            recent_blockhash: Hash::new(blockhash),
            instructions,
        };
        message.check_header()?;
        Ok(message)
    }
}

struct WireCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireCursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], SolError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.data.len());
        let end = end.ok_or_else(|| {
            SolError::SerializationError(format!(
                "need {n} bytes at offset {}, only {} left",
                self.pos,
                self.data.len() - self.pos
            ))
        })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, SolError> {
        Ok(self.take(1)?[0])
    }

    fn compact(&mut self) -> Result<usize, SolError> {
        let (value, used) = decode_compact_u16(&self.data[self.pos..])?;
        self.pos += used;
        Ok(value as usize)
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A signed (or partially signed) transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl Transaction {
    /// Sign `message` with `signers`.
    ///
    /// Every required signer in the message must have a matching keypair;
    /// otherwise this fails with `IncompleteSignatures` listing the missing
    /// keys. Keypairs that the message does not require are ignored.
    pub fn sign(message: Message, signers: &[&Keypair]) -> Result<Self, SolError> {
        let message_bytes = message.serialize()?;

        let mut signatures = Vec::with_capacity(message.num_required_signatures as usize);
        let mut missing = Vec::new();

        for key in message.signer_keys() {
            match signers.iter().find(|kp| kp.pubkey() == *key) {
                Some(kp) => signatures.push(kp.sign_message(&message_bytes)),
                None => missing.push(key.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(SolError::IncompleteSignatures { missing });
        }

        Ok(Self {
            signatures,
            message,
        })
    }

    /// The transaction id (first signature).
    pub fn signature(&self) -> Option<&Signature> {
        self.signatures.first()
    }

    /// Serialize to wire format, ready for `sendTransaction`.
    pub fn serialize(&self) -> Result<Vec<u8>, SolError> {
        let message_bytes = self.message.serialize()?;
        let mut wire = Vec::with_capacity(3 + 64 * self.signatures.len() + message_bytes.len());

        wire.extend_from_slice(&encode_compact_u16(len_u16(
            self.signatures.len(),
            "signatures",
        )?));
        for sig in &self.signatures {
            wire.extend_from_slice(sig.as_bytes());
        }
        wire.extend_from_slice(&message_bytes);

        if wire.len() > PACKET_DATA_SIZE {
            return Err(SolError::TransactionBuildError(format!(
                "transaction is {} bytes, max is {PACKET_DATA_SIZE}",
                wire.len()
            )));
        }

        Ok(wire)
    }

    /// Parse a wire-format transaction.
    pub fn deserialize(wire: &[u8]) -> Result<Self, SolError> {
        let (num_sigs, prefix) = decode_compact_u16(wire)?;
        if num_sigs == 0 {
            return Err(SolError::SerializationError(
                "transaction has zero signatures".into(),
            ));
        }

        let sigs_end = prefix + num_sigs as usize * 64;
        if sigs_end > wire.len() {
            return Err(SolError::SerializationError(
                "transaction too short: signature slots exceed length".into(),
            ));
        }

        let signatures = wire[prefix..sigs_end]
            .chunks_exact(64)
            .map(|chunk| {
                let mut arr = [0u8; 64];
                arr.copy_from_slice(chunk);
                Signature::new(arr)
            })
            .collect();

        let message = Message::deserialize(&wire[sigs_end..])?;
        if u16::from(message.num_required_signatures) != num_sigs {
            return Err(SolError::SerializationError(format!(
                "{num_sigs} signatures but message requires {}",
                message.num_required_signatures
            )));
        }

        Ok(Self {
            signatures,
            message,
        })
    }

    /// Check every signature against its signer key.
    pub fn verify(&self) -> Result<(), SolError> {
        let message_bytes = self.message.serialize()?;
        for (sig, key) in self.signatures.iter().zip(self.message.signer_keys()) {
            if !sig.verify(key, &message_bytes) {
                return Err(SolError::SigningError(format!("bad signature for {key}")));
            }
        }
        Ok(())
    }
}
