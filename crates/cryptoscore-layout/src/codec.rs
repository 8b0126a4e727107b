//! Borsh-style primitive codec shared by account decoding and instruction
//! encoding.
//!
//! Little-endian fixed-width integers, 1-byte bools (0/1 only), 32-byte
//! keys, `u32`-length-prefixed UTF-8 strings, 1-byte `Option` tags and
//! 1-byte C-like enum tags. No padding between fields.

use chain_sol::Pubkey;

use crate::error::CodecError;

/// Bounds-checked cursor over a byte buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Start reading at `offset`. Reads past the end fail as usual.
    pub fn at(buf: &'a [u8], offset: usize) -> Self {
        Self { buf, offset }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.offset)
    }

    /// Consume exactly `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let available = self.remaining();
        if n > available || self.offset > self.buf.len() {
            return Err(CodecError::UnexpectedEof {
                offset: self.offset,
                expected: n,
                available,
            });
        }
        let slice = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    pub fn read<T: Decode>(&mut self) -> Result<T, CodecError> {
        T::decode(self)
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(CodecError::TrailingBytes {
                offset: self.offset,
                remaining,
            }),
        }
    }
}

/// Growable output buffer.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write<T: Encode + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.encode(self);
        self
    }

    pub fn put_slice(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

pub trait Decode: Sized {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError>;
}

pub trait Encode {
    fn encode(&self, writer: &mut Writer);
}

/// Read a `T` at `offset`, returning it with the offset just past it.
pub fn read_at<T: Decode>(buf: &[u8], offset: usize) -> Result<(T, usize), CodecError> {
    let mut reader = Reader::at(buf, offset);
    let value = reader.read()?;
    Ok((value, reader.offset()))
}

/// Serialize a single value.
pub fn to_bytes<T: Encode + ?Sized>(value: &T) -> Vec<u8> {
    let mut writer = Writer::new();
    writer.write(value);
    writer.into_bytes()
}

macro_rules! impl_int {
    ($($ty:ty),*) => {$(
        impl Decode for $ty {
            fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
                let bytes = reader.take(std::mem::size_of::<$ty>())?;
                let mut arr = [0u8; std::mem::size_of::<$ty>()];
                arr.copy_from_slice(bytes);
                Ok(<$ty>::from_le_bytes(arr))
            }
        }

        impl Encode for $ty {
            fn encode(&self, writer: &mut Writer) {
                writer.put_slice(&self.to_le_bytes());
            }
        }
    )*};
}

impl_int!(u8, u16, u32, u64, i8, i16, i32, i64);

impl Decode for bool {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let offset = reader.offset();
        match reader.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(CodecError::InvalidBool { offset, value }),
        }
    }
}

impl Encode for bool {
    fn encode(&self, writer: &mut Writer) {
        writer.put_slice(&[u8::from(*self)]);
    }
}

impl Decode for [u8; 32] {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let mut arr = [0u8; 32];
        arr.copy_from_slice(reader.take(32)?);
        Ok(arr)
    }
}

impl Encode for [u8; 32] {
    fn encode(&self, writer: &mut Writer) {
        writer.put_slice(self);
    }
}

impl Decode for Pubkey {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        reader.read::<[u8; 32]>().map(Pubkey::new_from_array)
    }
}

impl Encode for Pubkey {
    fn encode(&self, writer: &mut Writer) {
        writer.put_slice(self.as_ref());
    }
}

impl Decode for String {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let len = reader.read::<u32>()? as usize;
        let offset = reader.offset();
        let bytes = reader.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8 { offset })
    }
}

/// Length prefix for a byte run, saturating at `u32::MAX`.
fn length_prefix(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl Encode for str {
    /// Strings longer than `u32::MAX` bytes are cut so the prefix always
    /// matches the payload. Account strings are validated far below that.
    fn encode(&self, writer: &mut Writer) {
        let len = length_prefix(self.len());
        writer.write(&len);
        writer.put_slice(&self.as_bytes()[..len as usize]);
    }
}

impl Encode for String {
    fn encode(&self, writer: &mut Writer) {
        self.as_str().encode(writer);
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let offset = reader.offset();
        match reader.read::<u8>()? {
            0 => Ok(None),
            1 => Ok(Some(reader.read()?)),
            value => Err(CodecError::InvalidOptionTag { offset, value }),
        }
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, writer: &mut Writer) {
        match self {
            None => {
                writer.write(&0u8);
            }
            Some(value) => {
                writer.write(&1u8).write(value);
            }
        }
    }
}

/// A unit-only enum serialized as its 0-based variant index.
///
/// `VARIANTS` lists every variant in tag order: `VARIANTS[v.tag()] == v`.
pub trait TaggedEnum: Sized + Copy + PartialEq + 'static {
    const TYPE_NAME: &'static str;
    const VARIANTS: &'static [Self];

    fn tag(self) -> u8;

    fn from_tag(tag: u8) -> Option<Self> {
        Self::VARIANTS.get(tag as usize).copied()
    }
}

/// Implement [`Decode`]/[`Encode`] for [`TaggedEnum`] types.
macro_rules! impl_tagged_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl $crate::codec::Decode for $ty {
            fn decode(
                reader: &mut $crate::codec::Reader<'_>,
            ) -> Result<Self, $crate::error::CodecError> {
                let offset = reader.offset();
                let tag = reader.read::<u8>()?;
                <$ty as $crate::codec::TaggedEnum>::from_tag(tag).ok_or(
                    $crate::error::CodecError::UnknownVariant {
                        offset,
                        type_name: <$ty as $crate::codec::TaggedEnum>::TYPE_NAME,
                        tag,
                    },
                )
            }
        }

        impl $crate::codec::Encode for $ty {
            fn encode(&self, writer: &mut $crate::codec::Writer) {
                writer.write(&$crate::codec::TaggedEnum::tag(*self));
            }
        }
    )*};
}

pub(crate) use impl_tagged_codec;

#[cfg(test)]
mod tests {
    use super::*;

    // -- Integers ------------------------------------------------------------

    #[test]
    fn integers_are_little_endian() {
        assert_eq!(to_bytes(&0x0102u16), vec![0x02, 0x01]);
        assert_eq!(to_bytes(&-2i32), vec![0xfe, 0xff, 0xff, 0xff]);
        assert_eq!(to_bytes(&1u64), vec![1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn read_at_returns_new_offset() {
        let buf = [0xAA, 0x10, 0x00, 0x00, 0x00, 0xBB];
        let (value, next) = read_at::<u32>(&buf, 1).unwrap();
        assert_eq!(value, 16);
        assert_eq!(next, 5);
    }

    #[test]
    fn signed_extremes_survive() {
        for value in [i64::MIN, -1, 0, i64::MAX] {
            let (back, _) = read_at::<i64>(&to_bytes(&value), 0).unwrap();
            assert_eq!(back, value);
        }
    }

    #[test]
    fn truncated_integer_reports_offset_and_lengths() {
        let err = read_at::<u64>(&[1, 2, 3, 4, 5], 2).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnexpectedEof {
                offset: 2,
                expected: 8,
                available: 3
            }
        );
    }

    #[test]
    fn offset_past_end_reports_zero_available() {
        let err = read_at::<u8>(&[1, 2], 5).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnexpectedEof {
                offset: 5,
                expected: 1,
                available: 0
            }
        );
    }

    // -- Bool ----------------------------------------------------------------

    #[test]
    fn bool_accepts_only_zero_and_one() {
        assert!(!read_at::<bool>(&[0], 0).unwrap().0);
        assert!(read_at::<bool>(&[1], 0).unwrap().0);
        assert_eq!(
            read_at::<bool>(&[0, 2], 1).unwrap_err(),
            CodecError::InvalidBool {
                offset: 1,
                value: 2
            }
        );
    }

    // -- Strings -------------------------------------------------------------

    #[test]
    fn string_has_u32_length_prefix() {
        let bytes = to_bytes("EPL");
        assert_eq!(bytes, vec![3, 0, 0, 0, b'E', b'P', b'L']);
        assert_eq!(read_at::<String>(&bytes, 0).unwrap(), ("EPL".to_string(), 7));
    }

    #[test]
    fn string_length_prefix_saturates_instead_of_wrapping() {
        assert_eq!(length_prefix(0), 0);
        assert_eq!(length_prefix(64), 64);
        assert_eq!(length_prefix(u32::MAX as usize), u32::MAX);
        assert_eq!(length_prefix(usize::MAX), u32::MAX);
        // Multibyte text is prefixed with its byte length.
        assert_eq!(to_bytes("⚽é")[..4], 5u32.to_le_bytes());
    }

    #[test]
    fn string_length_beyond_buffer_fails() {
        let bytes = [10, 0, 0, 0, b'a', b'b'];
        assert_eq!(
            read_at::<String>(&bytes, 0).unwrap_err(),
            CodecError::UnexpectedEof {
                offset: 4,
                expected: 10,
                available: 2
            }
        );
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let bytes = [2, 0, 0, 0, 0xff, 0xfe];
        assert_eq!(
            read_at::<String>(&bytes, 0).unwrap_err(),
            CodecError::InvalidUtf8 { offset: 4 }
        );
    }

    // -- Keys and options ----------------------------------------------------

    #[test]
    fn pubkey_is_raw_32_bytes() {
        let key = Pubkey::new_from_array([9; 32]);
        let bytes = to_bytes(&key);
        assert_eq!(bytes, vec![9; 32]);
        assert_eq!(read_at::<Pubkey>(&bytes, 0).unwrap().0, key);
    }

    #[test]
    fn option_tags() {
        assert_eq!(to_bytes(&None::<u8>), vec![0]);
        assert_eq!(to_bytes(&Some(7u8)), vec![1, 7]);
        assert_eq!(read_at::<Option<u8>>(&[1, 7], 0).unwrap().0, Some(7));
        assert_eq!(
            read_at::<Option<u8>>(&[2, 7], 0).unwrap_err(),
            CodecError::InvalidOptionTag {
                offset: 0,
                value: 2
            }
        );
    }

    // -- Reader --------------------------------------------------------------

    #[test]
    fn finish_detects_trailing_bytes() {
        let mut reader = Reader::new(&[1, 2, 3]);
        reader.read::<u16>().unwrap();
        assert_eq!(
            reader.finish().unwrap_err(),
            CodecError::TrailingBytes {
                offset: 2,
                remaining: 1
            }
        );
        reader.read::<u8>().unwrap();
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn writer_chains_fields_without_padding() {
        let mut writer = Writer::with_capacity(16);
        writer.write(&1u8).write(&true).write(&2u16).write("x");
        assert_eq!(writer.into_bytes(), vec![1, 1, 2, 0, 1, 0, 0, 0, b'x']);
    }
}
