//! Canonical binary encoding for hashing and persistence.
//!
//! Everything that is hashed or written to disk goes through [`Encode`], so
//! this byte layout is part of the ledger format:
//!
//! - Integers: little-endian, fixed-width
//! - `usize`: widened to `u64`
//! - `bool`: single byte (0 = false, 1 = true)
//! - `String`/`Vec<T>`: 8-byte length prefix followed by the elements
//! - `Option<T>`: 1-byte tag (0 = None, 1 = Some) followed by the value
//! - `[u8; N]`: raw bytes without a length prefix

use ledger_derive::Error;

/// Destination for encoded bytes.
///
/// Implemented by byte buffers and by the hash builder, so a value can be
/// hashed without first being copied into a buffer.
pub trait EncodeSink {
    /// Appends the given bytes to the sink.
    fn write(&mut self, bytes: &[u8]);
}

impl EncodeSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Types with a canonical binary representation.
pub trait Encode {
    /// Writes the binary representation to the given sink.
    fn encode<S: EncodeSink>(&self, out: &mut S);

    /// Encodes into a fresh byte vector.
    fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// Errors that can occur while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("invalid value for {0}")]
    InvalidValue(&'static str),

    #[error("length prefix {0} exceeds the remaining input")]
    LengthOverflow(u64),

    #[error("{0} trailing bytes after the decoded value")]
    TrailingBytes(usize),
}

/// Types that can be rebuilt from their canonical encoding.
pub trait Decode: Sized {
    /// Decodes a value and advances `input` past the consumed bytes.
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError>;

    /// Decodes a value that must span all of `data`.
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut input = data;
        let value = Self::decode(&mut input)?;
        if !input.is_empty() {
            return Err(DecodeError::TrailingBytes(input.len()));
        }
        Ok(value)
    }
}

/// Splits `n` bytes off the front of `input`.
fn take<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], DecodeError> {
    if input.len() < n {
        return Err(DecodeError::UnexpectedEof);
    }
    let (bytes, rest) = input.split_at(n);
    *input = rest;
    Ok(bytes)
}

/// Reads a length prefix and rejects it if it cannot fit in what is left.
///
/// Every encodable element takes at least one byte, so a prefix larger than
/// the remaining input is always corrupt. Checking up front keeps a bad file
/// from triggering a huge allocation.
fn take_len(input: &mut &[u8]) -> Result<usize, DecodeError> {
    let len = u64::decode(input)?;
    match usize::try_from(len) {
        Ok(n) if n <= input.len() => Ok(n),
        _ => Err(DecodeError::LengthOverflow(len)),
    }
}

macro_rules! impl_int_codec {
    ($($t:ty),* $(,)?) => {
        $(
            impl Encode for $t {
                fn encode<S: EncodeSink>(&self, out: &mut S) {
                    out.write(&self.to_le_bytes());
                }
            }

            impl Decode for $t {
                fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
                    let bytes = take(input, size_of::<$t>())?;
                    let array = bytes
                        .try_into()
                        .map_err(|_| DecodeError::UnexpectedEof)?;
                    Ok(<$t>::from_le_bytes(array))
                }
            }
        )*
    };
}

impl_int_codec!(u8, u32, u64, i128, u128);

impl Encode for usize {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        (*self as u64).encode(out);
    }
}

impl Decode for usize {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        usize::try_from(u64::decode(input)?).map_err(|_| DecodeError::InvalidValue("usize"))
    }
}

impl Encode for bool {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&[*self as u8]);
    }
}

impl Decode for bool {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(input)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(DecodeError::InvalidValue("bool")),
        }
    }
}

impl Encode for str {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.len().encode(out);
        out.write(self.as_bytes());
    }
}

impl Encode for String {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.as_str().encode(out);
    }
}

impl Decode for String {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = take_len(input)?;
        let bytes = take(input, len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidValue("String"))
    }
}

impl<T: Encode> Encode for [T] {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.len().encode(out);
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.as_slice().encode(out);
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = take_len(input)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::decode(input)?);
        }
        Ok(items)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        match self {
            None => out.write(&[0]),
            Some(value) => {
                out.write(&[1]);
                value.encode(out);
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(input)? {
            0 => Ok(None),
            1 => Ok(Some(T::decode(input)?)),
            _ => Err(DecodeError::InvalidValue("Option tag")),
        }
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(self);
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let bytes = take(input, N)?;
        bytes.try_into().map_err(|_| DecodeError::UnexpectedEof)
    }
}
