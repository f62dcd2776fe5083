//! Wire Codec - Cursor-Based Little-Endian IO
//!
//! This module provides the byte-level cursor contexts every coder writes
//! through. Key features:
//!
//! - Zero-copy reads (borrowed slices)
//! - Caller-sized output buffers with overflow detection
//! - Fixed little-endian integers, 1-byte booleans, u32 length prefixes
//! - Type-safe encode/decode traits for the fixed-format built-in coders

use std::fmt;
use thiserror::Error;

use crate::crypto::{Discriminator, Pubkey, DISCRIMINATOR_LEN, PUBKEY_BYTES};

// ============================================================================
// Codec Errors
// ============================================================================

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Buffer does not have enough space for encoding
    #[error("buffer overflow: need {needed} bytes, have {available}")]
    BufferOverflow { needed: usize, available: usize },

    /// Not enough data in buffer to decode
    #[error("buffer underflow: need {needed} bytes, have {available}")]
    BufferUnderflow { needed: usize, available: usize },

    /// Data does not represent a valid value
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A value does not have the shape its layout requires
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Nesting through named types went deeper than allowed
    #[error("maximum nesting depth {0} exceeded")]
    DepthExceeded(usize),
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

// ============================================================================
// Encode Context
// ============================================================================

/// Context for encoding operations
///
/// Writes into a caller-provided buffer. Coders size that buffer from the
/// value's exact encoded length, so an overflow here signals a sizing bug
/// rather than being silently truncated.
pub struct EncodeContext<'a> {
    /// Mutable buffer to write into
    buffer: &'a mut [u8],
    /// Current byte position in buffer
    cursor: usize,
}

impl<'a> EncodeContext<'a> {
    /// Create a new encode context with the given buffer
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Get current cursor position (bytes written)
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Get remaining capacity in bytes
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    /// Write raw bytes to the buffer
    pub fn write_bytes(&mut self, data: &[u8]) -> CodecResult<usize> {
        let len = data.len();
        if self.remaining() < len {
            return Err(CodecError::BufferOverflow {
                needed: len,
                available: self.remaining(),
            });
        }

        self.buffer[self.cursor..self.cursor + len].copy_from_slice(data);
        self.cursor += len;
        Ok(len)
    }

    /// Write a single byte
    #[inline]
    pub fn write_byte(&mut self, byte: u8) -> CodecResult<usize> {
        if self.remaining() < 1 {
            return Err(CodecError::BufferOverflow {
                needed: 1,
                available: 0,
            });
        }

        self.buffer[self.cursor] = byte;
        self.cursor += 1;
        Ok(1)
    }

    /// Write a u32 length prefix
    pub fn write_len(&mut self, len: usize) -> CodecResult<usize> {
        let len = u32::try_from(len)
            .map_err(|_| CodecError::InvalidData(format!("length {} exceeds u32", len)))?;
        self.write_bytes(&len.to_le_bytes())
    }

    /// Get a reference to the written portion of the buffer
    pub fn written(&self) -> &[u8] {
        &self.buffer[..self.cursor]
    }
}

impl fmt::Debug for EncodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeContext")
            .field("cursor", &self.cursor)
            .field("remaining", &self.remaining())
            .finish()
    }
}

// ============================================================================
// Decode Context
// ============================================================================

/// Context for decoding operations
///
/// Provides an immutable buffer and cursor for zero-copy deserialization.
pub struct DecodeContext<'a> {
    /// Immutable buffer to read from
    buffer: &'a [u8],
    /// Current byte position in buffer
    cursor: usize,
}

impl<'a> DecodeContext<'a> {
    /// Create a new decode context with the given buffer
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Get current cursor position (bytes read)
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Get remaining bytes to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    /// Read raw bytes from the buffer (zero-copy slice)
    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(CodecError::BufferUnderflow {
                needed: len,
                available: self.remaining(),
            });
        }

        let slice = &self.buffer[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    /// Read exactly `N` bytes into an array
    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.read_bytes(N)?);
        Ok(arr)
    }

    /// Read a single byte
    #[inline]
    pub fn read_byte(&mut self) -> CodecResult<u8> {
        if self.remaining() < 1 {
            return Err(CodecError::BufferUnderflow {
                needed: 1,
                available: 0,
            });
        }

        let byte = self.buffer[self.cursor];
        self.cursor += 1;
        Ok(byte)
    }

    /// Read a u32 length prefix
    ///
    /// The length is checked against the remaining input so a corrupt
    /// prefix cannot trigger a huge allocation.
    pub fn read_len(&mut self, min_element_size: usize) -> CodecResult<usize> {
        let len = u32::from_le_bytes(self.read_array::<4>()?) as usize;
        let needed = len.saturating_mul(min_element_size);
        if needed > self.remaining() {
            return Err(CodecError::BufferUnderflow {
                needed,
                available: self.remaining(),
            });
        }
        Ok(len)
    }

    /// Peek at the next byte without consuming it
    pub fn peek_byte(&self) -> CodecResult<u8> {
        self.buffer
            .get(self.cursor)
            .copied()
            .ok_or(CodecError::BufferUnderflow {
                needed: 1,
                available: 0,
            })
    }

    /// Get a reference to the remaining buffer
    pub fn remaining_buffer(&self) -> &'a [u8] {
        &self.buffer[self.cursor.min(self.buffer.len())..]
    }
}

impl fmt::Debug for DecodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeContext")
            .field("cursor", &self.cursor)
            .field("remaining", &self.remaining())
            .finish()
    }
}

// ============================================================================
// Codec Trait
// ============================================================================

/// Trait for statically-typed values with a fixed wire encoding
///
/// Used by the built-in program coders, whose instruction layouts are known
/// at compile time rather than derived from a schema.
pub trait Codec: Sized {
    /// Encode this value into the context buffer
    ///
    /// Returns the number of bytes written on success.
    fn encode(&self, ctx: &mut EncodeContext) -> CodecResult<usize>;

    /// Decode a value from the context buffer
    fn decode(ctx: &mut DecodeContext) -> CodecResult<Self>;

    /// Exact encoded size of this value
    fn encoded_size(&self) -> usize;
}

/// Encode a value into a freshly allocated buffer of exactly its size
pub fn encode_to_vec<T: Codec>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buf = vec![0u8; value.encoded_size()];
    let mut ctx = EncodeContext::new(&mut buf);
    value.encode(&mut ctx)?;
    Ok(buf)
}

// ============================================================================
// Primitive Type Implementations
// ============================================================================

/// Helper macro for implementing Codec on little-endian number types
macro_rules! impl_codec_le {
    ($ty:ty, $size:expr) => {
        impl Codec for $ty {
            fn encode(&self, ctx: &mut EncodeContext) -> CodecResult<usize> {
                ctx.write_bytes(&self.to_le_bytes())
            }

            fn decode(ctx: &mut DecodeContext) -> CodecResult<Self> {
                Ok(Self::from_le_bytes(ctx.read_array::<$size>()?))
            }

            fn encoded_size(&self) -> usize {
                $size
            }
        }
    };
}

impl_codec_le!(u8, 1);
impl_codec_le!(u16, 2);
impl_codec_le!(u32, 4);
impl_codec_le!(u64, 8);
impl_codec_le!(u128, 16);
impl_codec_le!(i8, 1);
impl_codec_le!(i16, 2);
impl_codec_le!(i32, 4);
impl_codec_le!(i64, 8);
impl_codec_le!(i128, 16);
impl_codec_le!(f32, 4);
impl_codec_le!(f64, 8);

// Boolean
impl Codec for bool {
    fn encode(&self, ctx: &mut EncodeContext) -> CodecResult<usize> {
        ctx.write_byte(u8::from(*self))
    }

    fn decode(ctx: &mut DecodeContext) -> CodecResult<Self> {
        let byte = ctx.read_byte()?;
        match byte {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(CodecError::InvalidData(format!(
                "invalid boolean value: {}",
                byte
            ))),
        }
    }

    fn encoded_size(&self) -> usize {
        1
    }
}

// ============================================================================
// Variable-Length Types
// ============================================================================

/// Vec<u8> with u32 length prefix
impl Codec for Vec<u8> {
    fn encode(&self, ctx: &mut EncodeContext) -> CodecResult<usize> {
        let mut written = ctx.write_len(self.len())?;
        written += ctx.write_bytes(self)?;
        Ok(written)
    }

    fn decode(ctx: &mut DecodeContext) -> CodecResult<Self> {
        let len = ctx.read_len(1)?;
        Ok(ctx.read_bytes(len)?.to_vec())
    }

    fn encoded_size(&self) -> usize {
        4 + self.len()
    }
}

/// String with u32 length prefix (UTF-8)
impl Codec for String {
    fn encode(&self, ctx: &mut EncodeContext) -> CodecResult<usize> {
        let mut written = ctx.write_len(self.len())?;
        written += ctx.write_bytes(self.as_bytes())?;
        Ok(written)
    }

    fn decode(ctx: &mut DecodeContext) -> CodecResult<Self> {
        let len = ctx.read_len(1)?;
        let bytes = ctx.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CodecError::InvalidData(format!("invalid UTF-8 string: {}", e)))
    }

    fn encoded_size(&self) -> usize {
        4 + self.len()
    }
}

// ============================================================================
// Keys and discriminators (fixed, no prefix)
// ============================================================================

impl Codec for Pubkey {
    fn encode(&self, ctx: &mut EncodeContext) -> CodecResult<usize> {
        ctx.write_bytes(self.as_bytes())
    }

    fn decode(ctx: &mut DecodeContext) -> CodecResult<Self> {
        Ok(Pubkey::new_from_array(ctx.read_array::<PUBKEY_BYTES>()?))
    }

    fn encoded_size(&self) -> usize {
        PUBKEY_BYTES
    }
}

impl Codec for Discriminator {
    fn encode(&self, ctx: &mut EncodeContext) -> CodecResult<usize> {
        ctx.write_bytes(self.as_bytes())
    }

    fn decode(ctx: &mut DecodeContext) -> CodecResult<Self> {
        Ok(Discriminator::from_bytes(ctx.read_array::<DISCRIMINATOR_LEN>()?))
    }

    fn encoded_size(&self) -> usize {
        DISCRIMINATOR_LEN
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_little_endian() {
        let mut buf = [0u8; 16];
        let value: u16 = 0x1234;

        let mut enc = EncodeContext::new(&mut buf);
        value.encode(&mut enc).unwrap();
        assert_eq!(enc.position(), 2);
        assert_eq!(&buf[..2], &[0x34, 0x12]);

        let mut dec = DecodeContext::new(&buf);
        assert_eq!(u16::decode(&mut dec).unwrap(), value);
    }

    #[test]
    fn test_u64_scenario_bytes() {
        let bytes = encode_to_vec(&1234u64).unwrap();
        assert_eq!(bytes, vec![0xD2, 0x04, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_i128_roundtrip() {
        let value: i128 = i128::MIN + 7;
        let bytes = encode_to_vec(&value).unwrap();
        assert_eq!(bytes.len(), 16);

        let mut dec = DecodeContext::new(&bytes);
        assert_eq!(i128::decode(&mut dec).unwrap(), value);
    }

    #[test]
    fn test_bool_invalid() {
        let buf = [2u8];
        let mut dec = DecodeContext::new(&buf);
        let result = bool::decode(&mut dec);
        assert!(matches!(result, Err(CodecError::InvalidData(_))));
    }

    #[test]
    fn test_vec_u8_length_prefix() {
        let value: Vec<u8> = vec![1, 2, 3];
        let bytes = encode_to_vec(&value).unwrap();
        assert_eq!(bytes, vec![3, 0, 0, 0, 1, 2, 3]);

        let mut dec = DecodeContext::new(&bytes);
        assert_eq!(Vec::<u8>::decode(&mut dec).unwrap(), value);
    }

    #[test]
    fn test_string_roundtrip() {
        let value = String::from("hello, coder");
        let bytes = encode_to_vec(&value).unwrap();
        assert_eq!(bytes.len(), 4 + value.len());

        let mut dec = DecodeContext::new(&bytes);
        assert_eq!(String::decode(&mut dec).unwrap(), value);
    }

    #[test]
    fn test_string_invalid_utf8() {
        let buf = [2, 0, 0, 0, 0xFF, 0xFE];
        let mut dec = DecodeContext::new(&buf);
        assert!(matches!(
            String::decode(&mut dec),
            Err(CodecError::InvalidData(_))
        ));
    }

    #[test]
    fn test_pubkey_raw_bytes() {
        let key = Pubkey::new_from_array([9u8; 32]);
        let bytes = encode_to_vec(&key).unwrap();
        assert_eq!(bytes, vec![9u8; 32]);
    }

    #[test]
    fn test_buffer_overflow() {
        let mut buf = [0u8; 2];
        let mut enc = EncodeContext::new(&mut buf);
        let result = 0x12345678u32.encode(&mut enc);
        assert!(matches!(result, Err(CodecError::BufferOverflow { .. })));
    }

    #[test]
    fn test_buffer_underflow() {
        let buf = [0u8; 2];
        let mut dec = DecodeContext::new(&buf);
        let result = u32::decode(&mut dec);
        assert!(matches!(result, Err(CodecError::BufferUnderflow { .. })));
    }

    #[test]
    fn test_corrupt_length_prefix() {
        // Claims 4 billion elements with two bytes of payload
        let buf = [0xFF, 0xFF, 0xFF, 0xFF, 1, 2];
        let mut dec = DecodeContext::new(&buf);
        assert!(matches!(
            dec.read_len(1),
            Err(CodecError::BufferUnderflow { .. })
        ));
    }

    #[test]
    fn test_context_remaining_buffer() {
        let buf = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut dec = DecodeContext::new(&buf);

        u32::decode(&mut dec).unwrap();
        assert_eq!(dec.remaining_buffer(), &[5, 6, 7, 8]);
        assert_eq!(dec.peek_byte().unwrap(), 5);
        assert_eq!(dec.position(), 4);
    }

    #[test]
    fn test_context_written() {
        let mut buf = [0u8; 16];
        let mut enc = EncodeContext::new(&mut buf);

        42u32.encode(&mut enc).unwrap();
        assert_eq!(enc.written().len(), 4);
        assert_eq!(enc.remaining(), 12);
    }
}
