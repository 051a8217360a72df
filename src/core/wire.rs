//! # Primitive Codec
//!
//! Fixed-width big-endian integers and length-prefixed strings, the only two
//! shapes every SFTP field is built from.
//!
//! ## Wire Format
//! ```text
//! uint32  := 4 bytes, big-endian
//! uint64  := 8 bytes, big-endian
//! string  := uint32(len) || len raw bytes (no terminator)
//! ```
//!
//! Decoding comes in two families. The `get_*` functions are unchecked and panic
//! if the buffer is short; they are only used where the caller already proved the
//! length (for example the 4-byte frame header after a full read). The `take_*`
//! functions are checked and return [`ProtocolError::ShortPacket`] instead of
//! reading past the end, including when a declared string length exceeds the
//! bytes that remain. Peer-controlled bodies are always decoded with `take_*`.
//!
//! All decoders advance the `&mut &[u8]` cursor past what they consumed.

use bytes::{Buf, BufMut};

use crate::error::{ProtocolError, Result};

/// Encoded size of a length-prefixed string
#[inline]
pub fn string_len(s: &[u8]) -> usize {
    4 + s.len()
}

/// Append `v` as 4 big-endian bytes
#[inline]
pub fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.put_u32(v);
}

/// Append `v` as 8 big-endian bytes
#[inline]
pub fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.put_u64(v);
}

/// Append a length-prefixed byte string
#[inline]
pub fn put_bytes(buf: &mut Vec<u8>, v: &[u8]) {
    buf.put_u32(v.len() as u32);
    buf.put_slice(v);
}

/// Append a length-prefixed UTF-8 string
#[inline]
pub fn put_string(buf: &mut Vec<u8>, v: &str) {
    put_bytes(buf, v.as_bytes());
}

/// Read a uint32 without a length check.
///
/// # Panics
/// Panics if fewer than 4 bytes remain.
#[inline]
pub fn get_u32(buf: &mut &[u8]) -> u32 {
    buf.get_u32()
}

/// Read a uint64 without a length check.
///
/// # Panics
/// Panics if fewer than 8 bytes remain.
#[inline]
pub fn get_u64(buf: &mut &[u8]) -> u64 {
    buf.get_u64()
}

/// Read a uint32, failing with `ShortPacket` if fewer than 4 bytes remain
#[inline]
pub fn take_u32(buf: &mut &[u8]) -> Result<u32> {
    if buf.len() < 4 {
        return Err(ProtocolError::ShortPacket);
    }
    Ok(get_u32(buf))
}

/// Read a uint64, failing with `ShortPacket` if fewer than 8 bytes remain
#[inline]
pub fn take_u64(buf: &mut &[u8]) -> Result<u64> {
    if buf.len() < 8 {
        return Err(ProtocolError::ShortPacket);
    }
    Ok(get_u64(buf))
}

/// Split off exactly `n` raw bytes
pub fn take_raw<'a>(buf: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if n > buf.len() {
        return Err(ProtocolError::ShortPacket);
    }
    let whole: &'a [u8] = *buf;
    let (head, tail) = whole.split_at(n);
    *buf = tail;
    Ok(head)
}

/// Read a length-prefixed byte string.
///
/// The declared length is validated against the remaining buffer before any
/// bytes are touched.
pub fn take_bytes<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8]> {
    let mut cursor = *buf;
    let n = take_u32(&mut cursor)? as usize;
    let bytes = take_raw(&mut cursor, n)?;
    *buf = cursor;
    Ok(bytes)
}

/// Read a length-prefixed string that must be valid UTF-8
pub fn take_string(buf: &mut &[u8]) -> Result<String> {
    let bytes = take_bytes(buf)?;
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| ProtocolError::InvalidString)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_integers_are_big_endian() {
        let mut buf = Vec::new();
        put_u32(&mut buf, 0x0102_0304);
        put_u64(&mut buf, 0x0A0B_0C0D_0E0F_1011);
        assert_eq!(
            buf,
            [1, 2, 3, 4, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11]
        );

        let mut cursor = &buf[..];
        assert_eq!(take_u32(&mut cursor).unwrap(), 0x0102_0304);
        assert_eq!(take_u64(&mut cursor).unwrap(), 0x0A0B_0C0D_0E0F_1011);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_string_has_no_terminator() {
        let mut buf = Vec::new();
        put_string(&mut buf, "abc");
        assert_eq!(buf, [0, 0, 0, 3, b'a', b'b', b'c']);
        assert_eq!(buf.len(), string_len(b"abc"));
    }

    #[test]
    fn test_empty_string() {
        let mut buf = Vec::new();
        put_string(&mut buf, "");
        let mut cursor = &buf[..];
        assert_eq!(take_string(&mut cursor).unwrap(), "");
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_checked_integers_reject_short_input() {
        for len in 0..4 {
            let data = vec![0xFF; len];
            let mut cursor = &data[..];
            assert!(matches!(
                take_u32(&mut cursor),
                Err(ProtocolError::ShortPacket)
            ));
        }
        for len in 0..8 {
            let data = vec![0xFF; len];
            let mut cursor = &data[..];
            assert!(matches!(
                take_u64(&mut cursor),
                Err(ProtocolError::ShortPacket)
            ));
        }
    }

    #[test]
    fn test_declared_string_length_beyond_buffer() {
        // Claims 16 bytes, carries 3
        let data = [0, 0, 0, 16, b'a', b'b', b'c'];
        let mut cursor = &data[..];
        assert!(matches!(
            take_string(&mut cursor),
            Err(ProtocolError::ShortPacket)
        ));
        // Cursor is left untouched on failure
        assert_eq!(cursor.len(), data.len());
    }

    #[test]
    fn test_huge_declared_length() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0];
        let mut cursor = &data[..];
        assert!(matches!(
            take_bytes(&mut cursor),
            Err(ProtocolError::ShortPacket)
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let data = [0, 0, 0, 2, 0xC3, 0x28];
        let mut cursor = &data[..];
        assert!(matches!(
            take_string(&mut cursor),
            Err(ProtocolError::InvalidString)
        ));
    }

    #[test]
    fn test_take_raw_exact() {
        let data = [1, 2, 3];
        let mut cursor = &data[..];
        assert_eq!(take_raw(&mut cursor, 3).unwrap(), &[1, 2, 3]);
        assert!(cursor.is_empty());
        assert!(matches!(
            take_raw(&mut cursor, 1),
            Err(ProtocolError::ShortPacket)
        ));
    }

    #[test]
    #[should_panic]
    fn test_unchecked_read_panics_on_short_buffer() {
        let data = [0u8; 2];
        let mut cursor = &data[..];
        let _ = get_u32(&mut cursor);
    }
}
