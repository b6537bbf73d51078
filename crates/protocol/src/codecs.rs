//! Fixed-width binary primitives
//!
//! All integers are big-endian. Strings are a `u8` byte length followed by
//! UTF-8 bytes, so no string on the wire exceeds 255 bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tofmt_core::{Result, TimerError, ValidationError, MAX_STRING_LEN};

#[inline]
pub fn write_u8(buf: &mut BytesMut, val: u8) {
    buf.put_u8(val);
}

#[inline]
pub fn write_u16(buf: &mut BytesMut, val: u16) {
    buf.put_u16(val);
}

#[inline]
pub fn write_u32(buf: &mut BytesMut, val: u32) {
    buf.put_u32(val);
}

#[inline]
pub fn write_i64(buf: &mut BytesMut, val: i64) {
    buf.put_i64(val);
}

/// Write a length-prefixed string
///
/// # Format
/// - u8: byte length (max 255)
/// - UTF-8 bytes, not null-terminated
pub fn write_str8(buf: &mut BytesMut, field: &'static str, val: &str) -> std::result::Result<(), ValidationError> {
    let len = u8::try_from(val.len()).map_err(|_| ValidationError::TooLong {
        field,
        len: val.len(),
        max: MAX_STRING_LEN,
    })?;
    buf.put_u8(len);
    buf.put_slice(val.as_bytes());
    Ok(())
}

/// Write a `u8` element count
pub fn write_count8(buf: &mut BytesMut, field: &'static str, len: usize) -> std::result::Result<(), ValidationError> {
    let len8 = u8::try_from(len).map_err(|_| ValidationError::TooMany {
        field,
        len,
        max: usize::from(u8::MAX),
    })?;
    buf.put_u8(len8);
    Ok(())
}

/// Write a `u16` element count
pub fn write_count16(buf: &mut BytesMut, field: &'static str, len: usize) -> std::result::Result<(), ValidationError> {
    let len16 = u16::try_from(len).map_err(|_| ValidationError::TooMany {
        field,
        len,
        max: usize::from(u16::MAX),
    })?;
    buf.put_u16(len16);
    Ok(())
}

#[inline]
fn ensure(buf: &Bytes, needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(TimerError::Decode(format!(
            "truncated {what}: need {needed} bytes, have {}",
            buf.remaining()
        )));
    }
    Ok(())
}

#[inline]
pub fn read_u8(buf: &mut Bytes) -> Result<u8> {
    ensure(buf, 1, "u8")?;
    Ok(buf.get_u8())
}

#[inline]
pub fn read_u16(buf: &mut Bytes) -> Result<u16> {
    ensure(buf, 2, "u16")?;
    Ok(buf.get_u16())
}

#[inline]
pub fn read_u32(buf: &mut Bytes) -> Result<u32> {
    ensure(buf, 4, "u32")?;
    Ok(buf.get_u32())
}

#[inline]
pub fn read_i64(buf: &mut Bytes) -> Result<i64> {
    ensure(buf, 8, "i64")?;
    Ok(buf.get_i64())
}

/// Read a length-prefixed string
pub fn read_str8(buf: &mut Bytes) -> Result<String> {
    let len = usize::from(read_u8(buf)?);
    ensure(buf, len, "string")?;

    let bytes = buf.split_to(len);
    String::from_utf8(bytes.to_vec()).map_err(|e| TimerError::Decode(format!("invalid UTF-8: {e}")))
}

/// Take exactly `len` raw bytes
pub fn read_bytes(buf: &mut Bytes, len: usize) -> Result<Bytes> {
    ensure(buf, len, "payload")?;
    Ok(buf.split_to(len))
}

/// Fail if anything is left after a complete structure
pub fn expect_end(buf: &Bytes, what: &str) -> Result<()> {
    if buf.has_remaining() {
        return Err(TimerError::Decode(format!(
            "{} trailing bytes after {what}",
            buf.remaining()
        )));
    }
    Ok(())
}
