//! Variable-length quantities: the 7-bit-group, continuation-bit integer
//! encoding used for delta-times and length prefixes throughout the format.

use crate::error::{CodecResult, ErrorKind};
use crate::reader::Reader;

/// Largest value a variable-length quantity can carry (28 bits).
pub const VARLEN_MAX: u32 = (1 << 28) - 1;

/// Decode one quantity, consuming bytes while the continuation bit is set.
///
/// The conventional limit is four bytes; a fifth continuation byte means the
/// quantity is malformed.
pub(crate) fn read_varlen(reader: &mut Reader) -> CodecResult<u32> {
    let mut value = 0u32;
    for _ in 0..4 {
        let byte = reader.read_u8()?;
        value = (value << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(reader.err(ErrorKind::MalformedVarLen))
}

/// Encode `value` with the minimum number of 7-bit groups, most significant
/// group first. Zero encodes as a single zero byte.
pub(crate) fn write_varlen(value: u32, out: &mut Vec<u8>) {
    let value = value & VARLEN_MAX;
    let mut skipping = true;
    for group in (0..4).rev() {
        let byte = ((value >> (group * 7)) & 0x7F) as u8;
        if skipping && byte == 0 && group != 0 {
            continue;
        }
        skipping = false;
        out.push(if group == 0 { byte } else { byte | 0x80 });
    }
}

#[cfg(test)]
fn round_trip(value: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    write_varlen(value, &mut bytes);
    let mut reader = Reader::new(&bytes);
    assert_eq!(read_varlen(&mut reader).unwrap(), value);
    assert!(reader.at_end());
    bytes
}

#[test]
fn encodes_with_minimum_groups() {
    assert_eq!(round_trip(0), [0x00]);
    assert_eq!(round_trip(0x40), [0x40]);
    assert_eq!(round_trip(0x7F), [0x7F]);
    assert_eq!(round_trip(0x80), [0x81, 0x00]);
    assert_eq!(round_trip(0x2000), [0xC0, 0x00]);
    assert_eq!(round_trip(0x3FFF), [0xFF, 0x7F]);
    assert_eq!(round_trip(0x4000), [0x81, 0x80, 0x00]);
    assert_eq!(round_trip(0x001F_FFFF), [0xFF, 0xFF, 0x7F]);
    assert_eq!(round_trip(0x0020_0000), [0x81, 0x80, 0x80, 0x00]);
    assert_eq!(round_trip(VARLEN_MAX), [0xFF, 0xFF, 0xFF, 0x7F]);
}

#[test]
fn truncated_continuation_fails() {
    let mut reader = Reader::new(&[0x81, 0x80]);
    let err = read_varlen(&mut reader).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TruncatedInput);
}

#[test]
fn overlong_quantity_fails() {
    let mut reader = Reader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F]);
    let err = read_varlen(&mut reader).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedVarLen);
}

#[test]
fn values_above_28_bits_are_masked_on_write() {
    let mut bytes = Vec::new();
    write_varlen(u32::MAX, &mut bytes);
    assert_eq!(bytes, [0xFF, 0xFF, 0xFF, 0x7F]);
}
