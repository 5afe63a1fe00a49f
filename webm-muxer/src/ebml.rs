//! EBML variable-length integer codec.
//!
//! EBML codes element sizes as VINTs: the number of leading zero bits in the
//! first byte gives the width, and the bits after the first set bit carry the
//! value.
//!
//! ```text
//! 1xxxxxxx                     1 byte,  values up to 2^7  - 2
//! 01xxxxxx xxxxxxxx            2 bytes, values up to 2^14 - 2
//! 001xxxxx xxxxxxxx xxxxxxxx   3 bytes, values up to 2^21 - 2
//! ...
//! 00000001 xxxxxxxx ... (x7)   8 bytes, values up to 2^56 - 2
//! ```
//!
//! The all-ones value of each width is reserved to mean "unknown size".
//! Element IDs keep their marker bits and are written as plain big-endian
//! integers.

use crate::error::{MuxError, Result};
use std::io::Read;

/// Maximum VINT length in bytes.
pub const MAX_VINT_LENGTH: usize = 8;

/// Maximum element ID length in bytes.
pub const MAX_ID_LENGTH: usize = 4;

/// 8-byte "unknown size" marker, as written on disk.
pub const UNKNOWN_SIZE_8: u64 = 0x01FF_FFFF_FFFF_FFFF;

/// Size in bytes of an IEEE-754 single precision payload.
pub const FLOAT_SIZE: u64 = 4;

/// Largest value that can be coded in `width` bytes.
///
/// `width` must be in `1..=8`.
pub fn max_coded_value(width: usize) -> u64 {
    (1u64 << (7 * width)) - 2
}

/// Number of bytes needed to code `value` as an EBML size.
///
/// Values at or above `2^56 - 1` report 8; [`encode_vint`] rejects them.
pub fn coded_size(value: u64) -> usize {
    if value < 0x7F {
        1
    } else if value < 0x3FFF {
        2
    } else if value < 0x1F_FFFF {
        3
    } else if value < 0x0FFF_FFFF {
        4
    } else if value < 0x07_FFFF_FFFF {
        5
    } else if value < 0x03FF_FFFF_FFFF {
        6
    } else if value < 0x01_FFFF_FFFF_FFFF {
        7
    } else {
        8
    }
}

/// Number of bytes needed to hold `value` as a plain big-endian integer.
///
/// Zero still occupies one byte.
pub fn uint_size(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

/// Encode `value` as a VINT of exactly `width` bytes.
///
/// Returns the encoded bytes (the first `width` are meaningful). A value
/// that does not fit `width` is an error rather than a silently corrupt
/// field.
pub fn encode_vint(value: u64, width: usize) -> Result<[u8; 8]> {
    if width == 0 || width > MAX_VINT_LENGTH {
        return Err(MuxError::ValueTooLarge { value, width });
    }
    if value > max_coded_value(width) {
        return Err(MuxError::ValueTooLarge { value, width });
    }

    let marked = value | (1u64 << (7 * width));
    let mut bytes = [0u8; 8];
    bytes[..width].copy_from_slice(&marked.to_be_bytes()[8 - width..]);
    Ok(bytes)
}

/// Encode `value` as a VINT using the fewest bytes.
pub fn encode_vint_min(value: u64) -> Result<([u8; 8], usize)> {
    let width = coded_size(value);
    Ok((encode_vint(value, width)?, width))
}

/// Serialized size of an element header (ID plus coded data size).
///
/// For a master element this is everything except the children.
pub fn master_element_size(id: u32, payload_size: u64) -> u64 {
    (uint_size(id as u64) + coded_size(payload_size)) as u64
}

/// Serialized size of an unsigned integer element.
pub fn uint_element_size(id: u32, value: u64) -> u64 {
    let payload = coded_size(value) as u64;
    master_element_size(id, payload) + payload
}

/// Serialized size of a 32-bit float element.
pub fn float_element_size(id: u32) -> u64 {
    master_element_size(id, FLOAT_SIZE) + FLOAT_SIZE
}

/// Serialized size of a string element.
pub fn string_element_size(id: u32, value: &str) -> u64 {
    binary_element_size(id, value.len() as u64)
}

/// Serialized size of a binary element holding `length` bytes.
pub fn binary_element_size(id: u32, length: u64) -> u64 {
    master_element_size(id, length) + length
}

/// Read a variable-length integer (VINT) from a reader.
///
/// Returns the decoded value (marker bit removed) and the number of bytes
/// read.
pub fn read_vint<R: Read>(reader: &mut R) -> Result<(u64, usize)> {
    let mut first_byte = [0u8; 1];
    reader.read_exact(&mut first_byte)?;

    if first_byte[0] == 0 {
        return Err("Invalid VINT: no marker bit".into());
    }

    let length = first_byte[0].leading_zeros() as usize + 1;
    // An 8-byte VINT has no value bits in its first byte.
    let mask = (0xFFu16 >> length) as u8;
    let mut value = (first_byte[0] & mask) as u64;

    if length > 1 {
        let mut remaining = [0u8; MAX_VINT_LENGTH - 1];
        reader.read_exact(&mut remaining[..length - 1])?;
        for &byte in &remaining[..length - 1] {
            value = (value << 8) | byte as u64;
        }
    }

    Ok((value, length))
}

/// Read an element ID, marker bits included.
pub fn read_element_id<R: Read>(reader: &mut R) -> Result<(u32, usize)> {
    let mut first_byte = [0u8; 1];
    reader.read_exact(&mut first_byte)?;

    if first_byte[0] == 0 {
        return Err("Invalid element ID".into());
    }

    let length = first_byte[0].leading_zeros() as usize + 1;
    if length > MAX_ID_LENGTH {
        return Err(MuxError::Other(format!(
            "Element ID wider than {} bytes",
            MAX_ID_LENGTH
        )));
    }

    let mut value = first_byte[0] as u32;
    if length > 1 {
        let mut remaining = [0u8; MAX_ID_LENGTH - 1];
        reader.read_exact(&mut remaining[..length - 1])?;
        for &byte in &remaining[..length - 1] {
            value = (value << 8) | byte as u32;
        }
    }

    Ok((value, length))
}

/// Read an element size.
///
/// Returns `None` for the reserved "unknown size" value.
pub fn read_element_size<R: Read>(reader: &mut R) -> Result<(Option<u64>, usize)> {
    let (value, length) = read_vint(reader)?;

    if value == max_coded_value(length) + 1 {
        Ok((None, length))
    } else {
        Ok((Some(value), length))
    }
}
