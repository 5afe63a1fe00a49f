//! Element writers.
//!
//! Each function emits one complete EBML element (or a master element
//! header) in ID, size, payload order. Sizes are computed with the helpers in
//! [`ebml`](crate::ebml) so callers can sum them up before writing.

use crate::ebml::{self, FLOAT_SIZE, MAX_VINT_LENGTH};
use crate::elements::*;
use crate::error::{MuxError, Result};
use crate::writer::MkvWriter;

use byteorder::{BigEndian, WriteBytesExt};

/// EBML header values for WebM.
const EBML_VERSION_VALUE: u64 = 1;
const EBML_READ_VERSION_VALUE: u64 = 1;
const EBML_MAX_ID_LENGTH_VALUE: u64 = 4;
const EBML_MAX_SIZE_LENGTH_VALUE: u64 = 8;
const DOC_TYPE_VALUE: &str = "webm";
const DOC_TYPE_VERSION_VALUE: u64 = 2;
const DOC_TYPE_READ_VERSION_VALUE: u64 = 2;

/// SimpleBlock flag bit for key frames.
const SIMPLE_BLOCK_KEY_FLAG: u8 = 0x80;

/// Write `value` as a big-endian integer of exactly `width` bytes.
pub fn serialize_uint<W: MkvWriter + ?Sized>(
    writer: &mut W,
    value: u64,
    width: usize,
) -> Result<()> {
    if width == 0 || width > MAX_VINT_LENGTH || ebml::uint_size(value) > width {
        return Err(MuxError::ValueTooLarge { value, width });
    }
    let mut buf = Vec::with_capacity(width);
    buf.write_uint::<BigEndian>(value, width)?;
    writer.write(&buf)
}

/// Write an element ID.
pub fn write_id<W: MkvWriter + ?Sized>(writer: &mut W, id: u32) -> Result<()> {
    serialize_uint(writer, id as u64, ebml::uint_size(id as u64))
}

/// Write `value` as a coded size using the fewest bytes.
pub fn write_coded_size<W: MkvWriter + ?Sized>(writer: &mut W, value: u64) -> Result<()> {
    let (bytes, width) = ebml::encode_vint_min(value)?;
    writer.write(&bytes[..width])
}

/// Write `value` as a coded size of exactly `width` bytes.
///
/// Used when a field was reserved before its value was known, so the patch
/// must keep the reserved width.
pub fn write_coded_size_fixed<W: MkvWriter + ?Sized>(
    writer: &mut W,
    value: u64,
    width: usize,
) -> Result<()> {
    let bytes = ebml::encode_vint(value, width)?;
    writer.write(&bytes[..width])
}

/// Write a master element header announcing `size` bytes of children.
pub fn write_master_header<W: MkvWriter + ?Sized>(
    writer: &mut W,
    id: u32,
    size: u64,
) -> Result<()> {
    write_id(writer, id)?;
    write_coded_size(writer, size)
}

/// Write an unsigned integer element.
pub fn write_uint_element<W: MkvWriter + ?Sized>(
    writer: &mut W,
    id: u32,
    value: u64,
) -> Result<()> {
    let width = ebml::coded_size(value);
    write_id(writer, id)?;
    write_coded_size(writer, width as u64)?;
    serialize_uint(writer, value, width)
}

/// Write a 32-bit float element.
pub fn write_float_element<W: MkvWriter + ?Sized>(
    writer: &mut W,
    id: u32,
    value: f32,
) -> Result<()> {
    write_id(writer, id)?;
    write_coded_size(writer, FLOAT_SIZE)?;
    let mut buf = Vec::with_capacity(FLOAT_SIZE as usize);
    buf.write_f32::<BigEndian>(value)?;
    writer.write(&buf)
}

/// Write a string element (no terminator).
pub fn write_string_element<W: MkvWriter + ?Sized>(
    writer: &mut W,
    id: u32,
    value: &str,
) -> Result<()> {
    write_binary_element(writer, id, value.as_bytes())
}

/// Write a binary element.
pub fn write_binary_element<W: MkvWriter + ?Sized>(
    writer: &mut W,
    id: u32,
    value: &[u8],
) -> Result<()> {
    write_id(writer, id)?;
    write_coded_size(writer, value.len() as u64)?;
    writer.write(value)
}

/// Payload size of a SimpleBlock carrying `length` bytes of frame data.
pub fn simple_block_payload_size(track_number: u64, length: u64) -> u64 {
    ebml::coded_size(track_number) as u64 + 2 + 1 + length
}

/// Total serialized size of a SimpleBlock element.
pub fn simple_block_size(track_number: u64, length: u64) -> u64 {
    let payload = simple_block_payload_size(track_number, length);
    ebml::master_element_size(SIMPLE_BLOCK, payload) + payload
}

/// Write a SimpleBlock and return the number of bytes emitted.
///
/// `timecode` is relative to the enclosing cluster. Track numbers must be in
/// `1..128` and the frame must not be empty.
pub fn write_simple_block<W: MkvWriter + ?Sized>(
    writer: &mut W,
    data: &[u8],
    track_number: u64,
    timecode: i16,
    is_key: bool,
) -> Result<u64> {
    if track_number == 0 || track_number >= 128 {
        return Err(MuxError::InvalidTrackNumber(track_number));
    }
    if data.is_empty() {
        return Err(MuxError::EmptyFrame);
    }

    let payload = simple_block_payload_size(track_number, data.len() as u64);
    let start = writer.position();

    write_id(writer, SIMPLE_BLOCK)?;
    write_coded_size(writer, payload)?;
    write_coded_size(writer, track_number)?;

    let mut header = Vec::with_capacity(3);
    header.write_i16::<BigEndian>(timecode)?;
    header.push(if is_key { SIMPLE_BLOCK_KEY_FLAG } else { 0 });
    writer.write(&header)?;
    writer.write(data)?;

    let expected = simple_block_size(track_number, data.len() as u64);
    check_size(SIMPLE_BLOCK, start, writer.position(), expected)?;
    Ok(expected)
}

/// Write a Void element occupying exactly `total_size` bytes, header
/// included. Returns the number of bytes written.
///
/// The size field keeps the width implied by `total_size - 1` even when the
/// resulting payload would fit a narrower field, so any span of two or more
/// bytes can be filled exactly.
pub fn write_void_element<W: MkvWriter + ?Sized>(writer: &mut W, total_size: u64) -> Result<u64> {
    if total_size < 2 {
        return Err(MuxError::Other(format!(
            "Cannot fill {} byte(s) with a Void element",
            total_size
        )));
    }

    let width = ebml::coded_size(total_size - 1);
    let payload = total_size - 1 - width as u64;
    let start = writer.position();

    write_id(writer, VOID)?;
    write_coded_size_fixed(writer, payload, width)?;
    writer.write(&vec![0u8; payload as usize])?;

    check_size(VOID, start, writer.position(), total_size)?;
    Ok(total_size)
}

/// Write the EBML header declaring a WebM document.
pub fn write_ebml_header<W: MkvWriter + ?Sized>(writer: &mut W) -> Result<()> {
    let size = ebml::uint_element_size(EBML_VERSION, EBML_VERSION_VALUE)
        + ebml::uint_element_size(EBML_READ_VERSION, EBML_READ_VERSION_VALUE)
        + ebml::uint_element_size(EBML_MAX_ID_LENGTH, EBML_MAX_ID_LENGTH_VALUE)
        + ebml::uint_element_size(EBML_MAX_SIZE_LENGTH, EBML_MAX_SIZE_LENGTH_VALUE)
        + ebml::string_element_size(DOC_TYPE, DOC_TYPE_VALUE)
        + ebml::uint_element_size(DOC_TYPE_VERSION, DOC_TYPE_VERSION_VALUE)
        + ebml::uint_element_size(DOC_TYPE_READ_VERSION, DOC_TYPE_READ_VERSION_VALUE);

    write_master_header(writer, EBML, size)?;
    let payload_start = writer.position();

    write_uint_element(writer, EBML_VERSION, EBML_VERSION_VALUE)?;
    write_uint_element(writer, EBML_READ_VERSION, EBML_READ_VERSION_VALUE)?;
    write_uint_element(writer, EBML_MAX_ID_LENGTH, EBML_MAX_ID_LENGTH_VALUE)?;
    write_uint_element(writer, EBML_MAX_SIZE_LENGTH, EBML_MAX_SIZE_LENGTH_VALUE)?;
    write_string_element(writer, DOC_TYPE, DOC_TYPE_VALUE)?;
    write_uint_element(writer, DOC_TYPE_VERSION, DOC_TYPE_VERSION_VALUE)?;
    write_uint_element(writer, DOC_TYPE_READ_VERSION, DOC_TYPE_READ_VERSION_VALUE)?;

    check_size(EBML, payload_start, writer.position(), size)
}

/// Verify that the bytes between `start` and `stop` match `expected`.
pub(crate) fn check_size(element: u32, start: u64, stop: u64, expected: u64) -> Result<()> {
    let actual = stop.saturating_sub(start);
    if actual != expected {
        return Err(MuxError::SizeMismatch {
            element,
            expected,
            actual,
        });
    }
    Ok(())
}
