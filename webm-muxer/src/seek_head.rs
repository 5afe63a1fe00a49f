//! The SeekHead element.
//!
//! Space for the index is reserved as a Void element before the offsets it
//! will hold are known. At finalize the reserved span is overwritten with
//! the real SeekHead and whatever is left over becomes a trailing Void, so
//! nothing after the reservation moves.

use crate::ebml;
use crate::elements::*;
use crate::error::{MuxError, Result};
use crate::serialize::{self, check_size};
use crate::writer::MkvWriter;

use tracing::debug;

/// Number of entries the reservation has room for.
pub const MAX_SEEK_ENTRIES: usize = 4;

/// One Seek entry: an element ID and its offset from the segment payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekEntry {
    /// Indexed element ID.
    pub id: u32,
    /// Offset relative to the segment payload start.
    pub position: u64,
}

impl SeekEntry {
    fn payload_size(&self) -> u64 {
        ebml::binary_element_size(SEEK_ID, ebml::uint_size(self.id as u64) as u64)
            + ebml::uint_element_size(SEEK_POSITION, self.position)
    }

    fn size(&self) -> u64 {
        let payload = self.payload_size();
        ebml::master_element_size(SEEK, payload) + payload
    }

    fn write<W: MkvWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let id_bytes = self.id.to_be_bytes();
        let id_width = ebml::uint_size(self.id as u64);

        serialize::write_master_header(writer, SEEK, self.payload_size())?;
        serialize::write_binary_element(writer, SEEK_ID, &id_bytes[4 - id_width..])?;
        serialize::write_uint_element(writer, SEEK_POSITION, self.position)
    }
}

/// Largest possible Seek entry: a 4-byte ID and an 8-byte position.
fn max_entry_size() -> u64 {
    SeekEntry {
        id: CLUSTER,
        position: ebml::max_coded_value(ebml::MAX_VINT_LENGTH),
    }
    .size()
}

/// Bytes reserved for the SeekHead, header included.
pub fn reserved_size() -> u64 {
    let payload = max_entry_size() * MAX_SEEK_ENTRIES as u64;
    ebml::master_element_size(SEEK_HEAD, payload) + payload
}

/// The SeekHead element.
#[derive(Debug, Clone, Default)]
pub struct SeekHead {
    entries: Vec<SeekEntry>,
    start_pos: Option<u64>,
}

impl SeekHead {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries added so far.
    pub fn entries(&self) -> &[SeekEntry] {
        &self.entries
    }

    /// Offset of the reservation, once written.
    pub fn start_position(&self) -> Option<u64> {
        self.start_pos
    }

    /// Reserve space for the index at the current position.
    pub fn write<W: MkvWriter + ?Sized>(&mut self, writer: &mut W) -> Result<()> {
        let start = writer.position();
        serialize::write_void_element(writer, reserved_size())?;
        self.start_pos = Some(start);
        Ok(())
    }

    /// Add an entry for element `id` at `position` (relative to the segment
    /// payload start).
    pub fn add_entry(&mut self, id: u32, position: u64) -> Result<()> {
        if self.entries.len() >= MAX_SEEK_ENTRIES {
            return Err(MuxError::SeekHeadFull {
                capacity: MAX_SEEK_ENTRIES,
            });
        }
        self.entries.push(SeekEntry { id, position });
        Ok(())
    }

    fn payload_size(&self) -> u64 {
        self.entries.iter().map(SeekEntry::size).sum()
    }

    /// Overwrite the reservation with the real index plus Void padding.
    ///
    /// With no entries the reservation is left as a plain Void. The write
    /// position is restored afterwards.
    pub fn finalize<W: MkvWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let start = self
            .start_pos
            .ok_or_else(|| MuxError::InvalidState("SeekHead was never reserved".to_string()))?;
        if self.entries.is_empty() {
            return Ok(());
        }
        if !writer.seekable() {
            return Err(MuxError::NotSeekable);
        }

        let reserved = reserved_size();
        let payload = self.payload_size();
        let total = ebml::master_element_size(SEEK_HEAD, payload) + payload;
        let padding = reserved.checked_sub(total).ok_or(MuxError::SizeMismatch {
            element: SEEK_HEAD,
            expected: reserved,
            actual: total,
        })?;
        if padding == 1 {
            return Err(MuxError::Other(
                "SeekHead leaves a single byte that no Void can fill".to_string(),
            ));
        }

        let end = writer.position();
        writer.seek(start)?;

        serialize::write_master_header(writer, SEEK_HEAD, payload)?;
        for entry in &self.entries {
            entry.write(writer)?;
        }
        if padding > 0 {
            serialize::write_void_element(writer, padding)?;
        }
        check_size(SEEK_HEAD, start, writer.position(), reserved)?;

        writer.seek(end)?;
        debug!(
            entries = self.entries.len(),
            padding,
            "SeekHead finalized at {}",
            start
        );
        Ok(())
    }
}
