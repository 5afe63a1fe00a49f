//! A Cluster and its deferred size.
//!
//! The size field is reserved as an 8-byte "unknown" value when the header
//! is written. [`Cluster::finalize`] patches it with the accumulated payload
//! size using the same width.

use crate::ebml::{self, MAX_VINT_LENGTH, UNKNOWN_SIZE_8};
use crate::elements::*;
use crate::error::{MuxError, Result};
use crate::serialize;
use crate::writer::MkvWriter;

use tracing::{debug, trace};

/// Cluster ID plus the reserved 8-byte size.
const CLUSTER_HEADER_SIZE: u64 = 4 + MAX_VINT_LENGTH as u64;

/// A time-bounded run of SimpleBlocks.
#[derive(Debug, Clone)]
pub struct Cluster {
    timecode: u64,
    position: u64,
    size_position: Option<u64>,
    payload_size: u64,
    blocks_added: u64,
    header_written: bool,
    finalized: bool,
}

impl Cluster {
    /// Create a cluster at `timecode` (timecode units) that will start at
    /// file offset `position`.
    pub fn new(timecode: u64, position: u64) -> Self {
        Self {
            timecode,
            position,
            size_position: None,
            payload_size: 0,
            blocks_added: 0,
            header_written: false,
            finalized: false,
        }
    }

    /// Cluster timecode in timecode units.
    pub fn timecode(&self) -> u64 {
        self.timecode
    }

    /// File offset of the Cluster element.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// File offset of the reserved size field, once the header is written.
    pub fn size_position(&self) -> Option<u64> {
        self.size_position
    }

    /// Bytes written inside the cluster so far.
    pub fn payload_size(&self) -> u64 {
        self.payload_size
    }

    /// Total size of the cluster on disk so far.
    pub fn size(&self) -> u64 {
        if self.header_written {
            CLUSTER_HEADER_SIZE + self.payload_size
        } else {
            0
        }
    }

    /// Number of SimpleBlocks written.
    pub fn blocks_added(&self) -> u64 {
        self.blocks_added
    }

    /// Whether [`finalize`](Cluster::finalize) has run.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn write_header<W: MkvWriter + ?Sized>(&mut self, writer: &mut W) -> Result<()> {
        self.position = writer.position();
        serialize::write_id(writer, CLUSTER)?;
        self.size_position = Some(writer.position());
        writer.write(&UNKNOWN_SIZE_8.to_be_bytes())?;

        serialize::write_uint_element(writer, TIMECODE, self.timecode)?;
        self.payload_size += ebml::uint_element_size(TIMECODE, self.timecode);
        self.header_written = true;

        debug!(
            timecode = self.timecode,
            "Cluster started at {}",
            self.position
        );
        Ok(())
    }

    /// Write one frame as a SimpleBlock. The header goes out with the first
    /// frame. Returns the 1-based block number of the frame in this cluster.
    pub fn add_frame<W: MkvWriter + ?Sized>(
        &mut self,
        writer: &mut W,
        data: &[u8],
        track_number: u64,
        relative_timecode: i16,
        is_key: bool,
    ) -> Result<u64> {
        if self.finalized {
            return Err(MuxError::ClusterFinalized);
        }
        if !self.header_written {
            self.write_header(writer)?;
        }

        let written =
            serialize::write_simple_block(writer, data, track_number, relative_timecode, is_key)?;
        self.payload_size += written;
        self.blocks_added += 1;

        trace!(
            track = track_number,
            timecode = relative_timecode,
            key = is_key,
            "SimpleBlock {} ({} bytes)",
            self.blocks_added,
            written
        );
        Ok(self.blocks_added)
    }

    /// Close the cluster. When `patch` is set the reserved size field is
    /// overwritten with the payload size and the write position restored.
    pub fn finalize<W: MkvWriter + ?Sized>(&mut self, writer: &mut W, patch: bool) -> Result<()> {
        if self.finalized {
            return Err(MuxError::ClusterFinalized);
        }

        if patch {
            if let Some(size_position) = self.size_position {
                let end = writer.position();
                writer.seek(size_position)?;
                serialize::write_coded_size_fixed(writer, self.payload_size, MAX_VINT_LENGTH)?;
                writer.seek(end)?;
            }
        }

        self.finalized = true;
        debug!(
            timecode = self.timecode,
            blocks = self.blocks_added,
            "Cluster finalized, payload {} bytes",
            self.payload_size
        );
        Ok(())
    }
}
