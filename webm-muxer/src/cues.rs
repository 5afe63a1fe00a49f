//! The Cues element: a seek index written after the last cluster.

use crate::ebml;
use crate::elements::*;
use crate::error::Result;
use crate::serialize::{self, check_size};
use crate::writer::MkvWriter;

/// A single cue point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CuePoint {
    /// Absolute time in timecode units.
    pub time: u64,
    /// Track the cue refers to.
    pub track: u64,
    /// Cluster offset relative to the segment payload start.
    pub cluster_pos: u64,
    /// 1-based index of the block within its cluster.
    pub block_number: u64,
    /// Write CueBlockNumber when it is not the default of 1.
    pub output_block_number: bool,
}

impl CuePoint {
    /// Create a cue point that writes its block number.
    pub fn new(time: u64, track: u64, cluster_pos: u64, block_number: u64) -> Self {
        Self {
            time,
            track,
            cluster_pos,
            block_number,
            output_block_number: true,
        }
    }

    fn writes_block_number(&self) -> bool {
        self.output_block_number && self.block_number > 1
    }

    fn track_positions_size(&self) -> u64 {
        let mut size = ebml::uint_element_size(CUE_TRACK, self.track);
        size += ebml::uint_element_size(CUE_CLUSTER_POSITION, self.cluster_pos);
        if self.writes_block_number() {
            size += ebml::uint_element_size(CUE_BLOCK_NUMBER, self.block_number);
        }
        size
    }

    /// Size of the CuePoint children.
    pub fn payload_size(&self) -> u64 {
        let positions = self.track_positions_size();
        ebml::uint_element_size(CUE_TIME, self.time)
            + ebml::master_element_size(CUE_TRACK_POSITIONS, positions)
            + positions
    }

    /// Size of the whole CuePoint element.
    pub fn size(&self) -> u64 {
        let payload = self.payload_size();
        ebml::master_element_size(CUE_POINT, payload) + payload
    }

    /// Write the CuePoint element.
    pub fn write<W: MkvWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let size = self.payload_size();
        serialize::write_master_header(writer, CUE_POINT, size)?;
        let payload_start = writer.position();

        serialize::write_uint_element(writer, CUE_TIME, self.time)?;
        serialize::write_master_header(writer, CUE_TRACK_POSITIONS, self.track_positions_size())?;
        serialize::write_uint_element(writer, CUE_TRACK, self.track)?;
        serialize::write_uint_element(writer, CUE_CLUSTER_POSITION, self.cluster_pos)?;
        if self.writes_block_number() {
            serialize::write_uint_element(writer, CUE_BLOCK_NUMBER, self.block_number)?;
        }

        check_size(CUE_POINT, payload_start, writer.position(), size)
    }
}

/// The Cues element.
#[derive(Debug, Clone)]
pub struct Cues {
    points: Vec<CuePoint>,
    output_block_number: bool,
}

impl Default for Cues {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            output_block_number: true,
        }
    }
}

impl Cues {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cue point. Its block-number flag follows the index setting.
    pub fn add_cue(&mut self, mut point: CuePoint) {
        point.output_block_number = self.output_block_number;
        self.points.push(point);
    }

    /// Whether cue points added from now on write their block number.
    pub fn set_output_block_number(&mut self, output: bool) {
        self.output_block_number = output;
    }

    /// Get a cue point by index.
    pub fn get(&self, index: usize) -> Option<&CuePoint> {
        self.points.get(index)
    }

    /// Number of cue points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over cue points in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CuePoint> {
        self.points.iter()
    }

    /// Size of the Cues children.
    pub fn payload_size(&self) -> u64 {
        self.points.iter().map(CuePoint::size).sum()
    }

    /// Write the Cues element.
    pub fn write<W: MkvWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let size = self.payload_size();
        serialize::write_master_header(writer, CUES, size)?;
        let payload_start = writer.position();

        for point in &self.points {
            point.write(writer)?;
        }

        check_size(CUES, payload_start, writer.position(), size)
    }
}
