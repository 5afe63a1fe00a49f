//! Muxer error types.
//!
//! Every failure is terminal for the muxing session: once an operation on a
//! [`Segment`](crate::Segment) returns an error the output should be discarded.

use thiserror::Error;

/// Errors produced while writing a WebM file.
#[derive(Error, Debug)]
pub enum MuxError {
    /// I/O error from the underlying sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A backward seek was requested on a sink that cannot seek.
    #[error("Sink is not seekable")]
    NotSeekable,

    /// Value does not fit the requested coded width.
    #[error("Value {value} cannot be coded in {width} byte(s)")]
    ValueTooLarge {
        /// The value being encoded.
        value: u64,
        /// The width (in bytes) that was requested or computed.
        width: usize,
    },

    /// Track number outside the range a SimpleBlock can carry.
    #[error("Invalid track number: {0}")]
    InvalidTrackNumber(u64),

    /// Track not found.
    #[error("Track {track_number} not found")]
    TrackNotFound {
        /// The track number that was not found.
        track_number: u64,
    },

    /// Frame with no payload.
    #[error("Frame payload is empty")]
    EmptyFrame,

    /// Frame timecode earlier than the cluster it would land in.
    #[error("Frame timecode {timecode} precedes cluster timecode {cluster_timecode}")]
    NegativeTimecode {
        /// Frame timecode in timecode-scale units.
        timecode: u64,
        /// Timecode of the open cluster.
        cluster_timecode: u64,
    },

    /// Block-relative timecode does not fit the signed 16-bit field.
    #[error("Relative timecode {relative} does not fit in a SimpleBlock")]
    TimecodeOverflow {
        /// The offending relative timecode.
        relative: i64,
    },

    /// Required metadata was never set.
    #[error("Missing required metadata: {0}")]
    MissingMetadata(&'static str),

    /// Stereo mode outside the WebM set.
    #[error("Invalid stereo mode: {0}")]
    InvalidStereoMode(u64),

    /// Operation not valid in the current muxer state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// All seek entry slots are taken.
    #[error("SeekHead is full ({capacity} entries)")]
    SeekHeadFull {
        /// Fixed number of seek entries.
        capacity: usize,
    },

    /// Frame added to a cluster that was already closed.
    #[error("Cluster already finalized")]
    ClusterFinalized,

    /// Bytes written disagree with the size computed up front.
    ///
    /// The output is already corrupt when this is returned.
    #[error(
        "Size mismatch in {} (0x{element:X}): expected {expected} bytes, wrote {actual}",
        crate::elements::element_name(*element)
    )]
    SizeMismatch {
        /// The element ID being written.
        element: u32,
        /// Size computed before writing.
        expected: u64,
        /// Bytes actually emitted.
        actual: u64,
    },

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl MuxError {
    /// Returns true if this error means the emitted bytes violate the
    /// EBML layout, as opposed to an I/O or caller error.
    pub fn is_corruption(&self) -> bool {
        matches!(self, MuxError::SizeMismatch { .. })
    }
}

impl From<String> for MuxError {
    fn from(s: String) -> Self {
        MuxError::Other(s)
    }
}

impl From<&str> for MuxError {
    fn from(s: &str) -> Self {
        MuxError::Other(s.to_string())
    }
}

/// Result type for muxer operations.
pub type Result<T> = std::result::Result<T, MuxError>;
