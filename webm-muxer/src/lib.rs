//! # webm-muxer
//!
//! A WebM (Matroska/EBML) muxer for already-encoded VP8 video and Vorbis
//! audio frames.
//!
//! The muxer writes the EBML header, a Segment with SeekHead, Info and
//! Tracks, a run of Clusters holding SimpleBlocks, and a Cues index. Sizes
//! that are unknown while writing are reserved at full width and patched in
//! place at [`Segment::finalize`] when the sink can seek.
//!
//! ## Features
//!
//! - EBML variable-length integer codec with checked widths
//! - Cluster splitting on video key frames, with optional duration/size limits
//! - Cues on key frames of a chosen track
//! - `File` mode (seekable, back-patched) and `Live` mode (append only)
//!
//! ## Example
//!
//! ```no_run
//! use webm_muxer::{IoWriter, Segment, SegmentConfig};
//!
//! # fn main() -> webm_muxer::Result<()> {
//! let writer = IoWriter::create("out.webm")?;
//! let mut segment = Segment::new(writer, SegmentConfig::default())?;
//!
//! let video = segment.add_video_track(640, 480)?;
//! segment.track_mut(video)?.set_frame_rate(30.0)?;
//!
//! # let frames: Vec<(Vec<u8>, u64, bool)> = Vec::new();
//! for (data, timestamp_ns, is_key) in frames {
//!     segment.add_frame(&data, video, timestamp_ns, is_key)?;
//! }
//! segment.finalize()?;
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod codec_private;
pub mod config;
pub mod cues;
pub mod ebml;
pub mod elements;
pub mod error;
pub mod seek_head;
pub mod segment;
pub mod segment_info;
pub mod serialize;
pub mod track;
pub mod writer;

// Re-export main types
pub use cluster::Cluster;
pub use codec_private::VorbisCodecPrivate;
pub use config::{FrameInfo, Mode, SegmentConfig, SplitPolicy};
pub use cues::{CuePoint, Cues};
pub use elements::codec_ids;
pub use error::{MuxError, Result};
pub use seek_head::SeekHead;
pub use segment::Segment;
pub use segment_info::SegmentInfo;
pub use serialize::write_ebml_header;
pub use track::{AudioSettings, StereoMode, Track, TrackKind, Tracks, VideoSettings};
pub use writer::{IoWriter, MkvWriter, StreamWriter};
