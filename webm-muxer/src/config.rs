//! Segment configuration.

use crate::cluster::Cluster;
use crate::segment_info::{DEFAULT_TIMECODE_SCALE, MUXING_APP_NAME};
use crate::serialize;

/// Output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Seekable file: sizes, duration, SeekHead and Cues are written at
    /// finalize.
    #[default]
    File,
    /// Append-only stream: sizes stay "unknown" and nothing is patched.
    Live,
}

/// What the segment knows about an incoming frame when deciding whether to
/// open a new cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Target track.
    pub track_number: u64,
    /// Absolute timestamp in nanoseconds.
    pub timestamp_ns: u64,
    /// Frame payload length.
    pub length: u64,
    /// Key frame flag.
    pub is_key: bool,
    /// Whether the target track is a video track.
    pub is_video: bool,
}

/// Rule for starting a new cluster while one is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SplitPolicy {
    /// Split on every video key frame.
    #[default]
    KeyFrame,
    /// Split on video key frames, or when the open cluster would exceed a
    /// duration or size limit.
    KeyFrameOrLimits {
        /// Maximum time from the cluster start, in nanoseconds.
        max_duration_ns: Option<u64>,
        /// Maximum cluster payload size in bytes.
        max_size_bytes: Option<u64>,
    },
}

impl SplitPolicy {
    /// Whether `frame` should open a new cluster instead of joining
    /// `cluster`.
    pub fn should_split(&self, cluster: &Cluster, frame: &FrameInfo, timecode_scale: u64) -> bool {
        if frame.is_video && frame.is_key {
            return true;
        }

        match *self {
            SplitPolicy::KeyFrame => false,
            SplitPolicy::KeyFrameOrLimits {
                max_duration_ns,
                max_size_bytes,
            } => {
                if cluster.blocks_added() == 0 {
                    return false;
                }
                let cluster_start_ns = cluster.timecode().saturating_mul(timecode_scale);
                let over_duration = max_duration_ns
                    .is_some_and(|max| frame.timestamp_ns.saturating_sub(cluster_start_ns) >= max);
                let over_size = max_size_bytes.is_some_and(|max| {
                    cluster.payload_size()
                        + serialize::simple_block_size(frame.track_number, frame.length)
                        > max
                });
                over_duration || over_size
            }
        }
    }
}

/// Segment configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentConfig {
    /// Output mode.
    pub mode: Mode,
    /// Nanoseconds per timecode unit.
    pub timecode_scale: u64,
    /// Write a Cues index at finalize (File mode only).
    pub output_cues: bool,
    /// WritingApp string.
    pub writing_app: String,
    /// Cluster split rule.
    pub split_policy: SplitPolicy,
    /// Track whose key frames get cue points. Defaults to the first video
    /// track, else the first track.
    pub cues_track: Option<u64>,
    /// Write CueBlockNumber for cue points past the first block of a
    /// cluster.
    pub output_block_number: bool,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            mode: Mode::File,
            timecode_scale: DEFAULT_TIMECODE_SCALE,
            output_cues: true,
            writing_app: MUXING_APP_NAME.to_string(),
            split_policy: SplitPolicy::KeyFrame,
            cues_track: None,
            output_block_number: true,
        }
    }
}

impl SegmentConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output mode.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the timecode scale (nanoseconds per timecode unit).
    pub fn with_timecode_scale(mut self, scale: u64) -> Self {
        self.timecode_scale = scale;
        self
    }

    /// Enable or disable the Cues index.
    pub fn with_cues(mut self, enabled: bool) -> Self {
        self.output_cues = enabled;
        self
    }

    /// Set the writing application name.
    pub fn with_writing_app(mut self, app: impl Into<String>) -> Self {
        self.writing_app = app.into();
        self
    }

    /// Set the cluster split rule.
    pub fn with_split_policy(mut self, policy: SplitPolicy) -> Self {
        self.split_policy = policy;
        self
    }

    /// Set the track that receives cue points.
    pub fn with_cues_track(mut self, track_number: u64) -> Self {
        self.cues_track = Some(track_number);
        self
    }

    /// Enable or disable CueBlockNumber in cue points.
    pub fn with_output_block_number(mut self, enabled: bool) -> Self {
        self.output_block_number = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::StreamWriter;

    fn frame(timestamp_ns: u64, is_key: bool, is_video: bool) -> FrameInfo {
        FrameInfo {
            track_number: 1,
            timestamp_ns,
            length: 100,
            is_key,
            is_video,
        }
    }

    #[test]
    fn test_config_default() {
        let config = SegmentConfig::default();
        assert_eq!(config.mode, Mode::File);
        assert_eq!(config.timecode_scale, 1_000_000);
        assert!(config.output_cues);
        assert!(config.writing_app.starts_with("webm-muxer-"));
        assert_eq!(config.split_policy, SplitPolicy::KeyFrame);
        assert_eq!(config.cues_track, None);
        assert!(config.output_block_number);
    }

    #[test]
    fn test_config_builder() {
        let config = SegmentConfig::new()
            .with_mode(Mode::Live)
            .with_timecode_scale(500_000)
            .with_cues(false)
            .with_writing_app("test-app")
            .with_cues_track(2)
            .with_output_block_number(false);

        assert_eq!(config.mode, Mode::Live);
        assert_eq!(config.timecode_scale, 500_000);
        assert!(!config.output_cues);
        assert_eq!(config.writing_app, "test-app");
        assert_eq!(config.cues_track, Some(2));
        assert!(!config.output_block_number);
    }

    #[test]
    fn test_key_frame_policy() {
        let cluster = Cluster::new(0, 0);
        let policy = SplitPolicy::KeyFrame;
        assert!(policy.should_split(&cluster, &frame(0, true, true), 1_000_000));
        assert!(!policy.should_split(&cluster, &frame(0, false, true), 1_000_000));
        // Audio key frames never split
        assert!(!policy.should_split(&cluster, &frame(u64::MAX, true, false), 1_000_000));
    }

    #[test]
    fn test_limits_policy() {
        let mut writer = StreamWriter::new(Vec::new());
        let mut cluster = Cluster::new(1000, 0);
        cluster.add_frame(&mut writer, &[0; 100], 1, 0, true).unwrap();

        let policy = SplitPolicy::KeyFrameOrLimits {
            max_duration_ns: Some(5_000_000_000),
            max_size_bytes: None,
        };
        assert!(!policy.should_split(&cluster, &frame(5_999_000_000, false, false), 1_000_000));
        assert!(policy.should_split(&cluster, &frame(6_000_000_000, false, false), 1_000_000));

        let policy = SplitPolicy::KeyFrameOrLimits {
            max_duration_ns: None,
            max_size_bytes: Some(200),
        };
        assert!(policy.should_split(&cluster, &frame(1_000_000_000, false, false), 1_000_000));
    }
}
