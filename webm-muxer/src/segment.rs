//! The Segment: top-level muxing session.
//!
//! A [`Segment`] owns the track list, segment info, SeekHead, Cues and the
//! cluster list, and drives a single [`MkvWriter`]. The header goes out with
//! the first frame; [`Segment::finalize`] closes the last cluster and, in
//! [`Mode::File`] on a seekable sink, patches every deferred field:
//!
//! ```text
//! EBML header
//! Segment (8-byte size, patched)
//!   SeekHead (Void reservation, patched)
//!   Info (Duration placeholder, patched)
//!   Tracks
//!   Cluster* (8-byte size, patched)
//!   Cues
//! ```

use crate::cluster::Cluster;
use crate::config::{FrameInfo, Mode, SegmentConfig};
use crate::cues::{CuePoint, Cues};
use crate::ebml::{MAX_VINT_LENGTH, UNKNOWN_SIZE_8};
use crate::elements::*;
use crate::error::{MuxError, Result};
use crate::seek_head::SeekHead;
use crate::segment_info::SegmentInfo;
use crate::serialize;
use crate::track::{Track, Tracks};
use crate::writer::MkvWriter;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, trace, warn};

/// Placeholder duration reserved in File mode until the real one is known.
const DURATION_PLACEHOLDER: f64 = 1.0;

/// A muxing session writing one Segment.
pub struct Segment<W: MkvWriter> {
    writer: W,
    config: SegmentConfig,
    rng: Box<dyn RngCore + Send>,
    info: SegmentInfo,
    tracks: Tracks,
    seek_head: SeekHead,
    cues: Cues,
    clusters: Vec<Cluster>,
    header_written: bool,
    finalized: bool,
    size_position: u64,
    payload_start: u64,
    max_timestamp_ns: u64,
}

impl<W: MkvWriter> Segment<W> {
    /// Create a segment over `writer`, seeding track UIDs from OS entropy.
    pub fn new(writer: W, config: SegmentConfig) -> Result<Self> {
        Self::with_rng(writer, config, StdRng::from_entropy())
    }

    /// Create a segment drawing track UIDs from `rng`.
    pub fn with_rng<R>(writer: W, config: SegmentConfig, rng: R) -> Result<Self>
    where
        R: RngCore + Send + 'static,
    {
        if config.timecode_scale == 0 {
            return Err("Timecode scale must be positive".into());
        }

        let mut info = SegmentInfo::new();
        info.init(config.writing_app.clone());
        info.set_timecode_scale(config.timecode_scale);

        let mut cues = Cues::new();
        cues.set_output_block_number(config.output_block_number);

        Ok(Self {
            writer,
            config,
            rng: Box::new(rng),
            info,
            tracks: Tracks::new(),
            seek_head: SeekHead::new(),
            cues,
            clusters: Vec::new(),
            header_written: false,
            finalized: false,
            size_position: 0,
            payload_start: 0,
            max_timestamp_ns: 0,
        })
    }

    /// Output mode.
    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Change the output mode. Only allowed before anything is written.
    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.ensure_header_pending("mode")?;
        self.config.mode = mode;
        Ok(())
    }

    /// Active configuration.
    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    fn ensure_header_pending(&self, what: &str) -> Result<()> {
        if self.header_written {
            return Err(MuxError::InvalidState(format!(
                "cannot change {} after the segment header is written",
                what
            )));
        }
        Ok(())
    }

    fn can_patch(&self) -> bool {
        self.config.mode == Mode::File && self.writer.seekable()
    }

    /// Add a track and return its number.
    pub fn add_track(&mut self, track: Track) -> Result<u64> {
        self.ensure_header_pending("tracks")?;
        self.tracks.add_track(track, self.rng.as_mut())
    }

    /// Add a VP8 video track.
    pub fn add_video_track(&mut self, width: u64, height: u64) -> Result<u64> {
        let number = self.add_track(Track::video(width, height))?;
        debug!(track = number, width, height, "Added video track");
        Ok(number)
    }

    /// Add a Vorbis audio track.
    pub fn add_audio_track(&mut self, sample_rate: f64, channels: u64) -> Result<u64> {
        let number = self.add_track(Track::audio(sample_rate, channels))?;
        debug!(track = number, sample_rate, channels, "Added audio track");
        Ok(number)
    }

    /// All tracks.
    pub fn tracks(&self) -> &Tracks {
        &self.tracks
    }

    /// Look up a track by number.
    pub fn track_by_number(&self, track_number: u64) -> Option<&Track> {
        self.tracks.get_by_number(track_number)
    }

    /// Mutable access to a track for its setters. Tracks are frozen once the
    /// header is written.
    pub fn track_mut(&mut self, track_number: u64) -> Result<&mut Track> {
        self.ensure_header_pending("track settings")?;
        self.tracks
            .get_by_number_mut(track_number)
            .ok_or(MuxError::TrackNotFound { track_number })
    }

    /// Choose the track whose key frames get cue points.
    pub fn set_cues_track(&mut self, track_number: u64) -> Result<()> {
        if self.tracks.get_by_number(track_number).is_none() {
            return Err(MuxError::TrackNotFound { track_number });
        }
        self.config.cues_track = Some(track_number);
        Ok(())
    }

    /// Track that receives cue points.
    pub fn cues_track(&self) -> Option<u64> {
        self.config.cues_track.or_else(|| {
            self.tracks
                .iter()
                .find(|t| t.is_video())
                .or_else(|| self.tracks.get_by_index(0))
                .map(Track::number)
        })
    }

    /// Recorded cue points.
    pub fn cues(&self) -> &Cues {
        &self.cues
    }

    /// Whether cue points carry CueBlockNumber. Only allowed before
    /// anything is written.
    pub fn set_output_block_number(&mut self, enabled: bool) -> Result<()> {
        self.ensure_header_pending("cue block numbers")?;
        self.config.output_block_number = enabled;
        self.cues.set_output_block_number(enabled);
        Ok(())
    }

    /// Segment information.
    pub fn segment_info(&self) -> &SegmentInfo {
        &self.info
    }

    /// Override the MuxingApp string.
    pub fn set_muxing_app(&mut self, app: impl Into<String>) -> Result<()> {
        self.ensure_header_pending("muxing app")?;
        self.info.set_muxing_app(app);
        Ok(())
    }

    /// Override the WritingApp string.
    pub fn set_writing_app(&mut self, app: impl Into<String>) -> Result<()> {
        self.ensure_header_pending("writing app")?;
        let app = app.into();
        self.info.set_writing_app(app.clone());
        self.config.writing_app = app;
        Ok(())
    }

    /// Clusters opened so far, oldest first.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// File offset of the segment payload, once the header is written.
    pub fn payload_start(&self) -> Option<u64> {
        self.header_written.then_some(self.payload_start)
    }

    /// Whether [`finalize`](Segment::finalize) has completed.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Get a reference to the sink.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Unwrap the sink. Call [`finalize`](Segment::finalize) first.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<()> {
        if self.config.mode == Mode::File && !self.writer.seekable() {
            warn!("File mode on a non-seekable sink, sizes will not be patched");
        }
        if self.tracks.is_empty() {
            warn!("Writing a segment with no tracks");
        }

        serialize::write_ebml_header(&mut self.writer)?;

        serialize::write_id(&mut self.writer, SEGMENT)?;
        self.size_position = self.writer.position();
        self.writer.write(&UNKNOWN_SIZE_8.to_be_bytes())?;
        self.payload_start = self.writer.position();

        self.seek_head.write(&mut self.writer)?;

        if self.can_patch() {
            self.info.set_duration(DURATION_PLACEHOLDER);
        }
        let info_pos = self.writer.position() - self.payload_start;
        self.info.write(&mut self.writer)?;
        self.seek_head.add_entry(INFO, info_pos)?;

        let tracks_pos = self.writer.position() - self.payload_start;
        self.tracks.write(&mut self.writer)?;
        self.seek_head.add_entry(TRACKS, tracks_pos)?;

        self.header_written = true;
        debug!(
            mode = ?self.config.mode,
            tracks = self.tracks.count(),
            "Segment header written, payload starts at {}",
            self.payload_start
        );
        Ok(())
    }

    /// Add one frame.
    ///
    /// `timestamp_ns` is absolute, in nanoseconds. A video key frame opens a
    /// new cluster (as may the configured split policy); the previous
    /// cluster is closed first.
    pub fn add_frame(
        &mut self,
        data: &[u8],
        track_number: u64,
        timestamp_ns: u64,
        is_key: bool,
    ) -> Result<()> {
        if self.finalized {
            return Err(MuxError::InvalidState(
                "cannot add frames to a finalized segment".to_string(),
            ));
        }
        let track = self
            .tracks
            .get_by_number(track_number)
            .ok_or(MuxError::TrackNotFound { track_number })?;
        let is_video = track.is_video();
        if data.is_empty() {
            return Err(MuxError::EmptyFrame);
        }

        if !self.header_written {
            self.write_header()?;
        }

        let scale = self.config.timecode_scale;
        let timecode = timestamp_ns / scale;
        let frame = FrameInfo {
            track_number,
            timestamp_ns,
            length: data.len() as u64,
            is_key,
            is_video,
        };

        let new_cluster = match self.clusters.last() {
            None => true,
            Some(cluster) => {
                // SimpleBlock timecodes are i16 relative to the cluster.
                let span = timecode.saturating_sub(cluster.timecode());
                if span > i16::MAX as u64 {
                    debug!(
                        timecode,
                        span,
                        "Relative timecode out of range, starting cluster"
                    );
                    true
                } else {
                    self.config.split_policy.should_split(cluster, &frame, scale)
                }
            }
        };
        if new_cluster {
            self.new_cluster(timecode)?;
        }

        let cluster = self
            .clusters
            .last_mut()
            .ok_or_else(|| MuxError::InvalidState("no open cluster".to_string()))?;

        let relative = timecode as i64 - cluster.timecode() as i64;
        if relative < 0 {
            return Err(MuxError::NegativeTimecode {
                timecode,
                cluster_timecode: cluster.timecode(),
            });
        }
        let relative =
            i16::try_from(relative).map_err(|_| MuxError::TimecodeOverflow { relative })?;

        let block_number =
            cluster.add_frame(&mut self.writer, data, track_number, relative, is_key)?;
        let cluster_pos = cluster.position() - self.payload_start;

        if is_key
            && self.config.output_cues
            && self.config.mode == Mode::File
            && self.cues_track() == Some(track_number)
        {
            let cue = CuePoint::new(timecode, track_number, cluster_pos, block_number);
            self.cues.add_cue(cue);
        }

        self.max_timestamp_ns = self.max_timestamp_ns.max(timestamp_ns);
        trace!(
            track = track_number,
            timestamp_ns,
            key = is_key,
            "Frame added"
        );
        Ok(())
    }

    fn new_cluster(&mut self, timecode: u64) -> Result<()> {
        let patch = self.can_patch();
        if let Some(previous) = self.clusters.last_mut() {
            previous.finalize(&mut self.writer, patch)?;
        }

        let position = self.writer.position();
        if self.clusters.is_empty() {
            self.seek_head.add_entry(CLUSTER, position - self.payload_start)?;
        }
        self.clusters.push(Cluster::new(timecode, position));
        Ok(())
    }

    /// Finish the segment.
    ///
    /// Closes the last cluster. In File mode writes Cues and, on a seekable
    /// sink, patches Duration, SeekHead and the Segment size. Calling it
    /// again does nothing.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        if !self.header_written {
            self.write_header()?;
        }

        let patch = self.can_patch();
        if let Some(cluster) = self.clusters.last_mut() {
            if !cluster.is_finalized() {
                cluster.finalize(&mut self.writer, patch)?;
            }
        }

        if self.config.mode == Mode::File {
            if self.config.output_cues && !self.cues.is_empty() {
                let cues_pos = self.writer.position() - self.payload_start;
                self.cues.write(&mut self.writer)?;
                self.seek_head.add_entry(CUES, cues_pos)?;
                debug!(count = self.cues.len(), "Cues written at {}", cues_pos);
            }

            if patch {
                let duration = self.max_timestamp_ns as f64 / self.config.timecode_scale as f64;
                self.info.set_duration(duration);
                self.info.finalize(&mut self.writer)?;
                self.seek_head.finalize(&mut self.writer)?;

                let end = self.writer.position();
                let size = end - self.payload_start;
                self.writer.seek(self.size_position)?;
                serialize::write_coded_size_fixed(&mut self.writer, size, MAX_VINT_LENGTH)?;
                self.writer.seek(end)?;
                debug!(size, duration, "Segment finalized");
            }
        }

        self.writer.flush()?;
        self.finalized = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SplitPolicy;
    use crate::writer::{IoWriter, StreamWriter};
    use std::io::Cursor;

    type MemSegment = Segment<IoWriter<Cursor<Vec<u8>>>>;

    fn file_segment(config: SegmentConfig) -> MemSegment {
        let writer = IoWriter::new(Cursor::new(Vec::new())).unwrap();
        Segment::with_rng(writer, config, StdRng::seed_from_u64(1)).unwrap()
    }

    #[test]
    fn test_rejects_zero_timecode_scale() {
        let writer = StreamWriter::new(Vec::new());
        let config = SegmentConfig::new().with_timecode_scale(0);
        assert!(matches!(Segment::new(writer, config), Err(MuxError::Other(_))));
    }

    #[test]
    fn test_track_numbers() {
        let mut segment = file_segment(SegmentConfig::default());
        assert_eq!(segment.add_video_track(320, 240).unwrap(), 1);
        assert_eq!(segment.add_audio_track(44100.0, 2).unwrap(), 2);
        assert!(segment.track_by_number(1).unwrap().is_video());
        assert!(segment.track_by_number(2).unwrap().is_audio());
        assert!(segment.track_by_number(3).is_none());
    }

    #[test]
    fn test_unknown_track_and_empty_frame() {
        let mut segment = file_segment(SegmentConfig::default());
        segment.add_video_track(64, 64).unwrap();
        assert!(matches!(
            segment.add_frame(&[1], 9, 0, true),
            Err(MuxError::TrackNotFound { track_number: 9 })
        ));
        assert!(matches!(
            segment.add_frame(&[], 1, 0, true),
            Err(MuxError::EmptyFrame)
        ));
        assert_eq!(segment.writer().position(), 0);
    }

    #[test]
    fn test_settings_frozen_after_first_frame() {
        let mut segment = file_segment(SegmentConfig::default());
        let video = segment.add_video_track(64, 64).unwrap();
        segment.track_mut(video).unwrap().set_name("cam");
        segment.add_frame(&[1], video, 0, true).unwrap();

        assert!(matches!(
            segment.set_mode(Mode::Live),
            Err(MuxError::InvalidState(_))
        ));
        assert!(matches!(
            segment.track_mut(video),
            Err(MuxError::InvalidState(_))
        ));
        assert!(segment.add_audio_track(8000.0, 1).is_err());
    }

    #[test]
    fn test_key_frames_open_clusters() {
        let mut segment = file_segment(SegmentConfig::default());
        let video = segment.add_video_track(320, 240).unwrap();
        let audio = segment.add_audio_track(44100.0, 2).unwrap();

        segment.add_frame(&[0; 10], video, 0, true).unwrap();
        segment.add_frame(&[0; 10], audio, 5_000_000, true).unwrap();
        segment.add_frame(&[0; 10], video, 33_000_000, false).unwrap();
        segment.add_frame(&[0; 10], video, 66_000_000, true).unwrap();
        segment.finalize().unwrap();

        let clusters = segment.clusters();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].blocks_added(), 3);
        assert_eq!(clusters[1].timecode(), 66);
        assert!(clusters.iter().all(Cluster::is_finalized));
    }

    #[test]
    fn test_cues_recorded_for_video_key_frames() {
        let mut segment = file_segment(SegmentConfig::default());
        let video = segment.add_video_track(320, 240).unwrap();
        let audio = segment.add_audio_track(44100.0, 2).unwrap();

        segment.add_frame(&[0; 10], audio, 0, true).unwrap();
        segment.add_frame(&[0; 10], video, 1_000_000, true).unwrap();
        segment.add_frame(&[0; 10], video, 2_000_000, false).unwrap();
        segment.finalize().unwrap();

        assert_eq!(segment.cues().len(), 1);
        let cue = segment.cues().get(0).unwrap();
        assert_eq!(cue.track, video);
        assert_eq!(cue.time, 1);
        assert_eq!(cue.block_number, 1);
        let payload_start = segment.payload_start().unwrap();
        assert_eq!(
            cue.cluster_pos,
            segment.clusters()[1].position() - payload_start
        );
    }

    #[test]
    fn test_set_cues_track() {
        let mut segment = file_segment(SegmentConfig::default());
        let video = segment.add_video_track(320, 240).unwrap();
        let audio = segment.add_audio_track(44100.0, 2).unwrap();
        assert_eq!(segment.cues_track(), Some(video));

        assert!(segment.set_cues_track(7).is_err());
        segment.set_cues_track(audio).unwrap();
        segment.add_frame(&[1], audio, 0, true).unwrap();
        segment.add_frame(&[1], audio, 20_000_000, true).unwrap();
        assert_eq!(segment.cues().len(), 2);
        assert_eq!(segment.cues().get(1).unwrap().block_number, 2);
    }

    #[test]
    fn test_negative_relative_timecode_is_rejected() {
        let mut segment = file_segment(SegmentConfig::default());
        let video = segment.add_video_track(320, 240).unwrap();
        let audio = segment.add_audio_track(44100.0, 2).unwrap();

        segment.add_frame(&[1], video, 100_000_000, true).unwrap();
        assert!(matches!(
            segment.add_frame(&[1], audio, 50_000_000, true),
            Err(MuxError::NegativeTimecode { timecode: 50, cluster_timecode: 100 })
        ));
    }

    #[test]
    fn test_relative_timecode_range_forces_new_cluster() {
        let mut segment = file_segment(SegmentConfig::default());
        let video = segment.add_video_track(320, 240).unwrap();

        segment.add_frame(&[1], video, 0, true).unwrap();
        segment.add_frame(&[1], video, 32_767_000_000, false).unwrap();
        assert_eq!(segment.clusters().len(), 1);

        segment.add_frame(&[1], video, 32_768_000_000, false).unwrap();
        assert_eq!(segment.clusters().len(), 2);
        assert_eq!(segment.clusters()[1].timecode(), 32_768);
        assert!(segment.clusters()[0].is_finalized());
    }

    #[test]
    fn test_long_audio_only_stream() {
        let mut segment = file_segment(SegmentConfig::default());
        let audio = segment.add_audio_track(48000.0, 2).unwrap();
        for i in 0..400u64 {
            segment.add_frame(&[0; 8], audio, i * 100_000_000, true).unwrap();
        }
        segment.finalize().unwrap();

        let clusters = segment.clusters();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[1].timecode(), 32_800);
        assert_eq!(clusters[0].blocks_added() + clusters[1].blocks_added(), 400);
    }

    #[test]
    fn test_long_video_with_single_key_frame() {
        let mut segment = file_segment(SegmentConfig::default());
        let video = segment.add_video_track(320, 240).unwrap();
        for i in 0..1500u64 {
            segment.add_frame(&[0; 4], video, i * 1_000_000_000 / 30, i == 0).unwrap();
        }
        segment.finalize().unwrap();

        let clusters = segment.clusters();
        assert_eq!(clusters.len(), 2);
        assert!(clusters[1].timecode() > i16::MAX as u64);
        // Only the key frame is indexed
        assert_eq!(segment.cues().len(), 1);
    }

    #[test]
    fn test_block_number_toggle() {
        let mut segment = file_segment(SegmentConfig::default());
        let audio = segment.add_audio_track(44100.0, 2).unwrap();
        segment.set_output_block_number(false).unwrap();
        segment.add_frame(&[1], audio, 0, true).unwrap();
        segment.add_frame(&[1], audio, 20_000_000, true).unwrap();

        assert!(segment.cues().iter().all(|cue| !cue.output_block_number));
        assert!(segment.set_output_block_number(true).is_err());
    }

    #[test]
    fn test_app_overrides() {
        let mut segment = file_segment(SegmentConfig::default());
        let video = segment.add_video_track(64, 64).unwrap();
        segment.set_muxing_app("mux-1").unwrap();
        segment.set_writing_app("app-2").unwrap();
        assert_eq!(segment.segment_info().muxing_app(), Some("mux-1"));
        assert_eq!(segment.segment_info().writing_app(), Some("app-2"));

        segment.add_frame(&[1], video, 0, true).unwrap();
        assert!(matches!(
            segment.set_muxing_app("late"),
            Err(MuxError::InvalidState(_))
        ));
    }

    #[test]
    fn test_duration_limit_splits_audio_only_stream() {
        let config = SegmentConfig::new().with_split_policy(SplitPolicy::KeyFrameOrLimits {
            max_duration_ns: Some(1_000_000_000),
            max_size_bytes: None,
        });
        let mut segment = file_segment(config);
        let audio = segment.add_audio_track(48000.0, 2).unwrap();
        for i in 0..50u64 {
            segment.add_frame(&[0; 8], audio, i * 100_000_000, true).unwrap();
        }
        segment.finalize().unwrap();
        assert_eq!(segment.clusters().len(), 5);
    }

    #[test]
    fn test_finalize_twice_and_add_after() {
        let mut segment = file_segment(SegmentConfig::default());
        let video = segment.add_video_track(320, 240).unwrap();
        segment.add_frame(&[1], video, 0, true).unwrap();
        segment.finalize().unwrap();
        let len = segment.writer().position();

        segment.finalize().unwrap();
        assert_eq!(segment.writer().position(), len);
        assert!(matches!(
            segment.add_frame(&[1], video, 1_000_000, false),
            Err(MuxError::InvalidState(_))
        ));
    }

    #[test]
    fn test_duration_is_patched() {
        let mut segment = file_segment(SegmentConfig::default());
        let video = segment.add_video_track(320, 240).unwrap();
        segment.add_frame(&[1], video, 0, true).unwrap();
        segment.add_frame(&[1], video, 1_500_000_000, false).unwrap();
        segment.finalize().unwrap();

        assert_eq!(segment.segment_info().duration(), Some(1500.0));
        let pos = segment.segment_info().duration_position().unwrap() as usize;
        let bytes = segment.into_inner().into_inner().into_inner();
        let value =
            f32::from_be_bytes([bytes[pos + 3], bytes[pos + 4], bytes[pos + 5], bytes[pos + 6]]);
        assert_eq!(value, 1500.0);
    }

    #[test]
    fn test_file_mode_on_stream_skips_patches() {
        let writer = StreamWriter::new(Vec::new());
        let mut segment =
            Segment::with_rng(writer, SegmentConfig::default(), StdRng::seed_from_u64(3)).unwrap();
        let video = segment.add_video_track(320, 240).unwrap();
        segment.add_frame(&[1], video, 0, true).unwrap();
        segment.finalize().unwrap();

        assert!(segment.segment_info().duration_position().is_none());
        assert_eq!(segment.cues().len(), 1);
        let bytes = segment.into_inner().into_inner();
        // Cues were still appended
        assert!(bytes.windows(4).any(|w| w == [0x1C, 0x53, 0xBB, 0x6B]));
    }
}
