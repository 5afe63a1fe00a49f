//! Track model and the Tracks element.
//!
//! A [`Track`] carries the fields every TrackEntry has plus a [`TrackKind`]
//! holding the video- or audio-specific settings. [`Tracks`] owns the
//! entries, assigns track numbers in insertion order and serializes the
//! whole Tracks master element.

use crate::ebml;
use crate::elements::*;
use crate::error::{MuxError, Result};
use crate::serialize::{self, check_size};
use crate::writer::MkvWriter;

use rand::RngCore;

/// TrackType value for video tracks.
pub const TRACK_TYPE_VIDEO: u64 = 0x1;
/// TrackType value for audio tracks.
pub const TRACK_TYPE_AUDIO: u64 = 0x2;

/// Highest track number a one-byte SimpleBlock track field can carry.
pub const MAX_TRACK_NUMBER: u64 = 127;

/// Stereo-3D layout of a video track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StereoMode {
    /// Single view.
    Mono,
    /// Side by side, left eye first.
    SideBySideLeftIsFirst,
    /// Top-bottom, right eye first.
    TopBottomRightIsFirst,
    /// Top-bottom, left eye first.
    TopBottomLeftIsFirst,
    /// Side by side, right eye first.
    SideBySideRightIsFirst,
}

impl StereoMode {
    /// Map a raw StereoMode value to the WebM subset.
    pub fn from_value(value: u64) -> Result<Self> {
        match value {
            0 => Ok(StereoMode::Mono),
            1 => Ok(StereoMode::SideBySideLeftIsFirst),
            2 => Ok(StereoMode::TopBottomRightIsFirst),
            3 => Ok(StereoMode::TopBottomLeftIsFirst),
            11 => Ok(StereoMode::SideBySideRightIsFirst),
            other => Err(MuxError::InvalidStereoMode(other)),
        }
    }

    /// The value written to the StereoMode element.
    pub fn value(self) -> u64 {
        match self {
            StereoMode::Mono => 0,
            StereoMode::SideBySideLeftIsFirst => 1,
            StereoMode::TopBottomRightIsFirst => 2,
            StereoMode::TopBottomLeftIsFirst => 3,
            StereoMode::SideBySideRightIsFirst => 11,
        }
    }
}

/// Video-specific track settings.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSettings {
    /// Pixel width.
    pub width: u64,
    /// Pixel height.
    pub height: u64,
    /// Display width (for aspect ratio).
    pub display_width: Option<u64>,
    /// Display height (for aspect ratio).
    pub display_height: Option<u64>,
    /// Frames per second; not written unless positive.
    pub frame_rate: f64,
    /// Stereo layout; not written when unset.
    pub stereo_mode: Option<StereoMode>,
}

impl VideoSettings {
    fn payload_size(&self) -> u64 {
        let mut size = ebml::uint_element_size(PIXEL_WIDTH, self.width);
        size += ebml::uint_element_size(PIXEL_HEIGHT, self.height);
        if let Some(dw) = self.display_width {
            size += ebml::uint_element_size(DISPLAY_WIDTH, dw);
        }
        if let Some(dh) = self.display_height {
            size += ebml::uint_element_size(DISPLAY_HEIGHT, dh);
        }
        if let Some(mode) = self.stereo_mode {
            size += ebml::uint_element_size(STEREO_MODE, mode.value());
        }
        if self.frame_rate > 0.0 {
            size += ebml::float_element_size(FRAME_RATE);
        }
        size
    }

    fn write<W: MkvWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let size = self.payload_size();
        serialize::write_master_header(writer, VIDEO, size)?;
        let payload_start = writer.position();

        serialize::write_uint_element(writer, PIXEL_WIDTH, self.width)?;
        serialize::write_uint_element(writer, PIXEL_HEIGHT, self.height)?;
        if let Some(dw) = self.display_width {
            serialize::write_uint_element(writer, DISPLAY_WIDTH, dw)?;
        }
        if let Some(dh) = self.display_height {
            serialize::write_uint_element(writer, DISPLAY_HEIGHT, dh)?;
        }
        if let Some(mode) = self.stereo_mode {
            serialize::write_uint_element(writer, STEREO_MODE, mode.value())?;
        }
        if self.frame_rate > 0.0 {
            serialize::write_float_element(writer, FRAME_RATE, self.frame_rate as f32)?;
        }

        check_size(VIDEO, payload_start, writer.position(), size)
    }
}

/// Audio-specific track settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSettings {
    /// Sampling frequency in Hz.
    pub sample_rate: f64,
    /// Number of channels.
    pub channels: u64,
    /// Bits per sample; not written when zero.
    pub bit_depth: u64,
}

impl AudioSettings {
    fn payload_size(&self) -> u64 {
        let mut size = ebml::float_element_size(SAMPLING_FREQUENCY);
        size += ebml::uint_element_size(CHANNELS, self.channels);
        if self.bit_depth > 0 {
            size += ebml::uint_element_size(BIT_DEPTH, self.bit_depth);
        }
        size
    }

    fn write<W: MkvWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let size = self.payload_size();
        serialize::write_master_header(writer, AUDIO, size)?;
        let payload_start = writer.position();

        serialize::write_float_element(writer, SAMPLING_FREQUENCY, self.sample_rate as f32)?;
        serialize::write_uint_element(writer, CHANNELS, self.channels)?;
        if self.bit_depth > 0 {
            serialize::write_uint_element(writer, BIT_DEPTH, self.bit_depth)?;
        }

        check_size(AUDIO, payload_start, writer.position(), size)
    }
}

/// Type-specific part of a track.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackKind {
    /// Video track.
    Video(VideoSettings),
    /// Audio track.
    Audio(AudioSettings),
}

/// A single TrackEntry.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    number: u64,
    uid: u64,
    codec_id: String,
    codec_private: Option<Vec<u8>>,
    name: Option<String>,
    language: Option<String>,
    kind: TrackKind,
}

impl Track {
    /// Create a VP8 video track. The number and UID are assigned when the
    /// track is added to [`Tracks`].
    pub fn video(width: u64, height: u64) -> Self {
        Self::with_kind(
            codec_ids::V_VP8,
            TrackKind::Video(VideoSettings {
                width,
                height,
                display_width: None,
                display_height: None,
                frame_rate: 0.0,
                stereo_mode: None,
            }),
        )
    }

    /// Create a Vorbis audio track.
    pub fn audio(sample_rate: f64, channels: u64) -> Self {
        Self::with_kind(
            codec_ids::A_VORBIS,
            TrackKind::Audio(AudioSettings {
                sample_rate,
                channels,
                bit_depth: 0,
            }),
        )
    }

    fn with_kind(codec_id: &str, kind: TrackKind) -> Self {
        Self {
            number: 0,
            uid: 0,
            codec_id: codec_id.to_string(),
            codec_private: None,
            name: None,
            language: None,
            kind,
        }
    }

    /// Track number (1-based), or 0 before the track is added.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Track UID.
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// TrackType value.
    pub fn track_type(&self) -> u64 {
        match self.kind {
            TrackKind::Video(_) => TRACK_TYPE_VIDEO,
            TrackKind::Audio(_) => TRACK_TYPE_AUDIO,
        }
    }

    /// Whether this is a video track.
    pub fn is_video(&self) -> bool {
        matches!(self.kind, TrackKind::Video(_))
    }

    /// Whether this is an audio track.
    pub fn is_audio(&self) -> bool {
        matches!(self.kind, TrackKind::Audio(_))
    }

    /// Type-specific settings.
    pub fn kind(&self) -> &TrackKind {
        &self.kind
    }

    /// Codec ID string.
    pub fn codec_id(&self) -> &str {
        &self.codec_id
    }

    /// Override the codec ID.
    pub fn set_codec_id(&mut self, codec_id: impl Into<String>) {
        self.codec_id = codec_id.into();
    }

    /// Codec private data, if any.
    pub fn codec_private(&self) -> Option<&[u8]> {
        self.codec_private.as_deref()
    }

    /// Copy `data` in as the codec private blob.
    pub fn set_codec_private(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err("Codec private data is empty".into());
        }
        self.codec_private = Some(data.to_vec());
        Ok(())
    }

    /// Track name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Set the track name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Track language.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Set the track language (ISO 639-2, e.g. "eng").
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = Some(language.into());
    }

    /// Set display dimensions. Video tracks only.
    pub fn set_display_size(&mut self, width: u64, height: u64) -> Result<()> {
        let video = self.video_mut("display size")?;
        video.display_width = Some(width);
        video.display_height = Some(height);
        Ok(())
    }

    /// Set the frame rate. Video tracks only.
    pub fn set_frame_rate(&mut self, frame_rate: f64) -> Result<()> {
        self.video_mut("frame rate")?.frame_rate = frame_rate;
        Ok(())
    }

    /// Set the stereo mode from its raw value. Video tracks only.
    pub fn set_stereo_mode(&mut self, stereo_mode: u64) -> Result<()> {
        let mode = StereoMode::from_value(stereo_mode)?;
        self.video_mut("stereo mode")?.stereo_mode = Some(mode);
        Ok(())
    }

    /// Set bits per sample. Audio tracks only.
    pub fn set_bit_depth(&mut self, bit_depth: u64) -> Result<()> {
        match &mut self.kind {
            TrackKind::Audio(audio) => {
                audio.bit_depth = bit_depth;
                Ok(())
            }
            TrackKind::Video(_) => Err(MuxError::InvalidState(format!(
                "bit depth set on video track {}",
                self.number
            ))),
        }
    }

    fn video_mut(&mut self, what: &str) -> Result<&mut VideoSettings> {
        match &mut self.kind {
            TrackKind::Video(video) => Ok(video),
            TrackKind::Audio(_) => Err(MuxError::InvalidState(format!(
                "{} set on audio track {}",
                what, self.number
            ))),
        }
    }

    fn settings_size(&self) -> u64 {
        let (id, payload) = match &self.kind {
            TrackKind::Video(video) => (VIDEO, video.payload_size()),
            TrackKind::Audio(audio) => (AUDIO, audio.payload_size()),
        };
        ebml::master_element_size(id, payload) + payload
    }

    /// Size of the TrackEntry children.
    pub fn payload_size(&self) -> u64 {
        let mut size = ebml::uint_element_size(TRACK_NUMBER, self.number);
        size += ebml::uint_element_size(TRACK_UID, self.uid);
        size += ebml::uint_element_size(TRACK_TYPE, self.track_type());
        size += ebml::string_element_size(CODEC_ID, &self.codec_id);
        if let Some(data) = &self.codec_private {
            size += ebml::binary_element_size(CODEC_PRIVATE, data.len() as u64);
        }
        if let Some(name) = &self.name {
            size += ebml::string_element_size(NAME, name);
        }
        if let Some(language) = &self.language {
            size += ebml::string_element_size(LANGUAGE, language);
        }
        size + self.settings_size()
    }

    /// Size of the whole TrackEntry element.
    pub fn size(&self) -> u64 {
        let payload = self.payload_size();
        ebml::master_element_size(TRACK_ENTRY, payload) + payload
    }

    /// Write the TrackEntry element.
    pub fn write<W: MkvWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        if self.codec_id.is_empty() {
            return Err(MuxError::MissingMetadata("CodecID"));
        }

        let size = self.payload_size();
        serialize::write_master_header(writer, TRACK_ENTRY, size)?;
        let payload_start = writer.position();

        serialize::write_uint_element(writer, TRACK_NUMBER, self.number)?;
        serialize::write_uint_element(writer, TRACK_UID, self.uid)?;
        serialize::write_uint_element(writer, TRACK_TYPE, self.track_type())?;
        serialize::write_string_element(writer, CODEC_ID, &self.codec_id)?;
        if let Some(data) = &self.codec_private {
            serialize::write_binary_element(writer, CODEC_PRIVATE, data)?;
        }
        if let Some(name) = &self.name {
            serialize::write_string_element(writer, NAME, name)?;
        }
        if let Some(language) = &self.language {
            serialize::write_string_element(writer, LANGUAGE, language)?;
        }
        match &self.kind {
            TrackKind::Video(video) => video.write(writer)?,
            TrackKind::Audio(audio) => audio.write(writer)?,
        }

        check_size(TRACK_ENTRY, payload_start, writer.position(), size)
    }
}

/// Draw a track UID: 7 random bytes with the top byte left zero.
pub fn make_uid(rng: &mut dyn RngCore) -> u64 {
    let mut bytes = [0u8; 8];
    rng.fill_bytes(&mut bytes[1..]);
    u64::from_be_bytes(bytes)
}

/// The Tracks element.
#[derive(Debug, Clone, Default)]
pub struct Tracks {
    entries: Vec<Track>,
}

impl Tracks {
    /// Create an empty track list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `track`, assigning the next track number and a UID not used by
    /// any other track. Returns the track number.
    pub fn add_track(&mut self, mut track: Track, rng: &mut dyn RngCore) -> Result<u64> {
        let number = self.entries.len() as u64 + 1;
        if number > MAX_TRACK_NUMBER {
            return Err(MuxError::InvalidTrackNumber(number));
        }

        let mut uid = make_uid(rng);
        while uid == 0 || self.entries.iter().any(|t| t.uid == uid) {
            uid = make_uid(rng);
        }

        track.number = number;
        track.uid = uid;
        self.entries.push(track);
        Ok(number)
    }

    /// Number of tracks.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Whether no track has been added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a track by its number.
    pub fn get_by_number(&self, number: u64) -> Option<&Track> {
        self.entries.iter().find(|t| t.number == number)
    }

    /// Look up a track by its number, mutably.
    pub fn get_by_number_mut(&mut self, number: u64) -> Option<&mut Track> {
        self.entries.iter_mut().find(|t| t.number == number)
    }

    /// Look up a track by insertion index.
    pub fn get_by_index(&self, index: usize) -> Option<&Track> {
        self.entries.get(index)
    }

    /// Whether `number` names a video track.
    pub fn track_is_video(&self, number: u64) -> bool {
        self.get_by_number(number).is_some_and(Track::is_video)
    }

    /// Whether `number` names an audio track.
    pub fn track_is_audio(&self, number: u64) -> bool {
        self.get_by_number(number).is_some_and(Track::is_audio)
    }

    /// Iterate over tracks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.entries.iter()
    }

    /// Size of the Tracks children.
    pub fn payload_size(&self) -> u64 {
        self.entries.iter().map(Track::size).sum()
    }

    /// Write the Tracks element.
    pub fn write<W: MkvWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let size = self.payload_size();
        serialize::write_master_header(writer, TRACKS, size)?;
        let payload_start = writer.position();

        for track in &self.entries {
            track.write(writer)?;
        }

        check_size(TRACKS, payload_start, writer.position(), size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::StreamWriter;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_track_numbering() {
        let mut rng = rng();
        let mut tracks = Tracks::new();
        assert!(tracks.is_empty());
        assert_eq!(
            tracks.add_track(Track::video(320, 240), &mut rng).unwrap(),
            1
        );
        assert_eq!(
            tracks.add_track(Track::audio(44100.0, 2), &mut rng).unwrap(),
            2
        );
        assert_eq!(tracks.count(), 2);
        assert!(!tracks.is_empty());

        assert!(tracks.track_is_video(1));
        assert!(tracks.track_is_audio(2));
        assert!(!tracks.track_is_video(2));
        assert!(tracks.get_by_number(3).is_none());
        assert_eq!(tracks.get_by_index(1).map(Track::number), Some(2));
    }

    #[test]
    fn test_uids_are_56_bit_and_distinct() {
        let mut rng = rng();
        let mut tracks = Tracks::new();
        for _ in 0..10 {
            tracks.add_track(Track::audio(48000.0, 1), &mut rng).unwrap();
        }
        let uids: Vec<u64> = tracks.iter().map(Track::uid).collect();
        for (i, uid) in uids.iter().enumerate() {
            assert_ne!(*uid, 0);
            assert!(*uid < (1 << 56));
            assert!(!uids[i + 1..].contains(uid));
        }
    }

    #[test]
    fn test_uid_generation_is_deterministic_with_seed() {
        let a = make_uid(&mut StdRng::seed_from_u64(7));
        let b = make_uid(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_codec_ids() {
        assert_eq!(Track::video(1, 1).codec_id(), "V_VP8");
        assert_eq!(Track::audio(8000.0, 1).codec_id(), "A_VORBIS");
    }

    #[test]
    fn test_kind_specific_setters() {
        let mut video = Track::video(640, 480);
        assert!(video.set_frame_rate(30.0).is_ok());
        assert!(video.set_display_size(640, 360).is_ok());
        assert!(video.set_stereo_mode(11).is_ok());
        assert!(matches!(
            video.set_stereo_mode(5),
            Err(MuxError::InvalidStereoMode(5))
        ));
        assert!(video.set_bit_depth(16).is_err());

        let mut audio = Track::audio(48000.0, 2);
        assert!(audio.set_bit_depth(16).is_ok());
        assert!(audio.set_frame_rate(25.0).is_err());
    }

    #[test]
    fn test_codec_private_rejects_empty() {
        let mut track = Track::audio(44100.0, 2);
        assert!(track.set_codec_private(&[]).is_err());
        track.set_codec_private(&[2, 30, 60]).unwrap();
        assert_eq!(track.codec_private(), Some(&[2u8, 30, 60][..]));
    }

    #[test]
    fn test_write_matches_size() {
        let mut rng = rng();
        let mut tracks = Tracks::new();
        let v = tracks.add_track(Track::video(320, 240), &mut rng).unwrap();
        let a = tracks.add_track(Track::audio(44100.0, 2), &mut rng).unwrap();

        let video = tracks.get_by_number_mut(v).unwrap();
        video.set_name("camera");
        video.set_frame_rate(29.97).unwrap();
        video.set_stereo_mode(1).unwrap();
        let audio = tracks.get_by_number_mut(a).unwrap();
        audio.set_codec_private(&[0u8; 300]).unwrap();
        audio.set_language("eng");
        audio.set_bit_depth(16).unwrap();

        let mut writer = StreamWriter::new(Vec::new());
        tracks.write(&mut writer).unwrap();
        let expected =
            ebml::master_element_size(TRACKS, tracks.payload_size()) + tracks.payload_size();
        assert_eq!(writer.position(), expected);
        assert_eq!(&writer.get_ref()[..4], &[0x16, 0x54, 0xAE, 0x6B]);
    }

    #[test]
    fn test_empty_codec_id_is_rejected() {
        let mut rng = rng();
        let mut tracks = Tracks::new();
        let n = tracks.add_track(Track::video(2, 2), &mut rng).unwrap();
        tracks.get_by_number_mut(n).unwrap().set_codec_id("");

        let mut writer = StreamWriter::new(Vec::new());
        assert!(matches!(
            tracks.write(&mut writer),
            Err(MuxError::MissingMetadata("CodecID"))
        ));
    }
}
