//! The Info element.
//!
//! Duration is written in two passes: a placeholder float is emitted with
//! the rest of the element and its offset recorded, then
//! [`SegmentInfo::finalize`] seeks back and overwrites it once the last
//! timestamp is known. A float element has a fixed size, so the patch never
//! shifts any bytes.

use crate::ebml;
use crate::elements::*;
use crate::error::{MuxError, Result};
use crate::serialize::{self, check_size};
use crate::writer::MkvWriter;

use tracing::debug;

/// Default timecode scale (1 millisecond = 1,000,000 nanoseconds).
pub const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

/// Muxing application string written into every file.
pub const MUXING_APP_NAME: &str = concat!("webm-muxer-", env!("CARGO_PKG_VERSION"));

/// Segment information.
#[derive(Debug, Clone)]
pub struct SegmentInfo {
    timecode_scale: u64,
    /// Negative means "do not write".
    duration: f64,
    muxing_app: Option<String>,
    writing_app: Option<String>,
    duration_pos: Option<u64>,
}

impl Default for SegmentInfo {
    fn default() -> Self {
        Self {
            timecode_scale: DEFAULT_TIMECODE_SCALE,
            duration: -1.0,
            muxing_app: None,
            writing_app: None,
            duration_pos: None,
        }
    }
}

impl SegmentInfo {
    /// Create with the default timecode scale and no application strings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the muxing and writing application strings.
    pub fn init(&mut self, writing_app: impl Into<String>) {
        self.muxing_app = Some(MUXING_APP_NAME.to_string());
        self.writing_app = Some(writing_app.into());
    }

    /// Nanoseconds per timecode unit.
    pub fn timecode_scale(&self) -> u64 {
        self.timecode_scale
    }

    /// Set the timecode scale.
    pub fn set_timecode_scale(&mut self, scale: u64) {
        self.timecode_scale = scale;
    }

    /// Duration in timecode units, if set.
    pub fn duration(&self) -> Option<f64> {
        (self.duration > 0.0).then_some(self.duration)
    }

    /// Set the duration in timecode units. Non-positive values unset it.
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }

    /// Muxing application string.
    pub fn muxing_app(&self) -> Option<&str> {
        self.muxing_app.as_deref()
    }

    /// Override the muxing application string.
    pub fn set_muxing_app(&mut self, app: impl Into<String>) {
        self.muxing_app = Some(app.into());
    }

    /// Writing application string.
    pub fn writing_app(&self) -> Option<&str> {
        self.writing_app.as_deref()
    }

    /// Override the writing application string.
    pub fn set_writing_app(&mut self, app: impl Into<String>) {
        self.writing_app = Some(app.into());
    }

    /// Offset of the Duration element, once written.
    pub fn duration_position(&self) -> Option<u64> {
        self.duration_pos
    }

    fn payload_size(&self, muxing_app: &str, writing_app: &str) -> u64 {
        let mut size = ebml::uint_element_size(TIMECODE_SCALE, self.timecode_scale);
        if self.duration > 0.0 {
            size += ebml::float_element_size(DURATION);
        }
        size += ebml::string_element_size(MUXING_APP, muxing_app);
        size += ebml::string_element_size(WRITING_APP, writing_app);
        size
    }

    /// Write the Info element.
    pub fn write<W: MkvWriter + ?Sized>(&mut self, writer: &mut W) -> Result<()> {
        let muxing_app = self
            .muxing_app
            .as_deref()
            .ok_or(MuxError::MissingMetadata("MuxingApp"))?;
        let writing_app = self
            .writing_app
            .as_deref()
            .ok_or(MuxError::MissingMetadata("WritingApp"))?;

        let size = self.payload_size(muxing_app, writing_app);
        serialize::write_master_header(writer, INFO, size)?;
        let payload_start = writer.position();

        serialize::write_uint_element(writer, TIMECODE_SCALE, self.timecode_scale)?;
        let mut duration_pos = None;
        if self.duration > 0.0 {
            duration_pos = Some(writer.position());
            serialize::write_float_element(writer, DURATION, self.duration as f32)?;
        }
        serialize::write_string_element(writer, MUXING_APP, muxing_app)?;
        serialize::write_string_element(writer, WRITING_APP, writing_app)?;

        check_size(INFO, payload_start, writer.position(), size)?;
        self.duration_pos = duration_pos;
        Ok(())
    }

    /// Overwrite the reserved Duration with the current duration.
    ///
    /// Does nothing if no Duration was reserved. The write position is
    /// restored afterwards.
    pub fn finalize<W: MkvWriter + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let Some(duration_pos) = self.duration_pos else {
            return Ok(());
        };
        if !writer.seekable() {
            return Err(MuxError::NotSeekable);
        }

        let end = writer.position();
        writer.seek(duration_pos)?;
        serialize::write_float_element(writer, DURATION, self.duration.max(0.0) as f32)?;
        check_size(DURATION, duration_pos, writer.position(), ebml::float_element_size(DURATION))?;
        writer.seek(end)?;

        debug!(
            duration = self.duration,
            "Duration patched at {}",
            duration_pos
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{IoWriter, StreamWriter};
    use std::io::Cursor;

    #[test]
    fn test_write_requires_app_strings() {
        let mut info = SegmentInfo::new();
        let mut writer = StreamWriter::new(Vec::new());
        assert!(matches!(
            info.write(&mut writer),
            Err(MuxError::MissingMetadata("MuxingApp"))
        ));

        info.set_muxing_app("mux");
        assert!(matches!(
            info.write(&mut writer),
            Err(MuxError::MissingMetadata("WritingApp"))
        ));
        assert_eq!(writer.position(), 0);
    }

    #[test]
    fn test_duration_omitted_when_unset() {
        let mut info = SegmentInfo::new();
        info.init("app");
        let mut writer = StreamWriter::new(Vec::new());
        info.write(&mut writer).unwrap();

        assert!(info.duration_position().is_none());
        assert!(info.duration().is_none());
        let bytes = writer.into_inner();
        assert!(!bytes.windows(2).any(|w| w == [0x44, 0x89]));
    }

    #[test]
    fn test_duration_patch() {
        let mut info = SegmentInfo::new();
        info.init("app");
        info.set_duration(1.0);

        let mut writer = IoWriter::new(Cursor::new(Vec::new())).unwrap();
        info.write(&mut writer).unwrap();
        let end = writer.position();
        let pos = info.duration_position().unwrap() as usize;

        info.set_duration(2500.0);
        info.finalize(&mut writer).unwrap();
        assert_eq!(writer.position(), end);

        let bytes = writer.into_inner().into_inner();
        assert_eq!(&bytes[pos..pos + 3], &[0x44, 0x89, 0x84]);
        let value =
            f32::from_be_bytes([bytes[pos + 3], bytes[pos + 4], bytes[pos + 5], bytes[pos + 6]]);
        assert_eq!(value, 2500.0);
    }

    #[test]
    fn test_finalize_without_reservation_is_noop() {
        let info = SegmentInfo::new();
        let mut writer = StreamWriter::new(Vec::new());
        assert!(info.finalize(&mut writer).is_ok());
    }
}
