//! Byte sinks the muxer writes into.
//!
//! The muxer only needs to append bytes, know where it is, and (when the
//! sink allows it) jump back to patch a size field. [`IoWriter`] covers
//! files and in-memory cursors; [`StreamWriter`] is append-only and is the
//! natural sink for [`Mode::Live`](crate::Mode::Live).

use crate::error::{MuxError, Result};

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Destination for muxed bytes.
pub trait MkvWriter {
    /// Append `buf` at the current position.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Current byte offset from the start of the output.
    fn position(&self) -> u64;

    /// Move the write position to `position`.
    ///
    /// Non-seekable sinks return [`MuxError::NotSeekable`].
    fn seek(&mut self, position: u64) -> Result<()>;

    /// Whether [`seek`](MkvWriter::seek) is supported.
    fn seekable(&self) -> bool;

    /// Flush any buffered bytes to the underlying device.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: MkvWriter + ?Sized> MkvWriter for &mut T {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write(buf)
    }

    fn position(&self) -> u64 {
        (**self).position()
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        (**self).seek(position)
    }

    fn seekable(&self) -> bool {
        (**self).seekable()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Seekable sink over any `Write + Seek`.
///
/// The position is tracked locally so reading it never touches the device.
pub struct IoWriter<W: Write + Seek> {
    inner: W,
    position: u64,
}

impl<W: Write + Seek> IoWriter<W> {
    /// Wrap `inner`, starting at its current stream position.
    pub fn new(mut inner: W) -> Result<Self> {
        let position = inner.stream_position()?;
        Ok(Self { inner, position })
    }

    /// Get a reference to the wrapped writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl IoWriter<BufWriter<File>> {
    /// Create (or truncate) a file at `path` and write into it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write + Seek> MkvWriter for IoWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        self.position = self.inner.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    fn seekable(&self) -> bool {
        true
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Append-only sink over any `Write`, e.g. a socket or a pipe.
pub struct StreamWriter<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> StreamWriter<W> {
    /// Wrap `inner`; offsets are counted from zero.
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    /// Get a reference to the wrapped writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> MkvWriter for StreamWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn seek(&mut self, _position: u64) -> Result<()> {
        Err(MuxError::NotSeekable)
    }

    fn seekable(&self) -> bool {
        false
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}
