//! Byte source abstraction over a readable, seekable stream.
//!
//! The parser only ever needs to seek forward or backward by at most one
//! message's worth of bytes (the recovery controller's unknown-tag path is
//! the largest backward seek, `msg_size + 2` bytes), so any of these
//! implementations is sufficient; a fully in-memory, zero-copy variant is
//! also provided for callers that already have the whole file in a buffer.

use std::io::{Read, Seek, SeekFrom};

/// Where a [`ByteSource::seek`] offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Measured from the start of the stream.
    Start,
    /// Measured from the current position.
    Current,
    /// Measured from the end of the stream.
    End,
}

/// Abstraction over any readable, seekable stream of bytes.
///
/// A short read (fewer bytes available than requested) is a terminal
/// signal, not an error: callers treat it as end-of-stream and stop
/// parsing cleanly, per spec.
pub trait ByteSource {
    /// Read exactly `n` bytes, or as many as remain if the source is
    /// shorter. Returns the bytes actually read; a `len() < n` result
    /// means the source is exhausted.
    fn read_up_to(&mut self, n: usize) -> std::io::Result<Vec<u8>>;

    /// Current byte offset from the start of the stream.
    fn tell(&self) -> u64;

    /// Seek to an absolute offset from the start of the stream.
    fn seek_to(&mut self, offset: u64) -> std::io::Result<()>;

    /// Seek by a signed delta relative to `whence`.
    fn seek_relative(&mut self, delta: i64, whence: Whence) -> std::io::Result<()>;

    /// Read exactly `n` bytes, returning `None` on a short read (clean EOF).
    fn read_exact_or_eof(&mut self, n: usize) -> std::io::Result<Option<Vec<u8>>> {
        let data = self.read_up_to(n)?;
        if data.len() == n {
            Ok(Some(data))
        } else {
            Ok(None)
        }
    }
}

/// A fully-buffered, zero-copy byte source over an in-memory slice.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    /// Wrap a byte slice for parsing.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Total length of the wrapped slice.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the wrapped slice is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ByteSource for SliceSource<'_> {
    fn read_up_to(&mut self, n: usize) -> std::io::Result<Vec<u8>> {
        let end = (self.pos + n).min(self.data.len());
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice.to_vec())
    }

    fn tell(&self) -> u64 {
        self.pos as u64
    }

    fn seek_to(&mut self, offset: u64) -> std::io::Result<()> {
        self.pos = (offset as usize).min(self.data.len());
        Ok(())
    }

    fn seek_relative(&mut self, delta: i64, whence: Whence) -> std::io::Result<()> {
        let base = match whence {
            Whence::Start => 0i64,
            Whence::Current => self.pos as i64,
            Whence::End => self.data.len() as i64,
        };
        let target = (base + delta).max(0) as usize;
        self.pos = target.min(self.data.len());
        Ok(())
    }
}

/// A byte source backed by any [`std::io::Read`] + [`std::io::Seek`] reader,
/// e.g. [`std::fs::File`] or [`std::io::Cursor`].
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    pos: u64,
}

impl<R: Read + Seek> ReaderSource<R> {
    /// Wrap a reader for parsing.
    pub fn new(reader: R) -> Self {
        Self { reader, pos: 0 }
    }

    /// Consume the source and return the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> ByteSource for ReaderSource<R> {
    fn read_up_to(&mut self, n: usize) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        self.pos += filled as u64;
        Ok(buf)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn seek_to(&mut self, offset: u64) -> std::io::Result<()> {
        self.pos = self.reader.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn seek_relative(&mut self, delta: i64, whence: Whence) -> std::io::Result<()> {
        let from = match whence {
            Whence::Start => SeekFrom::Start(delta.max(0) as u64),
            Whence::Current => SeekFrom::Current(delta),
            Whence::End => SeekFrom::End(delta),
        };
        self.pos = self.reader.seek(from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_source_reads_and_tracks_position() {
        let mut src = SliceSource::new(&[1, 2, 3, 4, 5]);
        assert_eq!(src.read_up_to(2).unwrap(), vec![1, 2]);
        assert_eq!(src.tell(), 2);
        assert_eq!(src.read_up_to(10).unwrap(), vec![3, 4, 5]);
        assert_eq!(src.tell(), 5);
    }

    #[test]
    fn slice_source_short_read_signals_eof() {
        let mut src = SliceSource::new(&[1, 2]);
        assert_eq!(src.read_exact_or_eof(3).unwrap(), None);
    }

    #[test]
    fn slice_source_seek_relative_backward() {
        let mut src = SliceSource::new(&[1, 2, 3, 4, 5]);
        src.seek_to(4).unwrap();
        src.seek_relative(-3, Whence::Current).unwrap();
        assert_eq!(src.tell(), 1);
    }

    #[test]
    fn reader_source_over_cursor_matches_slice_source() {
        let data = vec![10u8, 20, 30, 40];
        let mut reader = ReaderSource::new(std::io::Cursor::new(data.clone()));
        let mut slice = SliceSource::new(&data);
        assert_eq!(
            reader.read_up_to(2).unwrap(),
            slice.read_up_to(2).unwrap()
        );
        reader.seek_to(0).unwrap();
        slice.seek_to(0).unwrap();
        assert_eq!(
            reader.read_up_to(4).unwrap(),
            slice.read_up_to(4).unwrap()
        );
    }
}
