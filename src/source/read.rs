// Source backed by any io::Read, buffering into a caller-owned slice.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use super::{ByteSource, Fill};

/// Byte source pulling from an [`io::Read`] into a caller-supplied buffer.
///
/// The buffer must be large enough to hold the longest field plus one
/// terminator byte. Pass an owned reader to adopt it (it is dropped with the
/// source), or `&mut R` to borrow one the caller keeps open.
#[derive(Debug)]
pub struct ReadSource<'b, R> {
    reader: R,
    buf: &'b mut [u8],
    seek: usize,
    end: usize,
}

impl<'b> ReadSource<'b, File> {
    /// Open `path` for reading and adopt the file; it is closed on drop.
    pub fn open<P: AsRef<Path>>(path: P, buf: &'b mut [u8]) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?, buf))
    }
}

impl<'b, R: Read> ReadSource<'b, R> {
    pub fn new(reader: R, buf: &'b mut [u8]) -> Self {
        ReadSource {
            reader,
            buf,
            seek: 0,
            end: 0,
        }
    }
}

impl<R: Read> ByteSource for ReadSource<'_, R> {
    fn buf(&self) -> &[u8] {
        self.buf
    }

    fn buf_mut(&mut self) -> &mut [u8] {
        self.buf
    }

    fn seek(&self) -> usize {
        self.seek
    }

    fn end(&self) -> usize {
        self.end
    }

    fn toss(&mut self, n: usize) {
        debug_assert!(self.seek + n <= self.end);
        self.seek += n;
    }

    fn fill_more(&mut self) -> io::Result<Fill> {
        if self.seek > 0 {
            self.buf.copy_within(self.seek..self.end, 0);
            self.end -= self.seek;
            self.seek = 0;
        }
        if self.end == self.buf.len() {
            return Ok(Fill::More);
        }
        let n = self.reader.read(&mut self.buf[self.end..])?;
        if n == 0 {
            Ok(Fill::Eof)
        } else {
            self.end += n;
            Ok(Fill::More)
        }
    }

    fn probe(&mut self) -> io::Result<Fill> {
        let mut sink = [0u8; 1];
        if self.reader.read(&mut sink)? == 0 {
            Ok(Fill::Eof)
        } else {
            Ok(Fill::More)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn fills_and_reports_eof() {
        let mut buf = [0u8; 8];
        let mut src = ReadSource::new(Cursor::new(b"abcdef".to_vec()), &mut buf);
        assert_eq!(src.fill_more().unwrap(), Fill::More);
        assert_eq!(src.buffered(), b"abcdef");
        assert_eq!(src.fill_more().unwrap(), Fill::Eof);
    }

    #[test]
    fn fill_compacts_consumed_prefix() {
        let mut buf = [0u8; 4];
        let mut src = ReadSource::new(Cursor::new(b"abcdef".to_vec()), &mut buf);
        src.fill_more().unwrap();
        assert_eq!(src.buffered(), b"abcd");
        src.toss(3);
        assert_eq!(src.free(), 3);
        src.fill_more().unwrap();
        assert_eq!(src.seek(), 0);
        assert_eq!(src.buffered(), b"def");
    }

    #[test]
    fn probe_distinguishes_pending_data_from_eof() {
        let mut buf = [0u8; 2];
        let mut src = ReadSource::new(Cursor::new(b"abc".to_vec()), &mut buf);
        src.fill_more().unwrap();
        assert_eq!(src.probe().unwrap(), Fill::More);
        assert_eq!(src.probe().unwrap(), Fill::Eof);
    }
}
