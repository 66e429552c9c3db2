// Source pulling bytes from a user-supplied read function.

use std::io;

use super::{ByteSource, Fill};

/// What a [`CallbackSource`] read function produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were written to the front of the destination. Zero is
    /// legal and does not mean end of stream.
    Read(usize),
    /// The stream is exhausted.
    Eof,
    /// The read failed.
    Error,
}

/// Byte source that invokes a callback whenever it needs more data.
///
/// The callback receives the free tail of the caller-supplied buffer and
/// reports how many bytes it wrote. Byte counts larger than the destination
/// are clamped.
pub struct CallbackSource<'b, F> {
    read: F,
    buf: &'b mut [u8],
    seek: usize,
    end: usize,
}

impl<'b, F> CallbackSource<'b, F>
where
    F: FnMut(&mut [u8]) -> ReadOutcome,
{
    pub fn new(read: F, buf: &'b mut [u8]) -> Self {
        CallbackSource {
            read,
            buf,
            seek: 0,
            end: 0,
        }
    }
}

fn callback_failed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "read callback reported failure")
}

impl<F> ByteSource for CallbackSource<'_, F>
where
    F: FnMut(&mut [u8]) -> ReadOutcome,
{
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
        let dst = &mut self.buf[self.end..];
        match (self.read)(dst) {
            ReadOutcome::Read(n) => {
                self.end += n.min(dst.len());
                Ok(Fill::More)
            }
            ReadOutcome::Eof => Ok(Fill::Eof),
            ReadOutcome::Error => Err(callback_failed()),
        }
    }

    fn probe(&mut self) -> io::Result<Fill> {
        let mut sink = [0u8; 1];
        match (self.read)(&mut sink) {
            ReadOutcome::Eof => Ok(Fill::Eof),
            ReadOutcome::Read(_) => Ok(Fill::More),
            ReadOutcome::Error => Err(callback_failed()),
        }
    }
}
