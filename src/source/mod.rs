// Byte sources: a parse surface with seek/end cursors, refilled on demand.

mod callback;
mod read;
mod slice;

pub use callback::{CallbackSource, ReadOutcome};
pub use read::ReadSource;
pub use slice::SliceSource;

use std::io;

/// Outcome of one [`ByteSource::fill_more`] or [`ByteSource::probe`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The source is still live. `fill_more` may have added zero bytes.
    More,
    /// The underlying stream is exhausted.
    Eof,
}

/// A mutable parse surface with two cursors, consumed by the field iterator.
///
/// The live region is `buf()[seek()..end()]`, with
/// `seek() <= end() <= buf().len()`. `fill_more` is the only operation that
/// may move bytes (compacting the live region to the front of the buffer to
/// regain tail room); `toss` only advances `seek`. Field slices handed out
/// by the iterator point into `buf()`, which is why a compacting refill
/// invalidates them.
pub trait ByteSource {
    /// The whole parse surface, not just the live region.
    fn buf(&self) -> &[u8];

    /// Mutable access to the parse surface (in-place unescape writes here).
    fn buf_mut(&mut self) -> &mut [u8];

    /// Offset of the first unconsumed byte.
    fn seek(&self) -> usize;

    /// Offset one past the last buffered byte.
    fn end(&self) -> usize;

    /// Consume `n` buffered bytes.
    fn toss(&mut self, n: usize);

    /// Make tail room (compacting if needed) and read into `buf()[end()..]`,
    /// advancing `end()`. May advance zero bytes and still report
    /// [`Fill::More`]; reports [`Fill::Eof`] once the stream is exhausted.
    fn fill_more(&mut self) -> io::Result<Fill>;

    /// Read and discard at most one byte to learn whether the stream has
    /// ended. Only called once the buffer is full and the current field
    /// cannot complete, so the possible loss of one byte happens on an
    /// already-fatal path.
    fn probe(&mut self) -> io::Result<Fill>;

    /// The live buffered region, `buf()[seek()..end()]`.
    fn buffered(&self) -> &[u8] {
        &self.buf()[self.seek()..self.end()]
    }

    /// Capacity not occupied by the live region.
    fn free(&self) -> usize {
        self.buf().len() - (self.end() - self.seek())
    }
}
