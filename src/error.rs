use std::io;
use thiserror::Error;

/// Errors surfaced by [`FieldIter::next_field`](crate::FieldIter::next_field).
///
/// `EndOfInput` is the normal termination signal, not a failure. The other
/// three are fatal for the iterator that produced them: behaviour of further
/// `next_field` calls is unspecified and callers should drop the iterator.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The source is exhausted and no field remains.
    #[error("end of input")]
    EndOfInput,

    /// A single field does not fit in the caller-supplied buffer. Recovery
    /// requires a larger buffer and a fresh iterator.
    #[error("field exceeds buffer capacity")]
    FieldTooLong,

    /// Malformed quoting: a bare quote in an unquoted field, an illegal byte
    /// after a closing quote, or an unterminated quoted field.
    #[error("malformed quoted field")]
    InvalidQuotes,

    /// The byte source reported an I/O failure. Surfaced verbatim, no retry.
    #[error("read failed: {0}")]
    ReadFailed(#[from] io::Error),
}
