// Field iterator: drives the scanner, owns the quoted/unquoted state
// machine, refills the source across read boundaries.

use std::fs::File;
use std::io::{self, Read};
use std::mem;
use std::path::Path;

use crate::core::scanner::DelimScanner;
use crate::core::unescape::unescape_in_place;
use crate::dialect::Dialect;
use crate::error::ParseError;
use crate::source::{ByteSource, CallbackSource, Fill, ReadOutcome, ReadSource, SliceSource};

/// One CSV field, borrowed from the source's buffer.
///
/// The slice stays valid until the next [`FieldIter::next_field`] call on
/// the same iterator. Quoted fields are handed out with their surrounding
/// quotes stripped but doubled-quote escapes still in place; call
/// [`unescaped`](Field::unescaped) to collapse them.
#[derive(Debug)]
pub struct Field<'a> {
    data: &'a mut [u8],
    quote: u8,
    last_column: bool,
    needs_unescape: bool,
}

impl<'a> Field<'a> {
    /// The field bytes as parsed.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.data
    }

    /// Mutable view of the field bytes.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data
    }

    /// True iff this field was terminated by a newline, or by end of stream
    /// after at least one byte; either way it closes its row.
    #[inline]
    pub fn last_column(&self) -> bool {
        self.last_column
    }

    /// True iff the field was quoted and its body contains at least one
    /// doubled-quote escape.
    #[inline]
    pub fn needs_unescape(&self) -> bool {
        self.needs_unescape
    }

    /// The field bytes with doubled-quote escapes collapsed.
    ///
    /// Runs the in-place unescape over the buffer at most once; repeated
    /// calls return the already-unescaped slice. For the in-memory source
    /// this mutates the caller's slice.
    pub fn unescaped(&mut self) -> &[u8] {
        if self.needs_unescape {
            self.needs_unescape = false;
            let data = mem::take(&mut self.data);
            let n = unescape_in_place(data, self.quote);
            self.data = &mut data[..n];
        }
        self.data
    }
}

/// What the quoted sub-machine decided about a closing-quote candidate.
enum QuoteStep {
    /// Doubled-quote escape; resume scanning at the given offset.
    Escape { resume: usize },
    /// The field ends: body is `buf[seek..data_end]`, bytes up to
    /// `consume_to` are consumed.
    Yield {
        data_end: usize,
        consume_to: usize,
        last: bool,
    },
    /// The byte after the quote is not buffered yet; refill and retry.
    Defer,
    /// Illegal byte after a closing quote.
    Invalid,
}

/// Outcome of one refill attempt.
enum Refill {
    /// More bytes may be available; the live region moved `shift` bytes
    /// toward the buffer start.
    Gained { shift: usize },
    Eof,
}

/// Streaming zero-copy CSV field iterator over a [`ByteSource`].
///
/// Yields one field per [`next_field`](Self::next_field) call, in strict
/// input order; [`Field::last_column`] delimits rows. Any deviation from
/// RFC 4180 is a hard error. Not for concurrent use; distinct iterators
/// over distinct buffers are independent.
pub struct FieldIter<S> {
    src: S,
    dialect: Dialect,
    scanner: DelimScanner,
    /// Set while the current quoted field has consumed an escape pair.
    needs_unescape: bool,
    /// A quote candidate at the scan cursor awaits classification, possibly
    /// deferred across a refill because its follower is not buffered.
    quote_pending: bool,
}

impl<S: ByteSource> FieldIter<S> {
    /// Iterator with the RFC 4180 default dialect.
    pub fn new(src: S) -> Self {
        Self::with_dialect(src, Dialect::default())
    }

    pub fn with_dialect(src: S, dialect: Dialect) -> Self {
        let scanner = DelimScanner::new(dialect.quote, dialect.delimiter, dialect.vector_length);
        FieldIter {
            src,
            dialect,
            scanner,
            needs_unescape: false,
            quote_pending: false,
        }
    }

    /// Consume the iterator and hand back its source.
    pub fn into_source(self) -> S {
        self.src
    }

    /// Parse the next field.
    ///
    /// [`ParseError::EndOfInput`] is the normal end of iteration. The other
    /// errors are fatal for this iterator (see [`ParseError`]).
    pub fn next_field(&mut self) -> Result<Field<'_>, ParseError> {
        self.needs_unescape = false;
        self.quote_pending = false;
        let mut quoted = false;
        let mut pos = self.src.seek();

        loop {
            let end = self.src.end();

            if self.quote_pending {
                // `pos` sits on the quote candidate.
                match self.on_quote(pos, end) {
                    QuoteStep::Escape { resume } => {
                        self.quote_pending = false;
                        pos = resume;
                    }
                    QuoteStep::Yield {
                        data_end,
                        consume_to,
                        last,
                    } => {
                        self.quote_pending = false;
                        let start = self.src.seek();
                        let needs = self.needs_unescape;
                        return self.yield_field(start, data_end, consume_to, last, needs);
                    }
                    QuoteStep::Defer => match self.refill()? {
                        Refill::Gained { shift } => pos -= shift,
                        Refill::Eof => return self.finish_quoted_eof(),
                    },
                    QuoteStep::Invalid => return Err(ParseError::InvalidQuotes),
                }
                continue;
            }

            match self.scanner.next_delim_pos(&self.src.buf()[..end], pos) {
                Some(p) if !quoted => {
                    let byte = self.src.buf()[p];
                    if byte == self.dialect.quote {
                        // A quote is only legal as the field's first byte.
                        if p != self.src.seek() {
                            return Err(ParseError::InvalidQuotes);
                        }
                        quoted = true;
                        self.src.toss(1);
                        self.scanner.skip_below(p + 1);
                        pos = p + 1;
                    } else {
                        let start = self.src.seek();
                        let last = byte == b'\n';
                        let mut data_end = p;
                        if last && p > start && self.src.buf()[p - 1] == b'\r' {
                            data_end = p - 1;
                        }
                        self.scanner.skip_below(p + 1);
                        return self.yield_field(start, data_end, p + 1, last, false);
                    }
                }
                Some(p) => {
                    if self.src.buf()[p] == self.dialect.quote {
                        self.quote_pending = true;
                        pos = p;
                    } else {
                        // Embedded delimiter or newline is quoted content.
                        pos = p + 1;
                    }
                }
                None => {
                    // The scanner cleared everything below `end`.
                    pos = end;
                    match self.refill()? {
                        Refill::Gained { shift } => pos -= shift,
                        Refill::Eof => {
                            return if quoted {
                                self.finish_quoted_eof()
                            } else {
                                self.finish_unquoted_eof()
                            };
                        }
                    }
                }
            }
        }
    }

    /// Classify the byte following a quote candidate at `p`.
    fn on_quote(&mut self, p: usize, end: usize) -> QuoteStep {
        if p + 1 >= end {
            return QuoteStep::Defer;
        }
        let follower = self.src.buf()[p + 1];
        if follower == self.dialect.quote {
            self.needs_unescape = true;
            self.scanner.skip_below(p + 2);
            QuoteStep::Escape { resume: p + 2 }
        } else if follower == self.dialect.delimiter {
            self.scanner.skip_below(p + 2);
            QuoteStep::Yield {
                data_end: p,
                consume_to: p + 2,
                last: false,
            }
        } else if follower == b'\n' {
            self.scanner.skip_below(p + 2);
            QuoteStep::Yield {
                data_end: p,
                consume_to: p + 2,
                last: true,
            }
        } else if follower == b'\r' {
            // The field ends here; the byte after the \r is presumed \n.
            if p + 2 >= end {
                QuoteStep::Defer
            } else {
                self.scanner.skip_below(p + 3);
                QuoteStep::Yield {
                    data_end: p,
                    consume_to: p + 3,
                    last: true,
                }
            }
        } else {
            QuoteStep::Invalid
        }
    }

    /// One refill step: read more while there is room, otherwise probe the
    /// stream to tell "ends exactly here" from "field cannot fit".
    fn refill(&mut self) -> Result<Refill, ParseError> {
        if self.src.free() > 0 {
            let before = self.src.seek();
            match self.src.fill_more()? {
                Fill::More => {
                    let shift = before - self.src.seek();
                    self.scanner.rebase(shift);
                    Ok(Refill::Gained { shift })
                }
                Fill::Eof => Ok(Refill::Eof),
            }
        } else {
            match self.src.probe()? {
                Fill::Eof => Ok(Refill::Eof),
                Fill::More => Err(ParseError::FieldTooLong),
            }
        }
    }

    /// End of stream outside quotes: a non-empty remainder is the final
    /// field of the final row; an empty one is the end of iteration.
    fn finish_unquoted_eof(&mut self) -> Result<Field<'_>, ParseError> {
        let start = self.src.seek();
        let end = self.src.end();
        if start == end {
            return Err(ParseError::EndOfInput);
        }
        self.yield_field(start, end, end, true, false)
    }

    /// End of stream inside a quoted field: after stripping one optional
    /// trailing `\r\n` or `\n`, the remainder must end with the closing
    /// quote; anything else is an unterminated field.
    fn finish_quoted_eof(&mut self) -> Result<Field<'_>, ParseError> {
        let start = self.src.seek();
        let end = self.src.end();
        let buf = self.src.buf();
        let mut e = end;
        if e > start && buf[e - 1] == b'\n' {
            e -= 1;
            if e > start && buf[e - 1] == b'\r' {
                e -= 1;
            }
        }
        if e > start && buf[e - 1] == self.dialect.quote {
            let needs = self.needs_unescape;
            self.yield_field(start, e - 1, end, true, needs)
        } else {
            Err(ParseError::InvalidQuotes)
        }
    }

    fn yield_field(
        &mut self,
        start: usize,
        data_end: usize,
        consume_to: usize,
        last_column: bool,
        needs_unescape: bool,
    ) -> Result<Field<'_>, ParseError> {
        let seek = self.src.seek();
        self.src.toss(consume_to - seek);
        let quote = self.dialect.quote;
        let buf = self.src.buf_mut();
        Ok(Field {
            data: &mut buf[start..data_end],
            quote,
            last_column,
            needs_unescape,
        })
    }
}

impl<'b> FieldIter<ReadSource<'b, File>> {
    /// Open `path` and iterate its fields; the file is closed when the
    /// iterator (and its source) is dropped.
    pub fn from_path<P: AsRef<Path>>(path: P, buf: &'b mut [u8]) -> io::Result<Self> {
        Ok(Self::new(ReadSource::open(path, buf)?))
    }
}

impl<'b, R: Read> FieldIter<ReadSource<'b, R>> {
    /// Iterate fields pulled from any reader; pass `&mut handle` to keep
    /// ownership of an already-open file.
    pub fn from_reader(reader: R, buf: &'b mut [u8]) -> Self {
        Self::new(ReadSource::new(reader, buf))
    }
}

impl<'b> FieldIter<SliceSource<'b>> {
    /// Iterate fields of an in-memory buffer. The slice is the parse
    /// surface; [`Field::unescaped`] mutates it.
    pub fn from_slice(data: &'b mut [u8]) -> Self {
        Self::new(SliceSource::new(data))
    }
}

impl<'b, F: FnMut(&mut [u8]) -> ReadOutcome> FieldIter<CallbackSource<'b, F>> {
    /// Iterate fields pulled through a user callback.
    pub fn from_fn(read: F, buf: &'b mut [u8]) -> Self {
        Self::new(CallbackSource::new(read, buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_in_order_with_row_marks() {
        let mut data = b"a,b\nc\n".to_vec();
        let mut it = FieldIter::from_slice(&mut data);
        let f = it.next_field().unwrap();
        assert_eq!((f.data(), f.last_column()), (&b"a"[..], false));
        let f = it.next_field().unwrap();
        assert_eq!((f.data(), f.last_column()), (&b"b"[..], true));
        let f = it.next_field().unwrap();
        assert_eq!((f.data(), f.last_column()), (&b"c"[..], true));
        assert!(matches!(it.next_field(), Err(ParseError::EndOfInput)));
    }

    #[test]
    fn seek_advances_on_every_yield() {
        fn step<S: ByteSource>(it: &mut FieldIter<S>) -> bool {
            match it.next_field() {
                Ok(_) => true,
                Err(ParseError::EndOfInput) => false,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        let mut data = b"aa,bb\ncc".to_vec();
        let mut it = FieldIter::from_slice(&mut data);
        let mut seen = 0;
        loop {
            let before = it.src.seek();
            if !step(&mut it) {
                break;
            }
            seen += 1;
            assert!(it.src.seek() > before);
        }
        assert_eq!(seen, 3);
    }

    #[test]
    fn unescaped_is_lazy_and_idempotent() {
        let mut data = b"\"say \"\"hi\"\"\"\n".to_vec();
        let mut it = FieldIter::from_slice(&mut data);
        let mut f = it.next_field().unwrap();
        assert!(f.needs_unescape());
        assert_eq!(f.data(), b"say \"\"hi\"\"");
        assert_eq!(f.unescaped(), b"say \"hi\"");
        assert!(!f.needs_unescape());
        assert_eq!(f.unescaped(), b"say \"hi\"");
    }

    #[test]
    fn slice_source_is_mutated_by_unescape() {
        let mut data = b"\"a\"\"b\",x\n".to_vec();
        {
            let mut it = FieldIter::from_slice(&mut data);
            let mut f = it.next_field().unwrap();
            assert_eq!(f.unescaped(), b"a\"b");
        }
        // The collapsed bytes live in the caller's buffer.
        assert_eq!(&data[1..4], b"a\"b");
    }

    #[test]
    fn custom_dialect_semicolon_single_quote() {
        let mut data = b"'a;b';c\n".to_vec();
        let dialect = Dialect::new().delimiter(b';').quote(b'\'');
        let mut it = FieldIter::with_dialect(SliceSource::new(&mut data), dialect);
        let f = it.next_field().unwrap();
        assert_eq!((f.data(), f.last_column()), (&b"a;b"[..], false));
        let f = it.next_field().unwrap();
        assert_eq!((f.data(), f.last_column()), (&b"c"[..], true));
    }

    #[test]
    fn presumed_crlf_after_closer_is_skipped_blind() {
        // The byte after `"\r` is consumed without inspection.
        let mut data = b"\"a\"\r\nb\n".to_vec();
        let mut it = FieldIter::from_slice(&mut data);
        let f = it.next_field().unwrap();
        assert_eq!((f.data(), f.last_column()), (&b"a"[..], true));
        let f = it.next_field().unwrap();
        assert_eq!(f.data(), b"b");
    }
}
