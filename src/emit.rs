// Write-side counterpart: quoting decisions, separators, row terminators.

use std::io::{self, Write};

use memchr::memchr;

use crate::core::scanner::has_special;
use crate::dialect::Dialect;

/// Row terminator written between rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n",
            LineEnding::CrLf => b"\r\n",
        }
    }
}

/// CSV emitter over any [`io::Write`] sink.
///
/// Line endings are written *before* each row's first field (except the
/// very first row), so the output carries no trailing line ending.
///
/// ```
/// use zerocsv::Emitter;
///
/// let mut em = Emitter::new(Vec::new());
/// em.emit(b"a").unwrap();
/// em.emit(b"b,c").unwrap();
/// em.next_row();
/// em.emit(b"d").unwrap();
/// assert_eq!(em.into_inner(), b"a,\"b,c\"\nd");
/// ```
#[derive(Debug)]
pub struct Emitter<W> {
    out: W,
    dialect: Dialect,
    ending: LineEnding,
    first_column: bool,
    first_row: bool,
}

impl<W: Write> Emitter<W> {
    /// Emitter with the RFC 4180 default dialect and `\n` endings.
    pub fn new(out: W) -> Self {
        Self::with_dialect(out, Dialect::default())
    }

    pub fn with_dialect(out: W, dialect: Dialect) -> Self {
        Emitter {
            out,
            dialect,
            ending: LineEnding::Lf,
            first_column: true,
            first_row: true,
        }
    }

    /// Select the row terminator.
    pub fn line_ending(mut self, ending: LineEnding) -> Self {
        self.ending = ending;
        self
    }

    /// Emit one column, quoting it iff it contains the quote, the
    /// delimiter, or a newline. The safe default.
    pub fn emit(&mut self, column: &[u8]) -> io::Result<()> {
        if has_special(
            column,
            self.dialect.quote,
            self.dialect.delimiter,
            self.dialect.vector_length,
        ) {
            self.emit_quoted(column)
        } else {
            self.emit_unquoted(column)
        }
    }

    /// Emit one column quoted, doubling every interior quote.
    pub fn emit_quoted(&mut self, column: &[u8]) -> io::Result<()> {
        self.emit_delim()?;
        let quote = [self.dialect.quote];
        self.out.write_all(&quote)?;
        let mut rest = column;
        while let Some(k) = memchr(self.dialect.quote, rest) {
            self.out.write_all(&rest[..=k])?;
            self.out.write_all(&quote)?;
            rest = &rest[k + 1..];
        }
        self.out.write_all(rest)?;
        self.out.write_all(&quote)
    }

    /// Emit one column quoted, writing its bytes verbatim. The caller has
    /// already doubled any interior quotes.
    pub fn emit_quoted_assume_escaped(&mut self, column: &[u8]) -> io::Result<()> {
        self.emit_delim()?;
        let quote = [self.dialect.quote];
        self.out.write_all(&quote)?;
        self.out.write_all(column)?;
        self.out.write_all(&quote)
    }

    /// Emit one column verbatim. The caller guarantees it contains no
    /// quote, delimiter, or newline byte.
    pub fn emit_unquoted(&mut self, column: &[u8]) -> io::Result<()> {
        self.emit_delim()?;
        self.out.write_all(column)
    }

    /// Close the current row; the next emitted column starts a new one.
    pub fn next_row(&mut self) {
        self.first_column = true;
    }

    /// Consume the emitter and hand back the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Before a row's first column, write the pending row terminator (none
    /// ahead of the very first row); before any other column, write the
    /// delimiter.
    fn emit_delim(&mut self) -> io::Result<()> {
        if self.first_column {
            self.first_column = false;
            if self.first_row {
                self.first_row = false;
            } else {
                self.out.write_all(self.ending.as_bytes())?;
            }
        } else {
            self.out.write_all(&[self.dialect.delimiter])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit_rows(rows: &[&[&[u8]]], ending: LineEnding) -> Vec<u8> {
        let mut out = Vec::new();
        let mut em = Emitter::new(&mut out).line_ending(ending);
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                em.next_row();
            }
            for col in *row {
                em.emit(col).unwrap();
            }
        }
        drop(em);
        out
    }

    #[test]
    fn quoting_and_no_trailing_ending() {
        let rows: &[&[&[u8]]] = &[
            &[b"header one", b"header \"two\""],
            &[b"value, one", b"value two"],
        ];
        assert_eq!(
            emit_rows(rows, LineEnding::Lf),
            b"header one,\"header \"\"two\"\"\"\n\"value, one\",value two"
        );
    }

    #[test]
    fn crlf_endings() {
        let rows: &[&[&[u8]]] = &[&[b"a", b"b"], &[b"c"]];
        assert_eq!(emit_rows(rows, LineEnding::CrLf), b"a,b\r\nc");
    }

    #[test]
    fn embedded_newline_forces_quoting() {
        let rows: &[&[&[u8]]] = &[&[b"x\ny", b"z"]];
        assert_eq!(emit_rows(rows, LineEnding::Lf), b"\"x\ny\",z");
    }

    #[test]
    fn empty_column_stays_unquoted() {
        let rows: &[&[&[u8]]] = &[&[b"", b"a", b""]];
        assert_eq!(emit_rows(rows, LineEnding::Lf), b",a,");
    }

    #[test]
    fn assume_escaped_writes_verbatim() {
        let mut out = Vec::new();
        let mut em = Emitter::new(&mut out);
        em.emit_quoted_assume_escaped(b"pre\"\"doubled").unwrap();
        drop(em);
        assert_eq!(out, b"\"pre\"\"doubled\"");
    }

    #[test]
    fn custom_dialect_bytes() {
        let mut out = Vec::new();
        let dialect = Dialect::new().delimiter(b';').quote(b'\'');
        let mut em = Emitter::with_dialect(&mut out, dialect);
        em.emit(b"a;b").unwrap();
        em.emit(b"c").unwrap();
        drop(em);
        assert_eq!(out, b"'a;b';c");
    }

    #[test]
    fn next_row_after_last_row_is_inert() {
        let mut out = Vec::new();
        let mut em = Emitter::new(&mut out);
        em.emit(b"a").unwrap();
        em.next_row();
        drop(em);
        assert_eq!(out, b"a");
    }
}
