// Iterator/emitter configuration: quote byte, delimiter byte, scan width.

/// Default chunk width for the word-at-a-time scanner, in bytes.
pub const DEFAULT_VECTOR_LENGTH: usize = 16;

/// Byte-level CSV dialect, fixed for the life of an iterator or emitter.
///
/// The scanner's set of interesting bytes is exactly
/// `{quote, delimiter, b'\n'}`; carriage return is handled positionally and
/// never joins the set. `vector_length` selects the chunk width of the
/// word-at-a-time scanner; `None` means scalar scanning only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub(crate) quote: u8,
    pub(crate) delimiter: u8,
    pub(crate) vector_length: Option<usize>,
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect {
            quote: b'"',
            delimiter: b',',
            vector_length: Some(DEFAULT_VECTOR_LENGTH),
        }
    }
}

impl Dialect {
    /// RFC 4180 defaults: `"` quote, `,` delimiter, 16-byte chunked scan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the quote byte.
    ///
    /// # Panics
    ///
    /// Panics if `byte` equals the delimiter or `b'\n'`.
    pub fn quote(mut self, byte: u8) -> Self {
        assert!(
            byte != self.delimiter && byte != b'\n',
            "quote byte must differ from delimiter and newline"
        );
        self.quote = byte;
        self
    }

    /// Set the delimiter byte.
    ///
    /// # Panics
    ///
    /// Panics if `byte` equals the quote or `b'\n'`.
    pub fn delimiter(mut self, byte: u8) -> Self {
        assert!(
            byte != self.quote && byte != b'\n',
            "delimiter byte must differ from quote and newline"
        );
        self.delimiter = byte;
        self
    }

    /// Set the scanner chunk width in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `len` is not one of 8, 16, 32, 64.
    pub fn vector_length(mut self, len: usize) -> Self {
        assert!(
            len.is_power_of_two() && (8..=64).contains(&len),
            "vector length must be 8, 16, 32 or 64"
        );
        self.vector_length = Some(len);
        self
    }

    /// Disable chunked scanning; every scan is a straight scalar pass.
    pub fn scalar(mut self) -> Self {
        self.vector_length = None;
        self
    }

    /// The configured quote byte.
    pub fn quote_byte(&self) -> u8 {
        self.quote
    }

    /// The configured delimiter byte.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let d = Dialect::new();
        assert_eq!(d.quote, b'"');
        assert_eq!(d.delimiter, b',');
        assert_eq!(d.vector_length, Some(16));
    }

    #[test]
    fn builder_chain() {
        let d = Dialect::new().delimiter(b';').quote(b'\'').vector_length(32);
        assert_eq!(d.delimiter, b';');
        assert_eq!(d.quote, b'\'');
        assert_eq!(d.vector_length, Some(32));
        assert_eq!(Dialect::new().scalar().vector_length, None);
    }

    #[test]
    #[should_panic(expected = "delimiter byte must differ")]
    fn delimiter_equal_to_quote_rejected() {
        let _ = Dialect::new().delimiter(b'"');
    }

    #[test]
    #[should_panic(expected = "vector length")]
    fn bad_vector_length_rejected() {
        let _ = Dialect::new().vector_length(12);
    }
}
