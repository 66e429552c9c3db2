//! zerocsv: a streaming, zero-copy CSV field iterator and emitter.
//!
//! The iterator pulls bytes from a buffered [`ByteSource`] and yields one
//! *field* at a time as a borrowed view into the source's own buffer: no
//! per-field allocation, strict RFC 4180 validation, and an optional
//! word-at-a-time scanner that indexes candidate delimiters a chunk at a
//! time. Rows are delimited by [`Field::last_column`]; there is no record
//! abstraction.
//!
//! # Quick start
//!
//! ```
//! use zerocsv::FieldIter;
//!
//! let mut data = b"a,\"b\"\"c\",d\n".to_vec();
//! let mut fields = FieldIter::from_slice(&mut data);
//! let mut row = Vec::new();
//! loop {
//!     match fields.next_field() {
//!         Ok(mut field) => {
//!             row.push(field.unescaped().to_vec());
//!             if field.last_column() {
//!                 break;
//!             }
//!         }
//!         Err(e) => panic!("{e}"),
//!     }
//! }
//! assert_eq!(row, [b"a".to_vec(), b"b\"c".to_vec(), b"d".to_vec()]);
//! ```
//!
//! Streaming sources ([`FieldIter::from_path`], [`FieldIter::from_reader`],
//! [`FieldIter::from_fn`]) parse through a
//! caller-supplied buffer that must hold the longest field plus one
//! terminator byte; a field that cannot fit is
//! [`ParseError::FieldTooLong`]. The in-memory source
//! ([`FieldIter::from_slice`]) parses the caller's slice directly and never
//! truncates.
//!
//! The write side is [`Emitter`]: per-column quoting decisions, doubled
//! interior quotes, and line endings placed so the output carries no
//! trailing terminator.
//!
//! C entry points live in [`ffi`]; the crate also builds as a `cdylib`.

// No unwrap/expect in production code; fallible paths return Result.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod core;
mod dialect;
mod emit;
mod error;
pub mod ffi;
mod iter;
pub mod source;

pub use crate::core::unescape_in_place;
pub use dialect::{Dialect, DEFAULT_VECTOR_LENGTH};
pub use emit::{Emitter, LineEnding};
pub use error::ParseError;
pub use iter::{Field, FieldIter};
pub use source::{ByteSource, CallbackSource, Fill, ReadOutcome, ReadSource, SliceSource};
