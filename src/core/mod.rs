// Leaf primitives: candidate scanning and in-place unescape.

pub mod scanner;
pub mod unescape;

pub use scanner::{has_special, DelimScanner};
pub use unescape::unescape_in_place;
