// In-place collapse of doubled quotes inside a quoted field's body.

use memchr::memchr;

/// Collapse every doubled `quote` pair in `data` to a single quote byte,
/// compacting leftward, and return the new length. Never lengthens.
///
/// Defined on arbitrary input: a lone quote, including a trailing odd one,
/// is preserved verbatim. The prefix before the first escape is left
/// untouched, so escape-free input costs one scan and no writes.
pub fn unescape_in_place(data: &mut [u8], quote: u8) -> usize {
    let len = data.len();

    // Find the first doubled pair; until then bytes stay in place.
    let mut r = 0;
    let mut w = loop {
        match memchr(quote, &data[r..len]) {
            None => return len,
            Some(k) => {
                let q = r + k;
                if q + 1 < len && data[q + 1] == quote {
                    break q + 1;
                }
                r = q + 1;
            }
        }
    };
    r = w + 1;

    while r < len {
        match memchr(quote, &data[r..len]) {
            None => {
                data.copy_within(r..len, w);
                w += len - r;
                break;
            }
            Some(k) => {
                let q = r + k;
                data.copy_within(r..=q, w);
                w += q + 1 - r;
                r = if q + 1 < len && data[q + 1] == quote {
                    q + 2
                } else {
                    q + 1
                };
            }
        }
    }
    w
}
