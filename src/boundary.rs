// Quote-aware scanner: finds the next safe record start in a byte range.
//
// Stable-Rust reimplementation of the teacher's structural scanner
// (`core/simd_scanner.rs`), which is gated behind the nightly-only
// `#![feature(portable_simd)]`. The scalar quote-counting walk here is
// grounded on that file's `scan_scalar_tail` fallback path; the AVX2 code
// paths are not carried forward (see DESIGN.md).

use crate::tokenizer::Tokenizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryFailure {
    pub byte_offset: u64,
}

/// Unquoted-mode resolution: the next byte after the first newline at or
/// after `start`. Returns `data.len()` if no newline is found (the worker
/// yields an empty range).
pub fn find_unquoted_boundary(data: &[u8], start: usize) -> usize {
    if start == 0 {
        return 0;
    }
    let mut i = start;
    while i < data.len() {
        if data[i] == b'\n' {
            return i + 1;
        }
        i += 1;
    }
    data.len()
}

/// Quoted-mode resolution: a bounded recovery walk.
///
/// Reads forward in `block_size`-byte blocks from `start`, tracking a
/// running parity of unescaped quote bytes. Each newline encountered with
/// even quote parity (since `start`) is a *candidate* safe start; it is
/// committed only after a reinforcement pass — parsing one full record
/// from the candidate and confirming its field count matches
/// `expected_fields` (when known). The walk gives up after
/// `max_blocks * block_size` bytes with no committed candidate.
pub fn find_quoted_boundary(
    data: &[u8],
    start: usize,
    quote: u8,
    delimiter: u8,
    block_size: usize,
    max_blocks: usize,
    expected_fields: Option<usize>,
) -> Result<usize, BoundaryFailure> {
    if start == 0 {
        return Ok(0);
    }

    let scan_limit = (start + block_size.max(1) * max_blocks.max(1)).min(data.len());
    let mut quote_parity_even = true;
    let mut i = start;

    while i < scan_limit {
        let b = data[i];
        if b == quote {
            quote_parity_even = !quote_parity_even;
            i += 1;
            continue;
        }
        if b == b'\n' && quote_parity_even {
            let candidate = i + 1;
            if reinforce(data, candidate, quote, delimiter, expected_fields) {
                return Ok(candidate);
            }
        }
        i += 1;
    }

    if scan_limit >= data.len() {
        // Ran off the end of the range without a clean boundary: the
        // remainder belongs to this worker as-is (last worker's tail).
        return Ok(data.len());
    }

    Err(BoundaryFailure {
        byte_offset: start as u64,
    })
}

/// Parse one record starting at `candidate` and check its field count
/// against `expected_fields`, when known. With no header/expectation
/// available, any record that parses without immediately hitting EOF is
/// accepted.
fn reinforce(
    data: &[u8],
    candidate: usize,
    quote: u8,
    delimiter: u8,
    expected_fields: Option<usize>,
) -> bool {
    if candidate >= data.len() {
        return true;
    }
    let mut t = Tokenizer::new(data, candidate, data.len(), delimiter, quote, true);
    match t.next_record() {
        Some(rec) => match expected_fields {
            Some(n) => rec.fields.len() == n,
            None => true,
        },
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquoted_finds_next_newline() {
        let data = b"aaaa\nbbbb\n";
        assert_eq!(find_unquoted_boundary(data, 2), 5);
    }

    #[test]
    fn unquoted_worker_zero_starts_at_zero() {
        assert_eq!(find_unquoted_boundary(b"abc\n", 0), 0);
    }

    #[test]
    fn unquoted_no_newline_yields_end() {
        let data = b"abcdef";
        assert_eq!(find_unquoted_boundary(data, 2), data.len());
    }

    #[test]
    fn quoted_boundary_skips_newline_inside_quotes() {
        // "a,\"b\nc\",d\n1,2,3\n" — the newline at index 5 is inside quotes
        // (odd parity), so it must not be chosen as a boundary; the real
        // record boundary is right after index 9's '\n'... walk should
        // land on the row starting "1,2,3".
        let data = b"a,\"b\nc\",d\n1,2,3\n";
        let start = 5; // inside the quoted newline
        let got = find_quoted_boundary(data, start, b'"', b',', 64, 64, Some(3)).unwrap();
        assert_eq!(&data[got..], b"1,2,3\n");
    }

    #[test]
    fn quoted_boundary_gives_up_past_window() {
        let mut data = Vec::new();
        data.extend_from_slice(b"a,\"");
        data.extend(std::iter::repeat(b'x').take(1000));
        // never closes the quote, never an even-parity newline
        let got = find_quoted_boundary(&data, 4, b'"', b',', 8, 2, Some(2));
        assert!(got.is_err() || got == Ok(data.len()));
    }
}
