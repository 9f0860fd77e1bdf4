// Chunker: computes `N` worker byte ranges whose disjoint union is the
// whole input and whose starts coincide with record boundaries.

use crate::boundary;
use crate::config::LoadParams;
use crate::error::LoadError;

pub const DELIMITER: u8 = b',';
pub const QUOTE: u8 = b'"';

/// Plan `num_threads` byte ranges over `data`. `expected_fields` is the
/// header's field count, used to reinforce quoted-newline boundary
/// candidates; pass `None` when the header itself hasn't been parsed yet.
pub fn plan(
    data: &[u8],
    num_threads: usize,
    params: &LoadParams,
    expected_fields: Option<usize>,
) -> Result<Vec<(usize, usize)>, LoadError> {
    let s = data.len();
    if s == 0 || num_threads <= 1 {
        return Ok(vec![(0, s)]);
    }

    let mut starts = Vec::with_capacity(num_threads);
    for i in 0..num_threads {
        let raw_start = (i * s) / num_threads;
        let resolved = if params.allow_quoted_newlines {
            boundary::find_quoted_boundary(
                data,
                raw_start,
                QUOTE,
                DELIMITER,
                params.block_size,
                params.max_boundary_scan_blocks,
                expected_fields,
            )
            .map_err(|f| LoadError::BoundaryResolutionFailed {
                worker: i,
                byte_offset: f.byte_offset,
            })?
        } else {
            boundary::find_unquoted_boundary(data, raw_start)
        };
        starts.push(resolved);
    }

    // Workers whose resolved start didn't advance past the previous
    // worker's resolved start yield their range to the left neighbor and
    // will emit zero records (spec's Chunker failure policy).
    starts.dedup();

    let mut ranges = Vec::with_capacity(starts.len());
    for (idx, &st) in starts.iter().enumerate() {
        let end = starts.get(idx + 1).copied().unwrap_or(s);
        if end > st {
            ranges.push((st, end));
        }
    }

    if ranges.is_empty() {
        ranges.push((0, s));
    }

    Ok(ranges)
}
