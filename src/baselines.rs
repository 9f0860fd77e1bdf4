// Baseline tools (§6.3): degenerate instantiations of the same chunking
// backbone used by `Loader::load`, each doing less work per chunk so the
// full loader's overhead can be measured against them.

use std::path::Path;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::chunk;
use crate::config::LoadParams;
use crate::error::LoadError;
use crate::source::ByteSource;

const QUOTE: u8 = chunk::QUOTE;
const DELIMITER: u8 = chunk::DELIMITER;

fn pool_and_ranges<'a>(
    data: &'a [u8],
    params: &LoadParams,
) -> Result<(rayon::ThreadPool, Vec<(usize, usize)>), LoadError> {
    let threads = params.resolved_threads();
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| LoadError::Io {
            path: "<thread pool>".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e),
        })?;
    let ranges = chunk::plan(data, threads, params, None)?;
    Ok((pool, ranges))
}

/// Counts `\n` bytes across the whole file, chunked the same way the full
/// loader would be. Does not resolve quoted boundaries at all: this
/// baseline has no notion of a record, only of newline bytes.
pub fn count_newlines(path: &Path, params: &LoadParams) -> Result<u64, LoadError> {
    let source = ByteSource::open(path)?;
    let data = source.bytes();
    let (pool, ranges) = pool_and_ranges(data, params)?;

    let count = pool.install(|| {
        ranges
            .par_iter()
            .map(|&(start, end)| data[start..end].iter().filter(|&&b| b == b'\n').count() as u64)
            .sum()
    });

    Ok(count)
}

/// Reads and discards every byte of every chunk, returning the total byte
/// count read. This is the throughput ceiling the full loader is measured
/// against (§6.3).
pub fn disk_to_mem(path: &Path, params: &LoadParams) -> Result<u64, LoadError> {
    let source = ByteSource::open(path)?;
    let data = source.bytes();
    let (pool, ranges) = pool_and_ranges(data, params)?;

    let total = pool.install(|| {
        ranges
            .par_iter()
            .map(|&(start, end)| {
                let mut sink: u64 = 0;
                for &b in &data[start..end] {
                    sink = sink.wrapping_add(b as u64);
                }
                std::hint::black_box(sink);
                (end - start) as u64
            })
            .sum()
    });

    Ok(total)
}

/// Accumulates per-column running sums of parseable floats, without type
/// inference; non-numeric cells are skipped. Returns the per-column mean.
pub fn average_columns(path: &Path, params: &LoadParams) -> Result<Vec<f64>, LoadError> {
    use crate::tokenizer::Tokenizer;
    use std::borrow::Cow;

    let source = ByteSource::open(path)?;
    let data = source.bytes();

    let mut probe = Tokenizer::new(data, 0, data.len(), DELIMITER, QUOTE, true);
    let first = probe.next_record();
    let (num_columns, header_end) = match &first {
        None => (0, 0),
        Some(rec) if params.no_header => (rec.fields.len(), 0),
        Some(rec) => (rec.fields.len(), probe.pos()),
    };
    if num_columns == 0 {
        return Ok(Vec::new());
    }

    let body = &data[header_end..];
    let (pool, ranges) = pool_and_ranges(body, params)?;

    let partials: Vec<(Vec<f64>, Vec<u64>)> = pool.install(|| {
        ranges
            .par_iter()
            .map(|&(start, end)| {
                let mut sums = vec![0.0f64; num_columns];
                let mut counts = vec![0u64; num_columns];
                let mut t = Tokenizer::new(body, start, end, DELIMITER, QUOTE, params.allow_quoted_newlines);
                while let Some(rec) = t.next_record() {
                    for (c, field) in rec.fields.iter().enumerate().take(num_columns) {
                        let raw: Cow<[u8]> = crate::core::field::extract_field_cow_with_escape(
                            body, field.start, field.end, QUOTE,
                        );
                        if let Ok(text) = std::str::from_utf8(&raw) {
                            if let Ok(v) = text.trim().parse::<f64>() {
                                sums[c] += v;
                                counts[c] += 1;
                            }
                        }
                    }
                }
                (sums, counts)
            })
            .collect()
    });

    let mut sums = vec![0.0f64; num_columns];
    let mut counts = vec![0u64; num_columns];
    for (s, c) in partials {
        for i in 0..num_columns {
            sums[i] += s[i];
            counts[i] += c[i];
        }
    }

    Ok(sums
        .iter()
        .zip(counts.iter())
        .map(|(&s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect())
}
