// Loader API & worker pool (§5, §6.1): plans chunks, spawns a dedicated
// rayon thread pool, runs the tokenizer + column accumulators per worker,
// and assembles the result into a `Frame` the host pulls columns from.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error, info_span, warn};

use crate::chunk;
use crate::column::{Column, ColumnBuilder, ColumnType};
use crate::config::{Encoding, LoadParams, Semantics};
use crate::core::field::extract_field_cow_with_escape;
use crate::error::{AnomalyCounts, LoadError};
use crate::frame::{self, Frame};
use crate::source::ByteSource;
use crate::tokenizer::{FieldSpan, Tokenizer};
use crate::transfer::ColumnCursor;

const QUOTE: u8 = chunk::QUOTE;
const DELIMITER: u8 = chunk::DELIMITER;

fn semantics_of(ty: ColumnType) -> Semantics {
    match ty {
        ColumnType::Categorical => Semantics::Categorical,
        ColumnType::Text => Semantics::Text,
        _ => Semantics::Numeric,
    }
}

/// A loaded file: a column-oriented frame plus per-column anomaly
/// counters and a dedicated thread pool kept alive for the duration of
/// the load (dropped once `load()` returns).
pub struct Loader {
    frame: Frame,
    semantics: Vec<Semantics>,
    levels_cache: Vec<Vec<String>>,
    anomalies: Vec<AnomalyCounts>,
}

impl Loader {
    pub fn load(path: &Path, params: &LoadParams) -> Result<Self, LoadError> {
        let threads = params.resolved_threads();
        let span = info_span!("load", path = %path.display(), threads);
        let _guard = span.enter();

        let source = ByteSource::open(path)?;
        let data = source.bytes();

        let (names, header_end) = parse_header(data, params)?;
        let body = &data[header_end..];

        let pool = build_pool(threads)?;
        let ranges = chunk::plan(body, threads, params, Some(names.len()))?;

        let abort = Arc::new(AtomicBool::new(false));
        let worker_results: Vec<Result<WorkerOutput, LoadError>> = pool.install(|| {
            use rayon::prelude::*;
            ranges
                .par_iter()
                .enumerate()
                .map(|(worker, &(start, end))| {
                    run_worker(worker, body, start, end, &names, params, &abort)
                })
                .collect()
        });

        let mut worker_fragments = Vec::with_capacity(worker_results.len());
        let mut per_worker_anomalies = Vec::with_capacity(worker_results.len());
        for result in worker_results {
            match result {
                Ok(output) => {
                    worker_fragments.push(output.columns);
                    per_worker_anomalies.push(output.anomalies);
                }
                Err(e) => {
                    error!(error = %e, "worker failed, aborting load");
                    abort.store(true, Ordering::Relaxed);
                    return Err(e);
                }
            }
        }

        let frame = frame::assemble(names, worker_fragments, params.max_levels)?;

        let semantics = frame.types.iter().map(|&t| semantics_of(t)).collect();
        let levels_cache = frame
            .columns
            .iter()
            .map(|c| match c {
                Column::Categorical { dictionary, .. } => dictionary
                    .levels()
                    .iter()
                    .map(|lvl| String::from_utf8_lossy(lvl).into_owned())
                    .collect(),
                _ => Vec::new(),
            })
            .collect();

        let num_columns = frame.names.len();
        let mut anomalies = vec![AnomalyCounts::default(); num_columns];
        for worker_anomalies in per_worker_anomalies {
            for (i, a) in worker_anomalies.into_iter().enumerate() {
                anomalies[i].merge(&a);
            }
        }
        for a in &anomalies {
            if a.field_count_anomaly > 0 {
                warn!(count = a.field_count_anomaly, "field count anomalies recorded");
            }
            if a.encoding_anomaly > 0 {
                warn!(count = a.encoding_anomaly, "encoding anomalies recorded");
            }
            if a.forced_type_parse_failure > 0 {
                warn!(
                    count = a.forced_type_parse_failure,
                    "forced-type parse failures recorded"
                );
            }
            if a.categorical_overflow > 0 {
                warn!(
                    count = a.categorical_overflow,
                    "categorical overflow recorded"
                );
            }
        }

        Ok(Loader {
            frame,
            semantics,
            levels_cache,
            anomalies,
        })
    }

    pub fn num_columns(&self) -> usize {
        self.frame.names.len()
    }

    pub fn column_info(&self, i: usize) -> (&str, Semantics) {
        (&self.frame.names[i], self.semantics[i])
    }

    /// Takes this column's storage out of the frame, leaving `Unknown`
    /// behind so its memory is reclaimable independent of the rest of the
    /// frame (the `forget` behaviour, applied one column at a time).
    pub fn column(&mut self, i: usize) -> Column {
        std::mem::replace(&mut self.frame.columns[i], Column::Unknown)
    }

    pub fn levels(&self, i: usize) -> &[String] {
        &self.levels_cache[i]
    }

    pub fn forget_column(&mut self, i: usize) {
        self.frame.columns[i] = Column::Unknown;
    }

    pub fn anomaly_counts(&self) -> &[AnomalyCounts] {
        &self.anomalies
    }

    /// Hands the whole frame to a `ColumnCursor`, leaving this `Loader`
    /// with empty (`Unknown`) columns behind.
    pub fn take_columns(&mut self, forget: bool, expand: bool) -> ColumnCursor {
        let n = self.frame.names.len();
        let empty = Frame {
            names: self.frame.names.clone(),
            types: vec![ColumnType::Unknown; n],
            columns: (0..n).map(|_| Column::Unknown).collect(),
        };
        let frame = std::mem::replace(&mut self.frame, empty);
        ColumnCursor::new(frame, forget, expand)
    }
}

fn build_pool(threads: usize) -> Result<ThreadPool, LoadError> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| LoadError::Io {
            path: "<thread pool>".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e),
        })
}

/// Parse the first record of `data` to establish the column name list.
/// Returns the names and the byte offset the data body starts at (past
/// the header row, or `0` in headerless mode).
fn parse_header(data: &[u8], params: &LoadParams) -> Result<(Vec<String>, usize), LoadError> {
    let mut probe = Tokenizer::new(data, 0, data.len(), DELIMITER, QUOTE, true);
    let first = probe.next_record();

    match first {
        None => Ok((Vec::new(), 0)),
        Some(rec) => {
            if params.no_header {
                let names = (0..rec.fields.len()).map(|i| format!("col{}", i)).collect();
                Ok((names, 0))
            } else {
                let names = rec
                    .fields
                    .iter()
                    .map(|f| {
                        let bytes = extract_field_cow_with_escape(data, f.start, f.end, QUOTE);
                        String::from_utf8_lossy(&bytes).into_owned()
                    })
                    .collect();
                Ok((names, probe.pos()))
            }
        }
    }
}

struct WorkerOutput {
    columns: Vec<(ColumnType, Column)>,
    anomalies: Vec<AnomalyCounts>,
}

fn run_worker(
    worker: usize,
    body: &[u8],
    start: usize,
    end: usize,
    names: &[String],
    params: &LoadParams,
    abort: &Arc<AtomicBool>,
) -> Result<WorkerOutput, LoadError> {
    let num_columns = names.len();
    let mut builders: Vec<ColumnBuilder> = names
        .iter()
        .map(|name| match params.forced_semantics.get(name) {
            Some(Semantics::Numeric) => ColumnBuilder::forced_numeric(),
            Some(Semantics::Categorical) => {
                ColumnBuilder::forced_categorical(params.max_levels, params.max_level_name_length)
            }
            Some(Semantics::Text) => ColumnBuilder::forced_text(),
            None => ColumnBuilder::new(params.max_levels, params.max_level_name_length, params.number_only),
        })
        .collect();

    let mut anomalies = vec![AnomalyCounts::default(); num_columns];

    let mut tokenizer = Tokenizer::new(body, start, end, DELIMITER, QUOTE, params.allow_quoted_newlines);
    while let Some(record) = tokenizer.next_record() {
        if abort.load(Ordering::Relaxed) {
            break;
        }

        if record.quoted_newline_anomaly || record.trailing_garbage_anomaly {
            debug!(worker, "anomalous record terminator recorded");
        }

        let field_count_ok = record.fields.len() == num_columns;
        if !field_count_ok {
            for a in anomalies.iter_mut() {
                a.field_count_anomaly += 1;
            }
        }

        for col in 0..num_columns {
            let raw = field_bytes(body, record.fields.get(col), params, &mut anomalies[col]);
            builders[col].append(&raw);
            if abort.load(Ordering::Relaxed) {
                break;
            }
        }
    }

    if abort.load(Ordering::Relaxed) {
        return Err(LoadError::BoundaryResolutionFailed {
            worker,
            byte_offset: start as u64,
        });
    }

    let mut columns = Vec::with_capacity(num_columns);
    for (i, builder) in builders.into_iter().enumerate() {
        anomalies[i].forced_type_parse_failure += builder.forced_parse_failure_count;
        anomalies[i].categorical_overflow += builder.categorical_overflow_count;
        columns.push(builder.finalize());
    }

    Ok(WorkerOutput { columns, anomalies })
}

/// Extract one field's sanitized bytes: quote/escape stripped, optional
/// UTF-8 validation with replacement, optional NUL-to-space conversion.
fn field_bytes(
    body: &[u8],
    span: Option<&FieldSpan>,
    params: &LoadParams,
    anomaly: &mut AnomalyCounts,
) -> Vec<u8> {
    let mut bytes = match span {
        Some(f) => extract_field_cow_with_escape(body, f.start, f.end, QUOTE).into_owned(),
        None => Vec::new(),
    };

    if params.in_encoding == Encoding::Utf8 {
        match std::str::from_utf8(&bytes) {
            Ok(_) => {}
            Err(_) => {
                anomaly.encoding_anomaly += 1;
                bytes = String::from_utf8_lossy(&bytes).into_owned().into_bytes();
            }
        }
    }

    if params.convert_null_to_space {
        for b in bytes.iter_mut() {
            if *b == 0 {
                *b = b' ';
            }
        }
    }

    bytes
}
