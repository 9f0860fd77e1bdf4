// Fatal error taxonomy (table in spec's error-handling section).
//
// Non-fatal anomalies (FieldCountAnomaly, EncodingAnomaly,
// ForcedTypeParseFailure, CategoricalOverflow) never appear here; they are
// recorded as per-column counters, see `AnomalyCounts`.

use std::path::PathBuf;

use thiserror::Error;

/// A fatal error raised by `Loader::load` or a baseline tool.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported input protocol: {uri}")]
    UnsupportedProtocol { uri: String },

    #[error(
        "worker {worker} could not resolve a safe record start near byte {byte_offset} \
         within the configured reinforcement window"
    )]
    BoundaryResolutionFailed { worker: usize, byte_offset: u64 },

    #[error(
        "frame assembly found mismatched column lengths: {details}"
    )]
    RowCountMismatch { details: String },
}

impl LoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Per-column counters for the non-fatal anomaly kinds in the error table.
///
/// `field_count` covers rows whose field count disagreed with the header;
/// it is recorded against the row, but surfaced per column here as "how
/// many rows in this column's worker fragments were affected" so the whole
/// struct stays column-indexed like the rest of the transfer API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnomalyCounts {
    pub field_count_anomaly: u64,
    pub encoding_anomaly: u64,
    pub forced_type_parse_failure: u64,
    pub categorical_overflow: u64,
}

impl AnomalyCounts {
    pub fn merge(&mut self, other: &AnomalyCounts) {
        self.field_count_anomaly += other.field_count_anomaly;
        self.encoding_anomaly += other.encoding_anomaly;
        self.forced_type_parse_failure += other.forced_type_parse_failure;
        self.categorical_overflow += other.categorical_overflow;
    }

    pub fn is_empty(&self) -> bool {
        *self == AnomalyCounts::default()
    }
}
