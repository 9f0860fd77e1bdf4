// Recognized configuration options, mirrored from paratext's
// `_get_params`/`internal_create_csv_loader` defaults.

use std::collections::HashMap;

/// A column's final semantics, as pinnable ahead of load via
/// `LoadParams::force_semantics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantics {
    Numeric,
    Categorical,
    Text,
}

/// Input/output byte encoding mode (`utf-8` validates and replaces invalid
/// sequences with U+FFFD on output; `unknown` passes bytes through as-is).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Unknown,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Utf8
    }
}

/// Builder for `Loader::load`'s parameters.
#[derive(Debug, Clone)]
pub struct LoadParams {
    pub(crate) num_threads: usize,
    pub(crate) block_size: usize,
    pub(crate) allow_quoted_newlines: bool,
    pub(crate) max_boundary_scan_blocks: usize,
    pub(crate) no_header: bool,
    pub(crate) number_only: bool,
    pub(crate) max_levels: usize,
    pub(crate) max_level_name_length: usize,
    pub(crate) in_encoding: Encoding,
    pub(crate) out_encoding: Encoding,
    pub(crate) convert_null_to_space: bool,
    pub(crate) forced_semantics: HashMap<String, Semantics>,
}

impl Default for LoadParams {
    fn default() -> Self {
        LoadParams {
            num_threads: 0,
            block_size: 32 * 1024,
            allow_quoted_newlines: false,
            max_boundary_scan_blocks: 64,
            no_header: false,
            number_only: false,
            max_levels: 100_000,
            max_level_name_length: 10_000,
            in_encoding: Encoding::Utf8,
            out_encoding: Encoding::Utf8,
            convert_null_to_space: false,
            forced_semantics: HashMap::new(),
        }
    }
}

impl LoadParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// `0` means auto: `max(available_parallelism, 4)`.
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = n;
        self
    }

    pub fn block_size(mut self, bytes: usize) -> Self {
        self.block_size = bytes.max(1);
        self
    }

    pub fn allow_quoted_newlines(mut self, allow: bool) -> Self {
        self.allow_quoted_newlines = allow;
        self
    }

    /// Bound on the quoted-newline recovery walk's reinforcement window,
    /// expressed in `block_size` blocks. Exhausting it without committing
    /// to a safe record start raises `LoadError::BoundaryResolutionFailed`.
    pub fn max_boundary_scan_blocks(mut self, blocks: usize) -> Self {
        self.max_boundary_scan_blocks = blocks.max(1);
        self
    }

    pub fn no_header(mut self, no_header: bool) -> Self {
        self.no_header = no_header;
        self
    }

    pub fn number_only(mut self, number_only: bool) -> Self {
        self.number_only = number_only;
        self
    }

    pub fn max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    pub fn max_level_name_length(mut self, max_len: usize) -> Self {
        self.max_level_name_length = max_len;
        self
    }

    pub fn in_encoding(mut self, encoding: Encoding) -> Self {
        self.in_encoding = encoding;
        self
    }

    pub fn out_encoding(mut self, encoding: Encoding) -> Self {
        self.out_encoding = encoding;
        self
    }

    pub fn convert_null_to_space(mut self, convert: bool) -> Self {
        self.convert_null_to_space = convert;
        self
    }

    /// Pin a column (by header name) to a fixed semantics, skipping
    /// inference for that column. Has effect only before `load()`.
    pub fn force_semantics(mut self, name: impl Into<String>, kind: Semantics) -> Self {
        self.forced_semantics.insert(name.into(), kind);
        self
    }

    pub(crate) fn resolved_threads(&self) -> usize {
        if self.num_threads > 0 {
            self.num_threads
        } else {
            std::thread::available_parallelism()
                .map(|p| p.get().max(4))
                .unwrap_or(4)
        }
    }
}
