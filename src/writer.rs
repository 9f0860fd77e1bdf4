// Symmetric CSV writer (§6.4): a small, single-threaded external
// collaborator mainly in service of the round-trip testable property.

use std::io::{self, Write};

use crate::column::Column;

/// Output byte-class for `out_encoding`, mirroring the writer's own
/// narrower class set (the full `Utf8/Latin1/Utf16*/Utf32*` re-encoder in
/// the copied tree is over-scoped for this writer's needs, see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputClass {
    Utf8,
    Ascii,
    PrintableAscii,
    Arbitrary,
}

#[derive(Debug, Clone, Copy)]
pub struct WriterOptions {
    pub dos_line_endings: bool,
    pub output_class: OutputClass,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            dos_line_endings: false,
            output_class: OutputClass::Utf8,
        }
    }
}

/// One column's name plus its row values already rendered as display
/// bytes (the caller is responsible for stringifying numeric/categorical
/// storage; the writer only handles quoting/escaping/line endings).
pub struct WriterColumn<'a> {
    pub name: &'a str,
    pub values: &'a [Vec<u8>],
}

/// Write `columns` as a header row followed by one row per value, to `out`.
pub fn write_csv<W: Write>(
    out: &mut W,
    columns: &[WriterColumn],
    options: &WriterOptions,
) -> io::Result<()> {
    let terminator: &[u8] = if options.dos_line_endings { b"\r\n" } else { b"\n" };
    let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);

    write_row(out, columns.iter().map(|c| c.name.as_bytes()), terminator, options)?;
    for row in 0..row_count {
        write_row(
            out,
            columns.iter().map(|c| c.values[row].as_slice()),
            terminator,
            options,
        )?;
    }
    Ok(())
}

fn write_row<'a, W: Write, I: Iterator<Item = &'a [u8]>>(
    out: &mut W,
    fields: I,
    terminator: &[u8],
    options: &WriterOptions,
) -> io::Result<()> {
    let mut first = true;
    for field in fields {
        if !first {
            out.write_all(b",")?;
        }
        first = false;
        write_field(out, field, options)?;
    }
    out.write_all(terminator)
}

fn needs_quoting(field: &[u8]) -> bool {
    field
        .iter()
        .any(|&b| b == b',' || b == b'"' || b == b'\n' || b == b'\r')
}

fn write_field<W: Write>(out: &mut W, field: &[u8], options: &WriterOptions) -> io::Result<()> {
    let escaped = escape_for_output_class(field, options.output_class);
    if needs_quoting(&escaped) {
        out.write_all(b"\"")?;
        for &b in &escaped {
            if b == b'"' {
                out.write_all(b"\"\"")?;
            } else {
                out.write_all(&[b])?;
            }
        }
        out.write_all(b"\"")
    } else {
        out.write_all(&escaped)
    }
}

/// Backslash-escape bytes outside the chosen output class. `Arbitrary`
/// passes bytes through unchanged.
fn escape_for_output_class(field: &[u8], class: OutputClass) -> Vec<u8> {
    match class {
        OutputClass::Arbitrary => field.to_vec(),
        OutputClass::Utf8 => {
            if std::str::from_utf8(field).is_ok() {
                field.to_vec()
            } else {
                backslash_escape(field, |_| false)
            }
        }
        OutputClass::Ascii => backslash_escape(field, |b| b >= 0x80),
        OutputClass::PrintableAscii => {
            backslash_escape(field, |b| b < 0x20 || b >= 0x7f)
        }
    }
}

fn backslash_escape(field: &[u8], out_of_class: impl Fn(u8) -> bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(field.len());
    for &b in field {
        if out_of_class(b) {
            out.extend_from_slice(format!("\\x{:02x}", b).as_bytes());
        } else {
            out.push(b);
        }
    }
    out
}

/// Render a finalized `Column`'s row `i` as display bytes, for callers
/// building `WriterColumn::values` from a `Loader`'s output. Categorical
/// rows are rendered via their dictionary; numeric rows via `to_string`.
pub fn render_cell(column: &Column, i: usize) -> Vec<u8> {
    match column {
        Column::Unknown => Vec::new(),
        Column::UInt8(v) => v[i].to_string().into_bytes(),
        Column::Int8(v) => v[i].to_string().into_bytes(),
        Column::UInt16(v) => v[i].to_string().into_bytes(),
        Column::Int16(v) => v[i].to_string().into_bytes(),
        Column::UInt32(v) => v[i].to_string().into_bytes(),
        Column::Int32(v) => v[i].to_string().into_bytes(),
        Column::UInt64(v) => v[i].to_string().into_bytes(),
        Column::Int64(v) => v[i].to_string().into_bytes(),
        Column::Float64(v) => v[i].to_string().into_bytes(),
        Column::Categorical { codes, dictionary } => dictionary.get(codes[i]).to_vec(),
        Column::Text(v) => v[i].clone(),
    }
}
