// Frame assembler (§4.5): aligns worker fragments column-by-column,
// computes each column's final type as the lattice join of its fragments'
// types, upgrades every fragment into that type, unifies categorical
// dictionaries across workers, and concatenates in worker-index order.

use crate::column::{Column, ColumnType};
use crate::dictionary::{self, Dictionary};
use crate::error::LoadError;

/// An assembled, column-oriented frame: the `Loader`'s final in-memory
/// result before columns are handed out through the transfer cursor.
pub struct Frame {
    pub names: Vec<String>,
    pub types: Vec<ColumnType>,
    pub columns: Vec<Column>,
}

/// Assemble `names.len()` columns from `worker_fragments`, one
/// `Vec<(ColumnType, Column)>` per worker, each of length `names.len()` and
/// in worker-index order.
///
/// `max_levels` is re-applied here, after cross-worker dictionary
/// unification: a per-worker fragment can stay under the threshold while
/// the union of all workers' distinct values exceeds it, so the
/// cardinality check in `ColumnBuilder`/`CategoricalAcc` alone isn't
/// enough to keep the result independent of worker count (§3, §8
/// Partition invariance).
pub fn assemble(
    names: Vec<String>,
    worker_fragments: Vec<Vec<(ColumnType, Column)>>,
    max_levels: usize,
) -> Result<Frame, LoadError> {
    let num_columns = names.len();
    let mut types = Vec::with_capacity(num_columns);
    let mut columns = Vec::with_capacity(num_columns);

    for c in 0..num_columns {
        let joined = worker_fragments
            .iter()
            .map(|w| w[c].0)
            .fold(ColumnType::Unknown, ColumnType::max);

        let fragments: Vec<&Column> = worker_fragments.iter().map(|w| &w[c].1).collect();
        let (final_ty, column) = upgrade_and_concat(joined, &fragments, max_levels);
        types.push(final_ty);
        columns.push(column);
    }

    let row_count = columns.first().map(Column::len);
    if let Some(expected) = row_count {
        for (i, col) in columns.iter().enumerate() {
            if col.len() != expected {
                return Err(LoadError::RowCountMismatch {
                    details: format!(
                        "column {} ({}) has {} rows, column 0 has {}",
                        i, names[i], col.len(), expected
                    ),
                });
            }
        }
    }

    Ok(Frame { names, types, columns })
}

fn upgrade_and_concat(
    joined: ColumnType,
    fragments: &[&Column],
    max_levels: usize,
) -> (ColumnType, Column) {
    match joined {
        ColumnType::Unknown => (ColumnType::Unknown, Column::Unknown),
        ColumnType::Float64 => {
            let mut out = Vec::new();
            for f in fragments {
                out.extend(to_f64_vec(f));
            }
            (ColumnType::Float64, Column::Float64(out))
        }
        ColumnType::Categorical => concat_categorical(fragments, max_levels),
        ColumnType::Text => (ColumnType::Text, concat_text(fragments)),
        // Bool never materializes; remaining rungs are the integer ladder.
        ColumnType::Bool => unreachable!("Bool never joins as a final column type"),
        int_ty => (int_ty, concat_int(int_ty, fragments)),
    }
}

fn to_i128_vec(col: &Column) -> Vec<i128> {
    match col {
        Column::Unknown => Vec::new(),
        Column::UInt8(v) => v.iter().map(|&x| x as i128).collect(),
        Column::Int8(v) => v.iter().map(|&x| x as i128).collect(),
        Column::UInt16(v) => v.iter().map(|&x| x as i128).collect(),
        Column::Int16(v) => v.iter().map(|&x| x as i128).collect(),
        Column::UInt32(v) => v.iter().map(|&x| x as i128).collect(),
        Column::Int32(v) => v.iter().map(|&x| x as i128).collect(),
        Column::UInt64(v) => v.iter().map(|&x| x as i128).collect(),
        Column::Int64(v) => v.iter().map(|&x| x as i128).collect(),
        _ => unreachable!("non-integer fragment joined onto an integer column"),
    }
}

fn to_f64_vec(col: &Column) -> Vec<f64> {
    match col {
        Column::Unknown => Vec::new(),
        Column::Float64(v) => v.clone(),
        Column::UInt8(_)
        | Column::Int8(_)
        | Column::UInt16(_)
        | Column::Int16(_)
        | Column::UInt32(_)
        | Column::Int32(_)
        | Column::UInt64(_)
        | Column::Int64(_) => to_i128_vec(col).into_iter().map(|v| v as f64).collect(),
        _ => unreachable!("non-numeric fragment joined onto a Float64 column"),
    }
}

fn concat_int(target: ColumnType, fragments: &[&Column]) -> Column {
    let mut combined = Vec::new();
    for f in fragments {
        combined.extend(to_i128_vec(f));
    }
    match target {
        ColumnType::UInt8 => Column::UInt8(combined.into_iter().map(|v| v as u8).collect()),
        ColumnType::Int8 => Column::Int8(combined.into_iter().map(|v| v as i8).collect()),
        ColumnType::UInt16 => Column::UInt16(combined.into_iter().map(|v| v as u16).collect()),
        ColumnType::Int16 => Column::Int16(combined.into_iter().map(|v| v as i16).collect()),
        ColumnType::UInt32 => Column::UInt32(combined.into_iter().map(|v| v as u32).collect()),
        ColumnType::Int32 => Column::Int32(combined.into_iter().map(|v| v as i32).collect()),
        ColumnType::UInt64 => Column::UInt64(combined.into_iter().map(|v| v as u64).collect()),
        ColumnType::Int64 => Column::Int64(combined.into_iter().map(|v| v as i64).collect()),
        _ => unreachable!("concat_int called with a non-integer target"),
    }
}

/// Re-stringify row `i` of a numeric column using the same canonical
/// format `NumericAcc::canonical_at` used when a worker promotes its own
/// numeric rows into a categorical seed.
fn numeric_row_to_string(col: &Column, i: usize) -> Vec<u8> {
    match col {
        Column::UInt8(v) => v[i].to_string().into_bytes(),
        Column::Int8(v) => v[i].to_string().into_bytes(),
        Column::UInt16(v) => v[i].to_string().into_bytes(),
        Column::Int16(v) => v[i].to_string().into_bytes(),
        Column::UInt32(v) => v[i].to_string().into_bytes(),
        Column::Int32(v) => v[i].to_string().into_bytes(),
        Column::UInt64(v) => v[i].to_string().into_bytes(),
        Column::Int64(v) => v[i].to_string().into_bytes(),
        Column::Float64(v) => v[i].to_string().into_bytes(),
        _ => unreachable!("numeric_row_to_string called on a non-numeric column"),
    }
}

/// Every fragment's codes rewritten against a per-fragment `Dictionary`,
/// ready for cross-worker unification. Numeric/Unknown fragments are
/// stringified into a freshly built local dictionary first.
fn fragment_as_codes_and_dict(col: &Column) -> (Vec<u32>, Dictionary) {
    match col {
        Column::Unknown => (Vec::new(), Dictionary::new()),
        Column::Categorical { codes, dictionary } => (codes.clone(), dictionary.clone()),
        other => {
            let mut dict = Dictionary::new();
            let mut codes = Vec::with_capacity(other.len());
            for i in 0..other.len() {
                let lit = numeric_row_to_string(other, i);
                codes.push(dict.intern(&lit));
            }
            (codes, dict)
        }
    }
}

fn concat_categorical(fragments: &[&Column], max_levels: usize) -> (ColumnType, Column) {
    let mut per_worker_codes = Vec::with_capacity(fragments.len());
    let mut per_worker_dicts = Vec::with_capacity(fragments.len());
    for f in fragments {
        let (codes, dict) = fragment_as_codes_and_dict(f);
        per_worker_codes.push(codes);
        per_worker_dicts.push(dict);
    }

    let (global_dict, maps) = dictionary::unify(&per_worker_dicts);

    let mut out_codes = Vec::new();
    for (codes, map) in per_worker_codes.into_iter().zip(maps.into_iter()) {
        out_codes.extend(codes.into_iter().map(|c| map[c as usize]));
    }

    // `global_dict.len() - 1` excludes the reserved empty-string entry at
    // code 0, matching the per-worker cardinality check in
    // `CategoricalAcc::overflows`.
    if global_dict.len() - 1 > max_levels {
        let text = out_codes
            .into_iter()
            .map(|c| global_dict.get(c).to_vec())
            .collect();
        (ColumnType::Text, Column::Text(text))
    } else {
        (
            ColumnType::Categorical,
            Column::Categorical {
                codes: out_codes,
                dictionary: global_dict,
            },
        )
    }
}

fn concat_text(fragments: &[&Column]) -> Column {
    let mut out = Vec::new();
    for f in fragments {
        match f {
            Column::Unknown => {}
            Column::Text(values) => out.extend(values.iter().cloned()),
            Column::Categorical { codes, dictionary } => {
                out.extend(codes.iter().map(|&c| dictionary.get(c).to_vec()));
            }
            other => {
                for i in 0..other.len() {
                    out.push(numeric_row_to_string(other, i));
                }
            }
        }
    }
    Column::Text(out)
}
