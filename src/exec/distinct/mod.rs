//! Row-deduplication (DISTINCT) operator over Arrow tables.
//!
//! Responsibilities:
//! - Partitions rows into equivalence classes over the key columns under
//!   configurable null and NaN equality, using hash-then-verify resolution.
//! - Selects at most one representative per class by keep policy and gathers
//!   full output rows, passengers included.
//!
//! Key exported interfaces:
//! - Types: `DistinctOptions`, `KeepPolicy`, `NullEquality`, `NanEquality`.
//! - Functions: `distinct`, `distinct_indices`, `stable_distinct`,
//!   `distinct_count`.
//!
//! Current limitations:
//! - Key columns are restricted to the primitive/list/struct surface accepted
//!   by `supported_key_type`; anything else is rejected up front.
//! - Output row order across classes is unspecified; only the keep policy
//!   pins the surviving index within a class.

mod class_table;
mod hash;
mod keep;
mod row_eq;
mod row_hash;

use arrow::array::ArrayRef;
use arrow::datatypes::DataType;
use tracing::debug;

use crate::exec::table::Table;
use class_table::{ClassTable, RowClasses};
use row_eq::RowComparator;
use row_hash::RowHasher;

/// Which member of an equivalence class survives deduplication.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeepPolicy {
    /// Any member; the cheapest choice, not reproducible across runs.
    Any,
    /// The lowest original row index.
    First,
    /// The highest original row index.
    Last,
    /// Only members of singleton classes; duplicated rows vanish entirely.
    None,
}

/// Whether two nulls at the same nested position compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NullEquality {
    Equal,
    Unequal,
}

/// Whether two floating NaN payloads compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NanEquality {
    AllEqual,
    Unequal,
}

#[derive(Clone, Copy, Debug)]
pub struct DistinctOptions {
    pub keep: KeepPolicy,
    pub null_equality: NullEquality,
    pub nan_equality: NanEquality,
}

impl Default for DistinctOptions {
    fn default() -> Self {
        Self {
            keep: KeepPolicy::Any,
            null_equality: NullEquality::Equal,
            nan_equality: NanEquality::Unequal,
        }
    }
}

impl DistinctOptions {
    pub fn new(keep: KeepPolicy, null_equality: NullEquality, nan_equality: NanEquality) -> Self {
        Self {
            keep,
            null_equality,
            nan_equality,
        }
    }

    pub fn with_keep(mut self, keep: KeepPolicy) -> Self {
        self.keep = keep;
        self
    }

    pub fn with_null_equality(mut self, null_equality: NullEquality) -> Self {
        self.null_equality = null_equality;
        self
    }

    pub fn with_nan_equality(mut self, nan_equality: NanEquality) -> Self {
        self.nan_equality = nan_equality;
        self
    }
}

/// Deduplicate `table` by the rows' values in `key_columns`.
///
/// Returns a new table holding one surviving row per equivalence class as
/// chosen by the keep policy, with every column (key or passenger) gathered
/// at the surviving indices. Output row order across classes is unspecified.
///
/// Degenerate contracts: a zero-column table is returned unchanged (before
/// key validation); an empty key set yields a zero-row table with the input
/// schema; a zero-row table is returned unchanged.
pub fn distinct(
    table: &Table,
    key_columns: &[usize],
    options: &DistinctOptions,
) -> Result<Table, String> {
    if table.num_columns() == 0 {
        return Ok(table.clone());
    }
    check_row_count(table)?;
    let keys = validate_key_columns(table, key_columns)?;
    if table.is_empty() {
        return Ok(table.clone());
    }
    if keys.is_empty() {
        // Every row is vacuously equal under the empty key tuple; the
        // documented contract for that case is a zero-row output.
        return keep::gather(table, &[]);
    }
    let indices = resolve_indices(table, &keys, options)?;
    keep::gather(table, &indices)
}

/// Like `distinct`, but returns the selected row indices without gathering.
/// Degenerate inputs (zero columns, zero rows, empty key set) select nothing.
pub fn distinct_indices(
    table: &Table,
    key_columns: &[usize],
    options: &DistinctOptions,
) -> Result<Vec<u32>, String> {
    if table.num_columns() == 0 {
        return Ok(Vec::new());
    }
    check_row_count(table)?;
    let keys = validate_key_columns(table, key_columns)?;
    if table.is_empty() || keys.is_empty() {
        return Ok(Vec::new());
    }
    resolve_indices(table, &keys, options)
}

/// Like `distinct`, but survivors keep their relative input order.
pub fn stable_distinct(
    table: &Table,
    key_columns: &[usize],
    options: &DistinctOptions,
) -> Result<Table, String> {
    if table.num_columns() == 0 {
        return Ok(table.clone());
    }
    check_row_count(table)?;
    let keys = validate_key_columns(table, key_columns)?;
    if table.is_empty() {
        return Ok(table.clone());
    }
    if keys.is_empty() {
        return keep::gather(table, &[]);
    }
    let mut indices = resolve_indices(table, &keys, options)?;
    indices.sort_unstable();
    keep::gather(table, &indices)
}

/// Number of equivalence classes in `table` under the given equality policy,
/// i.e. the row count `distinct` would produce for any-keeping policies.
/// Degenerate inputs count zero, mirroring the `distinct` contracts.
pub fn distinct_count(
    table: &Table,
    key_columns: &[usize],
    null_equality: NullEquality,
    nan_equality: NanEquality,
) -> Result<usize, String> {
    if table.num_columns() == 0 {
        return Ok(0);
    }
    check_row_count(table)?;
    let keys = validate_key_columns(table, key_columns)?;
    if table.is_empty() || keys.is_empty() {
        return Ok(0);
    }
    let classes = build_classes(table, &keys, null_equality, nan_equality)?;
    Ok(classes.num_classes())
}

/// The three strictly ordered phases: parallel row hashing, sequential
/// bucket resolution with the exact comparator, then keep-policy selection.
fn resolve_indices(
    table: &Table,
    keys: &[ArrayRef],
    options: &DistinctOptions,
) -> Result<Vec<u32>, String> {
    let classes = build_classes(table, keys, options.null_equality, options.nan_equality)?;
    let selected = keep::select_rows(&classes.classes, options.keep);
    debug!(
        "distinct resolved {} rows into {} classes, {} selected",
        table.len(),
        classes.num_classes(),
        selected.len()
    );
    Ok(selected)
}

fn build_classes(
    table: &Table,
    keys: &[ArrayRef],
    null_equality: NullEquality,
    nan_equality: NanEquality,
) -> Result<RowClasses, String> {
    let hashes = RowHasher::new().hash_rows(keys, table.len())?;
    let comparator = RowComparator::new(null_equality, nan_equality);
    ClassTable::new(&comparator, keys).build(&hashes)
}

fn check_row_count(table: &Table) -> Result<u32, String> {
    u32::try_from(table.len())
        .map_err(|_| format!("table row count {} exceeds u32 index range", table.len()))
}

fn validate_key_columns(table: &Table, key_columns: &[usize]) -> Result<Vec<ArrayRef>, String> {
    let mut keys = Vec::with_capacity(key_columns.len());
    for &idx in key_columns {
        let column = table.column(idx).ok_or_else(|| {
            format!(
                "key column index {idx} out of range: table has {} columns",
                table.num_columns()
            )
        })?;
        if !supported_key_type(column.data_type()) {
            return Err(format!(
                "key column {idx} has unsupported type {:?}",
                column.data_type()
            ));
        }
        keys.push(column.clone());
    }
    Ok(keys)
}

fn supported_key_type(data_type: &DataType) -> bool {
    match data_type {
        DataType::Boolean
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::Float32
        | DataType::Float64
        | DataType::Utf8
        | DataType::Date32
        | DataType::Timestamp(_, _)
        | DataType::Decimal128(_, _) => true,
        DataType::List(field) => supported_key_type(field.data_type()),
        DataType::Struct(fields) => fields
            .iter()
            .all(|field| supported_key_type(field.data_type())),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{Array, Int32Array, RecordBatch};
    use arrow::datatypes::{Field, Schema};

    fn int_table(values: Vec<Option<i32>>) -> Table {
        let schema = Arc::new(Schema::new(vec![Field::new("k", DataType::Int32, true)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Int32Array::from(values))]).expect("batch");
        Table::new(batch)
    }

    #[test]
    fn out_of_range_key_index_fails_fast() {
        let table = int_table(vec![Some(1), Some(2)]);
        let err = distinct(&table, &[3], &DistinctOptions::default()).unwrap_err();
        assert!(err.contains("out of range"), "err={err}");
    }

    #[test]
    fn zero_key_columns_yield_zero_rows() {
        let table = int_table(vec![Some(5), Some(4), Some(3), Some(5), Some(8), Some(1)]);
        for keep in [
            KeepPolicy::Any,
            KeepPolicy::First,
            KeepPolicy::Last,
            KeepPolicy::None,
        ] {
            let options = DistinctOptions::default().with_keep(keep);
            let result = distinct(&table, &[], &options).unwrap();
            assert_eq!(result.len(), 0);
            assert_eq!(result.num_columns(), 1);
        }
    }

    #[test]
    fn zero_column_table_is_identity() {
        let table = Table::try_new(Arc::new(Schema::empty()), Vec::new(), 4).unwrap();
        // Key indices are not validated for the zero-column identity case.
        let result = distinct(&table, &[1, 2], &DistinctOptions::default()).unwrap();
        assert_eq!(result.num_columns(), 0);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn empty_table_is_identity() {
        let table = int_table(vec![]);
        let result = distinct(&table, &[0], &DistinctOptions::default()).unwrap();
        assert_eq!(result.len(), 0);
        assert_eq!(result.schema(), table.schema());
    }

    #[test]
    fn distinct_count_matches_class_count() {
        let table = int_table(vec![Some(1), Some(1), None, None, Some(2)]);
        let count =
            distinct_count(&table, &[0], NullEquality::Equal, NanEquality::Unequal).unwrap();
        assert_eq!(count, 3);
        let count =
            distinct_count(&table, &[0], NullEquality::Unequal, NanEquality::Unequal).unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn stable_distinct_preserves_input_order() {
        let table = int_table(vec![Some(3), Some(1), Some(3), Some(2), Some(1)]);
        let options = DistinctOptions::default().with_keep(KeepPolicy::First);
        let result = stable_distinct(&table, &[0], &options).unwrap();
        let col = result
            .column(0)
            .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
            .expect("int column");
        assert_eq!(col.values(), &[3, 1, 2]);
    }
}
