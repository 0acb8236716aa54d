// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
//! Common fixture builders and comparison helpers for integration tests.
//!
//! Output row order of the operator is unspecified across classes, so tests
//! sort by a passenger index column or a primitive key before comparing.
#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Int32Array, ListArray, RecordBatch, StringArray,
    UInt32Array,
};
use arrow::compute::{SortColumn, lexsort_to_indices, take};
use arrow::datatypes::{Field, Int32Type, Schema};

use rowrocks::Table;

/// Build a table from named columns; every field is nullable.
pub fn table_of(columns: Vec<(&str, ArrayRef)>) -> Table {
    let fields = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect::<Vec<_>>();
    let arrays = columns.into_iter().map(|(_, array)| array).collect();
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).expect("record batch");
    Table::new(batch)
}

pub fn int32(values: Vec<Option<i32>>) -> ArrayRef {
    Arc::new(Int32Array::from(values))
}

pub fn int32_values(values: Vec<i32>) -> ArrayRef {
    Arc::new(Int32Array::from(values))
}

pub fn float32_values(values: Vec<f32>) -> ArrayRef {
    Arc::new(Float32Array::from(values))
}

pub fn float64(values: Vec<Option<f64>>) -> ArrayRef {
    Arc::new(Float64Array::from(values))
}

pub fn float64_values(values: Vec<f64>) -> ArrayRef {
    Arc::new(Float64Array::from(values))
}

pub fn strings(values: Vec<Option<&str>>) -> ArrayRef {
    Arc::new(StringArray::from(values))
}

pub fn list_int32(values: Vec<Option<Vec<Option<i32>>>>) -> ArrayRef {
    Arc::new(ListArray::from_iter_primitive::<Int32Type, _, _>(values))
}

/// Reorder all columns of `table` by the given row map, the same gather the
/// reference tests use to express expected outputs.
pub fn gather_table(table: &Table, map: &[u32]) -> Table {
    let indices = UInt32Array::from(map.to_vec());
    let columns = table
        .columns()
        .iter()
        .map(|col| take(col.as_ref(), &indices, None).expect("take"))
        .collect::<Vec<_>>();
    Table::try_new(table.schema(), columns, map.len()).expect("gathered table")
}

/// Sort rows by the listed (primitive or string) columns, ascending with
/// nulls first.
pub fn sort_by_columns(table: &Table, columns: &[usize]) -> Table {
    let sort_columns = columns
        .iter()
        .map(|&idx| SortColumn {
            values: table.columns()[idx].clone(),
            options: None,
        })
        .collect::<Vec<_>>();
    let indices = lexsort_to_indices(&sort_columns, None).expect("lexsort");
    let map = indices.values().iter().copied().collect::<Vec<_>>();
    gather_table(table, &map)
}

pub fn assert_tables_equal(actual: &Table, expected: &Table) {
    assert_eq!(
        actual.batch(),
        expected.batch(),
        "actual table does not match expected table"
    );
}
