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
use arrow::array::UInt32Array;
use arrow::compute::take;
use rayon::prelude::*;

use super::KeepPolicy;
use super::class_table::ClassState;
use crate::exec::table::Table;

/// Resolve the keep policy to at most one surviving row index per class.
/// Emission follows class discovery order; callers needing a specific global
/// row order must sort.
pub(crate) fn select_rows(classes: &[ClassState], keep: KeepPolicy) -> Vec<u32> {
    let mut indices = Vec::with_capacity(classes.len());
    for class in classes {
        let selected = match keep {
            KeepPolicy::Any => Some(class.anchor),
            KeepPolicy::First => Some(class.first),
            KeepPolicy::Last => Some(class.last),
            KeepPolicy::None => (class.size == 1).then_some(class.first),
        };
        if let Some(row) = selected {
            indices.push(row as u32);
        }
    }
    indices
}

/// Gather full rows (key and passenger columns alike) at the selected
/// indices into a freshly allocated table.
pub(crate) fn gather(table: &Table, indices: &[u32]) -> Result<Table, String> {
    let take_indices = UInt32Array::from(indices.to_vec());
    let columns = table
        .columns()
        .par_iter()
        .map(|col| {
            take(col.as_ref(), &take_indices, None)
                .map_err(|e| format!("Arrow take failed: {e}"))
        })
        .collect::<Result<Vec<_>, String>>()?;
    Table::try_new(table.schema(), columns, indices.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(anchor: usize, first: usize, last: usize, size: usize) -> ClassState {
        ClassState {
            anchor,
            first,
            last,
            size,
        }
    }

    #[test]
    fn keep_policies_pick_expected_rows() {
        let classes = vec![class(0, 0, 5, 3), class(2, 2, 2, 1)];
        assert_eq!(select_rows(&classes, KeepPolicy::Any), vec![0, 2]);
        assert_eq!(select_rows(&classes, KeepPolicy::First), vec![0, 2]);
        assert_eq!(select_rows(&classes, KeepPolicy::Last), vec![5, 2]);
        assert_eq!(select_rows(&classes, KeepPolicy::None), vec![2]);
    }

    #[test]
    fn keep_none_drops_every_multi_member_class() {
        let classes = vec![class(0, 0, 1, 2), class(3, 3, 4, 2)];
        assert!(select_rows(&classes, KeepPolicy::None).is_empty());
    }
}
