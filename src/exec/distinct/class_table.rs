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
use arrow::array::ArrayRef;
use hashbrown::raw::RawTable;

use super::row_eq::RowComparator;

#[derive(Clone, Copy, Debug)]
struct ClassEntry {
    class_id: usize,
    hash: u64,
}

/// Aggregate state of one equivalence class. `anchor` is the row that opened
/// the class and the row every later candidate is compared against; `first`
/// and `last` are the extreme member indices; `size` the member count.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ClassState {
    pub(crate) anchor: usize,
    pub(crate) first: usize,
    pub(crate) last: usize,
    pub(crate) size: usize,
}

/// The partition of `[0, num_rows)` into equivalence classes.
#[derive(Debug)]
pub(crate) struct RowClasses {
    #[allow(dead_code)]
    pub(crate) assignments: Vec<usize>,
    pub(crate) classes: Vec<ClassState>,
}

impl RowClasses {
    pub(crate) fn num_classes(&self) -> usize {
        self.classes.len()
    }
}

/// Hash-then-verify class builder. Rows land in candidate buckets by hash;
/// bucket membership is resolved with the exact comparator, which splits
/// hash collisions into true classes. Under `NullEquality::Unequal` a
/// null-bearing row equals nothing, not even a bitwise-identical row, so
/// every such row opens its own class.
pub(crate) struct ClassTable<'a> {
    comparator: &'a RowComparator,
    keys: &'a [ArrayRef],
    table: RawTable<ClassEntry>,
    classes: Vec<ClassState>,
}

impl<'a> ClassTable<'a> {
    pub(crate) fn new(comparator: &'a RowComparator, keys: &'a [ArrayRef]) -> Self {
        Self {
            comparator,
            keys,
            table: RawTable::new(),
            classes: Vec::new(),
        }
    }

    /// Assign every row to a class in one ordered pass. The per-class stats
    /// are min/max/count, so the resulting partition does not depend on the
    /// visit order.
    pub(crate) fn build(mut self, hashes: &[u64]) -> Result<RowClasses, String> {
        let mut assignments = Vec::with_capacity(hashes.len());
        for (row, hash) in hashes.iter().enumerate() {
            assignments.push(self.find_or_insert(row, *hash)?);
        }
        Ok(RowClasses {
            assignments,
            classes: self.classes,
        })
    }

    fn find_or_insert(&mut self, row: usize, hash: u64) -> Result<usize, String> {
        let mut error = None;
        let result = {
            let classes = &self.classes;
            let comparator = self.comparator;
            let keys = self.keys;
            let table = &mut self.table;
            table.find_or_find_insert_slot(
                hash,
                |entry| match classes.get(entry.class_id) {
                    Some(class) => match comparator.rows_equal(keys, class.anchor, row) {
                        Ok(equal) => equal,
                        Err(err) => {
                            error = Some(err);
                            false
                        }
                    },
                    None => {
                        error = Some("class id out of bounds".to_string());
                        false
                    }
                },
                |entry| entry.hash,
            )
        };
        if let Some(err) = error {
            return Err(err);
        }

        match result {
            Ok(bucket) => {
                let class_id = unsafe { bucket.as_ref().class_id };
                let class = self
                    .classes
                    .get_mut(class_id)
                    .ok_or_else(|| "class id out of bounds".to_string())?;
                class.first = class.first.min(row);
                class.last = class.last.max(row);
                class.size += 1;
                Ok(class_id)
            }
            Err(slot) => {
                let class_id = self.classes.len();
                self.classes.push(ClassState {
                    anchor: row,
                    first: row,
                    last: row,
                    size: 1,
                });
                let entry = ClassEntry { class_id, hash };
                unsafe {
                    self.table.insert_in_slot(hash, slot, entry);
                }
                Ok(class_id)
            }
        }
    }
}
