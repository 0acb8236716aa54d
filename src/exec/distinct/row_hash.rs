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
use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Decimal128Array, Float32Array, Float64Array,
    Int8Array, Int16Array, Int32Array, Int64Array, ListArray, StringArray, StructArray,
    TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use hashbrown::hash_map::DefaultHashBuilder;
use rayon::prelude::*;

use super::hash::{
    canonical_f32_bits, canonical_f64_bits, combine_hash, hash_bytes_with_seed,
    hash_i128_with_seed, hash_null_with_seed, hash_u64_with_seed, seed_from_hasher,
};

/// Per-row hash over the key columns, consistent with `RowComparator`:
/// rows the comparator deems equal hash identically under every null/NaN
/// policy. The hash itself is policy-free (nulls always contribute the fixed
/// sentinel, NaNs always canonicalize), so buckets merely over-approximate
/// classes and the comparator splits them.
pub(crate) struct RowHasher {
    seed: u64,
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, type_name: &str) -> Result<&'a T, String> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| format!("failed to downcast to {type_name} while hashing rows"))
}

impl RowHasher {
    pub(crate) fn new() -> Self {
        Self {
            seed: seed_from_hasher(&DefaultHashBuilder::default()),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// Hash every row of the key columns. Rows are independent, so this is
    /// the data-parallel phase of the operator.
    pub(crate) fn hash_rows(
        &self,
        keys: &[ArrayRef],
        num_rows: usize,
    ) -> Result<Vec<u64>, String> {
        (0..num_rows)
            .into_par_iter()
            .map(|row| {
                let mut acc = self.seed;
                for array in keys {
                    acc = combine_hash(acc, self.hash_value(array, row)?);
                }
                Ok(acc)
            })
            .collect()
    }

    fn hash_value(&self, array: &ArrayRef, row: usize) -> Result<u64, String> {
        if array.is_null(row) {
            return Ok(hash_null_with_seed(self.seed));
        }
        let seed = self.seed;
        match array.data_type() {
            DataType::Boolean => {
                let arr = downcast::<BooleanArray>(array, "BooleanArray")?;
                Ok(hash_u64_with_seed(seed, arr.value(row) as u64))
            }
            DataType::Int8 => {
                let arr = downcast::<Int8Array>(array, "Int8Array")?;
                Ok(hash_u64_with_seed(seed, arr.value(row) as i64 as u64))
            }
            DataType::Int16 => {
                let arr = downcast::<Int16Array>(array, "Int16Array")?;
                Ok(hash_u64_with_seed(seed, arr.value(row) as i64 as u64))
            }
            DataType::Int32 => {
                let arr = downcast::<Int32Array>(array, "Int32Array")?;
                Ok(hash_u64_with_seed(seed, arr.value(row) as i64 as u64))
            }
            DataType::Int64 => {
                let arr = downcast::<Int64Array>(array, "Int64Array")?;
                Ok(hash_u64_with_seed(seed, arr.value(row) as u64))
            }
            DataType::Float32 => {
                let arr = downcast::<Float32Array>(array, "Float32Array")?;
                Ok(hash_u64_with_seed(
                    seed,
                    canonical_f32_bits(arr.value(row)) as u64,
                ))
            }
            DataType::Float64 => {
                let arr = downcast::<Float64Array>(array, "Float64Array")?;
                Ok(hash_u64_with_seed(seed, canonical_f64_bits(arr.value(row))))
            }
            DataType::Utf8 => {
                let arr = downcast::<StringArray>(array, "StringArray")?;
                Ok(hash_bytes_with_seed(seed, arr.value(row).as_bytes()))
            }
            DataType::Date32 => {
                let arr = downcast::<Date32Array>(array, "Date32Array")?;
                Ok(hash_u64_with_seed(seed, arr.value(row) as i64 as u64))
            }
            DataType::Timestamp(unit, _tz) => {
                let value = match unit {
                    TimeUnit::Second => {
                        downcast::<TimestampSecondArray>(array, "TimestampSecondArray")?.value(row)
                    }
                    TimeUnit::Millisecond => {
                        downcast::<TimestampMillisecondArray>(array, "TimestampMillisecondArray")?
                            .value(row)
                    }
                    TimeUnit::Microsecond => {
                        downcast::<TimestampMicrosecondArray>(array, "TimestampMicrosecondArray")?
                            .value(row)
                    }
                    TimeUnit::Nanosecond => {
                        downcast::<TimestampNanosecondArray>(array, "TimestampNanosecondArray")?
                            .value(row)
                    }
                };
                Ok(hash_u64_with_seed(seed, value as u64))
            }
            DataType::Decimal128(_, _) => {
                let arr = downcast::<Decimal128Array>(array, "Decimal128Array")?;
                Ok(hash_i128_with_seed(seed, arr.value(row)))
            }
            DataType::List(_) => {
                let list = downcast::<ListArray>(array, "ListArray")?;
                let offsets = list.value_offsets();
                let (start, end) = (offsets[row] as usize, offsets[row + 1] as usize);
                let values = list.values();
                if end < start || end > values.len() {
                    return Err(format!("malformed list offsets while hashing row {row}"));
                }
                let mut hash = hash_u64_with_seed(seed, (end - start) as u64);
                for idx in start..end {
                    hash = combine_hash(hash, self.hash_value(values, idx)?);
                }
                Ok(hash)
            }
            DataType::Struct(_) => {
                let arr = downcast::<StructArray>(array, "StructArray")?;
                let mut hash = hash_u64_with_seed(seed, arr.num_columns() as u64);
                for child in arr.columns() {
                    hash = combine_hash(hash, self.hash_value(child, row)?);
                }
                Ok(hash)
            }
            other => Err(format!("row hashing unsupported key type: {other:?}")),
        }
    }
}
