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

use super::{NanEquality, NullEquality};

/// Exact row equality across key columns under the active null/NaN policy.
///
/// The comparator is the authority for class membership: hashing only
/// proposes candidate buckets, this decides them. Validity is checked before
/// any value read at every nesting level, so payloads masked by an ancestor
/// null are never dereferenced.
pub(crate) struct RowComparator {
    null_equality: NullEquality,
    nan_equality: NanEquality,
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, type_name: &str) -> Result<&'a T, String> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| format!("failed to downcast to {type_name} while comparing rows"))
}

impl RowComparator {
    pub(crate) fn new(null_equality: NullEquality, nan_equality: NanEquality) -> Self {
        Self {
            null_equality,
            nan_equality,
        }
    }

    /// Logical AND of per-column equality; short-circuits on the first
    /// mismatching key column.
    pub(crate) fn rows_equal(
        &self,
        keys: &[ArrayRef],
        left: usize,
        right: usize,
    ) -> Result<bool, String> {
        for array in keys {
            if !self.values_equal(array, left, right)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn values_equal(&self, array: &ArrayRef, left: usize, right: usize) -> Result<bool, String> {
        let left_valid = array.is_valid(left);
        let right_valid = array.is_valid(right);
        if left_valid != right_valid {
            return Ok(false);
        }
        if !left_valid {
            return Ok(self.null_equality == NullEquality::Equal);
        }
        self.non_null_values_equal(array, left, right)
    }

    fn non_null_values_equal(
        &self,
        array: &ArrayRef,
        left: usize,
        right: usize,
    ) -> Result<bool, String> {
        match array.data_type() {
            DataType::Boolean => {
                let arr = downcast::<BooleanArray>(array, "BooleanArray")?;
                Ok(arr.value(left) == arr.value(right))
            }
            DataType::Int8 => {
                let arr = downcast::<Int8Array>(array, "Int8Array")?;
                Ok(arr.value(left) == arr.value(right))
            }
            DataType::Int16 => {
                let arr = downcast::<Int16Array>(array, "Int16Array")?;
                Ok(arr.value(left) == arr.value(right))
            }
            DataType::Int32 => {
                let arr = downcast::<Int32Array>(array, "Int32Array")?;
                Ok(arr.value(left) == arr.value(right))
            }
            DataType::Int64 => {
                let arr = downcast::<Int64Array>(array, "Int64Array")?;
                Ok(arr.value(left) == arr.value(right))
            }
            DataType::Float32 => {
                let arr = downcast::<Float32Array>(array, "Float32Array")?;
                Ok(self.float_equal(arr.value(left) as f64, arr.value(right) as f64))
            }
            DataType::Float64 => {
                let arr = downcast::<Float64Array>(array, "Float64Array")?;
                Ok(self.float_equal(arr.value(left), arr.value(right)))
            }
            DataType::Utf8 => {
                let arr = downcast::<StringArray>(array, "StringArray")?;
                Ok(arr.value(left) == arr.value(right))
            }
            DataType::Date32 => {
                let arr = downcast::<Date32Array>(array, "Date32Array")?;
                Ok(arr.value(left) == arr.value(right))
            }
            DataType::Timestamp(unit, _tz) => {
                let (l, r) = match unit {
                    TimeUnit::Second => {
                        let arr = downcast::<TimestampSecondArray>(array, "TimestampSecondArray")?;
                        (arr.value(left), arr.value(right))
                    }
                    TimeUnit::Millisecond => {
                        let arr = downcast::<TimestampMillisecondArray>(
                            array,
                            "TimestampMillisecondArray",
                        )?;
                        (arr.value(left), arr.value(right))
                    }
                    TimeUnit::Microsecond => {
                        let arr = downcast::<TimestampMicrosecondArray>(
                            array,
                            "TimestampMicrosecondArray",
                        )?;
                        (arr.value(left), arr.value(right))
                    }
                    TimeUnit::Nanosecond => {
                        let arr = downcast::<TimestampNanosecondArray>(
                            array,
                            "TimestampNanosecondArray",
                        )?;
                        (arr.value(left), arr.value(right))
                    }
                };
                Ok(l == r)
            }
            DataType::Decimal128(_, _) => {
                let arr = downcast::<Decimal128Array>(array, "Decimal128Array")?;
                Ok(arr.value(left) == arr.value(right))
            }
            DataType::List(_) => {
                let list = downcast::<ListArray>(array, "ListArray")?;
                let offsets = list.value_offsets();
                let (left_start, left_end) = (offsets[left] as usize, offsets[left + 1] as usize);
                let (right_start, right_end) =
                    (offsets[right] as usize, offsets[right + 1] as usize);
                let values = list.values();
                if left_end < left_start
                    || right_end < right_start
                    || left_end > values.len()
                    || right_end > values.len()
                {
                    return Err(format!(
                        "malformed list offsets while comparing rows {left} and {right}"
                    ));
                }
                if left_end - left_start != right_end - right_start {
                    return Ok(false);
                }
                for (l, r) in (left_start..left_end).zip(right_start..right_end) {
                    if !self.values_equal(values, l, r)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            DataType::Struct(_) => {
                let arr = downcast::<StructArray>(array, "StructArray")?;
                for child in arr.columns() {
                    if !self.values_equal(child, left, right)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            other => Err(format!("row equality unsupported key type: {other:?}")),
        }
    }

    fn float_equal(&self, left: f64, right: f64) -> bool {
        if left.is_nan() || right.is_nan() {
            return left.is_nan() && right.is_nan() && self.nan_equality == NanEquality::AllEqual;
        }
        left == right
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int32Array, ListArray};
    use arrow::buffer::NullBuffer;
    use arrow::datatypes::{Field, Fields};

    fn comparator(null_equality: NullEquality, nan_equality: NanEquality) -> RowComparator {
        RowComparator::new(null_equality, nan_equality)
    }

    fn int_keys(values: Vec<Option<i32>>) -> Vec<ArrayRef> {
        vec![Arc::new(Int32Array::from(values)) as ArrayRef]
    }

    #[test]
    fn primitive_equality_is_symmetric_and_reflexive() {
        let keys = int_keys(vec![Some(1), Some(1), Some(2)]);
        let cmp = comparator(NullEquality::Equal, NanEquality::Unequal);
        assert!(cmp.rows_equal(&keys, 0, 0).unwrap());
        assert!(cmp.rows_equal(&keys, 0, 1).unwrap());
        assert!(cmp.rows_equal(&keys, 1, 0).unwrap());
        assert!(!cmp.rows_equal(&keys, 0, 2).unwrap());
    }

    #[test]
    fn null_policy_controls_null_pairs() {
        let keys = int_keys(vec![None, None, Some(3)]);
        let equal = comparator(NullEquality::Equal, NanEquality::Unequal);
        assert!(equal.rows_equal(&keys, 0, 1).unwrap());
        assert!(!equal.rows_equal(&keys, 0, 2).unwrap());

        let unequal = comparator(NullEquality::Unequal, NanEquality::Unequal);
        assert!(!unequal.rows_equal(&keys, 0, 1).unwrap());
        // A null row does not even equal itself under the unequal policy.
        assert!(!unequal.rows_equal(&keys, 0, 0).unwrap());
    }

    #[test]
    fn nan_policy_controls_nan_pairs() {
        let payload = f64::from_bits(0x7ff8_0000_0000_1234);
        let keys: Vec<ArrayRef> = vec![Arc::new(Float64Array::from(vec![
            f64::NAN,
            payload,
            1.5,
            -0.0,
            0.0,
        ]))];
        let unequal = comparator(NullEquality::Equal, NanEquality::Unequal);
        assert!(!unequal.rows_equal(&keys, 0, 1).unwrap());
        assert!(!unequal.rows_equal(&keys, 0, 0).unwrap());
        assert!(unequal.rows_equal(&keys, 3, 4).unwrap());

        let all_equal = comparator(NullEquality::Equal, NanEquality::AllEqual);
        assert!(all_equal.rows_equal(&keys, 0, 1).unwrap());
        assert!(!all_equal.rows_equal(&keys, 0, 2).unwrap());
    }

    #[test]
    fn lists_compare_by_length_then_elements() {
        let keys: Vec<ArrayRef> = vec![Arc::new(ListArray::from_iter_primitive::<
            arrow::datatypes::Int32Type,
            _,
            _,
        >(vec![
            Some(vec![Some(1), Some(2)]),
            Some(vec![Some(1), Some(2)]),
            Some(vec![Some(2), Some(1)]),
            Some(vec![Some(1)]),
            Some(vec![]),
            Some(vec![]),
        ]))];
        let cmp = comparator(NullEquality::Equal, NanEquality::Unequal);
        assert!(cmp.rows_equal(&keys, 0, 1).unwrap());
        assert!(!cmp.rows_equal(&keys, 0, 2).unwrap());
        assert!(!cmp.rows_equal(&keys, 0, 3).unwrap());
        assert!(cmp.rows_equal(&keys, 4, 5).unwrap());
    }

    #[test]
    fn ancestor_null_masks_descendant_payloads() {
        // Two null structs whose children hold differing don't-care values.
        let child = Arc::new(Int32Array::from(vec![11, 22])) as ArrayRef;
        let fields = Fields::from(vec![Field::new("a", DataType::Int32, true)]);
        let structs = StructArray::new(
            fields,
            vec![child],
            Some(NullBuffer::from(vec![false, false])),
        );
        let keys: Vec<ArrayRef> = vec![Arc::new(structs)];

        let equal = comparator(NullEquality::Equal, NanEquality::Unequal);
        assert!(equal.rows_equal(&keys, 0, 1).unwrap());
        let unequal = comparator(NullEquality::Unequal, NanEquality::Unequal);
        assert!(!unequal.rows_equal(&keys, 0, 1).unwrap());
    }

    #[test]
    fn null_list_elements_follow_null_policy() {
        let keys: Vec<ArrayRef> = vec![Arc::new(ListArray::from_iter_primitive::<
            arrow::datatypes::Int32Type,
            _,
            _,
        >(vec![
            Some(vec![None, Some(2)]),
            Some(vec![None, Some(2)]),
            Some(vec![Some(1), Some(2)]),
        ]))];
        let equal = comparator(NullEquality::Equal, NanEquality::Unequal);
        assert!(equal.rows_equal(&keys, 0, 1).unwrap());
        assert!(!equal.rows_equal(&keys, 0, 2).unwrap());
        let unequal = comparator(NullEquality::Unequal, NanEquality::Unequal);
        assert!(!unequal.rows_equal(&keys, 0, 1).unwrap());
    }

    #[test]
    fn unsupported_key_type_is_an_error() {
        let keys: Vec<ArrayRef> = vec![Arc::new(arrow::array::LargeStringArray::from(vec![
            "a", "b",
        ]))];
        let cmp = comparator(NullEquality::Equal, NanEquality::Unequal);
        let err = cmp.rows_equal(&keys, 0, 1).unwrap_err();
        assert!(err.contains("unsupported key type"), "err={err}");
    }
}
