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
use super::LiteralValue;
use arrow::array::{
    ArrayRef, BooleanArray, Date32Array, Float64Array, Int32Array, Int64Array, NullArray,
    StringArray, new_null_array,
};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use std::sync::Arc;

/// Materialize `value` as a constant column of `len` rows.
///
/// `declared` is the planner's result type; a NULL literal without one stays untyped.
pub(crate) fn eval_literal(
    value: &LiteralValue,
    declared: Option<&DataType>,
    len: usize,
) -> Result<ArrayRef, String> {
    let array: ArrayRef = match (value, declared) {
        (LiteralValue::Null, Some(dt)) => return Ok(new_null_array(dt, len)),
        (LiteralValue::Null, None) => Arc::new(NullArray::new(len)),
        (LiteralValue::Int32(v), _) => Arc::new(Int32Array::from_value(*v, len)),
        (LiteralValue::Int64(v), _) => Arc::new(Int64Array::from_value(*v, len)),
        (LiteralValue::Float64(v), _) => Arc::new(Float64Array::from_value(*v, len)),
        (LiteralValue::Date32(v), _) => Arc::new(Date32Array::from_value(*v, len)),
        (LiteralValue::Bool(v), _) => Arc::new(BooleanArray::from(vec![*v; len])),
        (LiteralValue::Utf8(v), _) => Arc::new(StringArray::from_iter_values(
            std::iter::repeat_n(v.as_str(), len),
        )),
    };
    match declared {
        Some(dt) if array.data_type() != dt => cast(&array, dt).map_err(|e| {
            format!(
                "literal cast failed from {:?} to {:?}: {}",
                array.data_type(),
                dt,
                e
            )
        }),
        _ => Ok(array),
    }
}
