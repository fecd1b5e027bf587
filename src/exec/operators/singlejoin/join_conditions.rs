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
use std::sync::Arc;

use arrow::array::{ArrayRef, new_null_array};
use arrow::compute::kernels::cmp;
use arrow::compute::{cast, not, nullif};
use arrow::datatypes::DataType;
use arrow::error::ArrowError;

use crate::exec::chunk::Chunk;
use crate::exec::expr::{ExprArena, ExprId};

/// One equality pair of the join condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoinCondition {
    pub probe: ExprId,
    pub build: ExprId,
}

/// Probe-side key evaluator. The key columns are kept between calls so the
/// vector is reused; each evaluation replaces the previous chunk's columns.
pub(crate) struct JoinConditions {
    arena: Arc<ExprArena>,
    probe_exprs: Vec<ExprId>,
    keys: Vec<ArrayRef>,
}

impl JoinConditions {
    pub(crate) fn new(arena: Arc<ExprArena>, conditions: &[JoinCondition]) -> Self {
        let probe_exprs: Vec<ExprId> = conditions.iter().map(|c| c.probe).collect();
        let keys = Vec::with_capacity(probe_exprs.len());
        Self {
            arena,
            probe_exprs,
            keys,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.probe_exprs.len()
    }

    /// Evaluate every probe key over `chunk` and convert it to the index key type.
    ///
    /// Only conversions that keep equality intact are accepted: integer widening,
    /// small integers to `Float64`, and floats to integers where a non-integral
    /// value becomes NULL (it cannot equal any integer key).
    pub(crate) fn eval(&mut self, chunk: &Chunk, key_types: &[DataType]) -> Result<&[ArrayRef], String> {
        if key_types.len() != self.probe_exprs.len() {
            return Err(format!(
                "join condition count {} does not match hash map key count {}",
                self.probe_exprs.len(),
                key_types.len()
            ));
        }
        self.keys.clear();
        for (expr, target) in self.probe_exprs.iter().zip(key_types) {
            let array = self.arena.eval(*expr, chunk)?;
            let from = array.data_type().clone();
            let array = if &from == target {
                array
            } else if matches!(from, DataType::Null) {
                new_null_array(target, array.len())
            } else if widens_losslessly(&from, target) {
                cast(&array, target).map_err(|e| {
                    format!("cast probe join key from {:?} to {:?} failed: {}", from, target, e)
                })?
            } else if matches!(from, DataType::Float32 | DataType::Float64) && target.is_integer() {
                exact_float_to_int(&array, target).map_err(|e| {
                    format!("cast probe join key from {:?} to {:?} failed: {}", from, target, e)
                })?
            } else {
                return Err(format!(
                    "probe join key type {:?} is not comparable with hash map key type {:?}",
                    from, target
                ));
            };
            self.keys.push(array);
        }
        Ok(&self.keys)
    }

    /// Drop the key columns of the last probe chunk.
    pub(crate) fn clear(&mut self) {
        self.keys.clear();
    }
}

fn widens_losslessly(from: &DataType, to: &DataType) -> bool {
    use DataType::*;
    match (from, to) {
        (Int8, Int16 | Int32 | Int64) | (Int16, Int32 | Int64) | (Int32, Int64) => true,
        (UInt8, UInt16 | UInt32 | UInt64 | Int16 | Int32 | Int64) => true,
        (UInt16, UInt32 | UInt64 | Int32 | Int64) | (UInt32, UInt64 | Int64) => true,
        (Int8 | Int16 | Int32 | UInt8 | UInt16 | UInt32 | Float32, Float64) => true,
        (Utf8, LargeUtf8) | (Binary, LargeBinary) => true,
        _ => false,
    }
}

/// Float keys as integers; values with a fraction, NaN or out of range become NULL.
fn exact_float_to_int(array: &ArrayRef, target: &DataType) -> Result<ArrayRef, ArrowError> {
    let floats = cast(array, &DataType::Float64)?;
    let ints = cast(&floats, target)?;
    let round_trip = cast(&ints, &DataType::Float64)?;
    let exact = cmp::eq(&floats, &round_trip)?;
    nullif(&ints, &not(&exact)?)
}
