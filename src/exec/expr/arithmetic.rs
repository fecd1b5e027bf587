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
use crate::exec::chunk::Chunk;
use crate::exec::expr::{ExprArena, ExprId};
use arrow::array::{ArrayRef, new_null_array};
use arrow::compute::cast;
use arrow::compute::kernels::numeric::{add_wrapping, mul_wrapping, sub_wrapping};
use arrow::datatypes::DataType;

/// Integer arithmetic wraps on overflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
}

fn numeric_rank(dt: &DataType) -> Option<u8> {
    match dt {
        DataType::Null => Some(0),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => Some(1),
        DataType::Float32 | DataType::Float64 => Some(2),
        _ => None,
    }
}

/// Result type when the planner left the expression untyped.
fn infer_output_type(lhs: &DataType, rhs: &DataType) -> Result<DataType, String> {
    match (numeric_rank(lhs), numeric_rank(rhs)) {
        (Some(l), Some(r)) if l.max(r) == 2 => Ok(DataType::Float64),
        (Some(_), Some(_)) => Ok(DataType::Int64),
        _ => Err(format!(
            "unsupported arithmetic operand types: {:?} and {:?}",
            lhs, rhs
        )),
    }
}

fn to_output_type(array: ArrayRef, target: &DataType, op: ArithOp) -> Result<ArrayRef, String> {
    if array.data_type() == target {
        return Ok(array);
    }
    if array.data_type().is_null() {
        return Ok(new_null_array(target, array.len()));
    }
    cast(&array, target).map_err(|e| {
        format!(
            "{:?}: cast operand from {:?} to {:?}: {}",
            op,
            array.data_type(),
            target,
            e
        )
    })
}

pub(crate) fn eval_arith(
    arena: &ExprArena,
    id: ExprId,
    op: ArithOp,
    left: ExprId,
    right: ExprId,
    chunk: &Chunk,
) -> Result<ArrayRef, String> {
    let lhs = arena.eval(left, chunk)?;
    let rhs = arena.eval(right, chunk)?;
    let output_type = match arena.data_type(id) {
        Some(dt) if !dt.is_null() => dt.clone(),
        _ => infer_output_type(lhs.data_type(), rhs.data_type())?,
    };
    if !matches!(numeric_rank(&output_type), Some(1 | 2)) {
        return Err(format!("{:?}: unsupported output type {:?}", op, output_type));
    }
    let lhs = to_output_type(lhs, &output_type, op)?;
    let rhs = to_output_type(rhs, &output_type, op)?;
    let result = match op {
        ArithOp::Add => add_wrapping(&lhs, &rhs),
        ArithOp::Sub => sub_wrapping(&lhs, &rhs),
        ArithOp::Mul => mul_wrapping(&lhs, &rhs),
    };
    result.map_err(|e| format!("{:?}: {}", op, e))
}
