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
use arrow::array::{Array, ArrayRef, BooleanArray, new_null_array};
use arrow::compute::cast;
use arrow::compute::kernels::boolean::{and_kleene, not, or_kleene};
use arrow::compute::kernels::cmp;
use arrow::datatypes::DataType;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    /// `<=>`
    EqForNull,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LogicOp {
    And,
    Or,
}

fn is_integer(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
    )
}

fn is_numeric(dt: &DataType) -> bool {
    is_integer(dt) || matches!(dt, DataType::Float32 | DataType::Float64)
}

fn cast_operand(array: ArrayRef, target: &DataType) -> Result<ArrayRef, String> {
    if array.data_type() == target {
        return Ok(array);
    }
    cast(&array, target).map_err(|e| {
        format!(
            "cast comparison operand from {:?} to {:?}: {}",
            array.data_type(),
            target,
            e
        )
    })
}

/// Bring both operands of a comparison to one type so the Arrow kernels accept them.
pub(crate) fn unify_operands(
    left: ArrayRef,
    right: ArrayRef,
) -> Result<(ArrayRef, ArrayRef), String> {
    let (lt, rt) = (left.data_type().clone(), right.data_type().clone());
    if lt == rt {
        return Ok((left, right));
    }
    // An untyped NULL takes the type of the other side.
    if lt.is_null() {
        return Ok((new_null_array(&rt, left.len()), right));
    }
    if rt.is_null() {
        let len = right.len();
        return Ok((left, new_null_array(&lt, len)));
    }
    let target = if is_integer(&lt) && is_integer(&rt) {
        DataType::Int64
    } else if is_numeric(&lt) && is_numeric(&rt) {
        DataType::Float64
    } else {
        return Err(format!("cannot compare {:?} with {:?}", lt, rt));
    };
    Ok((cast_operand(left, &target)?, cast_operand(right, &target)?))
}

/// View a predicate operand as booleans. An untyped NULL column is all-null.
pub(crate) fn as_boolean(array: &ArrayRef, context: &str) -> Result<BooleanArray, String> {
    if let Some(b) = array.as_any().downcast_ref::<BooleanArray>() {
        return Ok(b.clone());
    }
    if array.data_type().is_null() {
        return Ok(BooleanArray::new_null(array.len()));
    }
    Err(format!(
        "{} operand must be boolean, got {:?}",
        context,
        array.data_type()
    ))
}

pub(crate) fn eval_cmp(
    arena: &ExprArena,
    op: CmpOp,
    left: ExprId,
    right: ExprId,
    chunk: &Chunk,
) -> Result<ArrayRef, String> {
    let (l, r) = unify_operands(arena.eval(left, chunk)?, arena.eval(right, chunk)?)?;
    if op == CmpOp::EqForNull && l.data_type().is_null() {
        return Ok(Arc::new(BooleanArray::from(vec![true; l.len()])));
    }
    let result = match op {
        CmpOp::Eq => cmp::eq(&l, &r),
        CmpOp::EqForNull => cmp::not_distinct(&l, &r),
        CmpOp::Ne => cmp::neq(&l, &r),
        CmpOp::Lt => cmp::lt(&l, &r),
        CmpOp::Le => cmp::lt_eq(&l, &r),
        CmpOp::Gt => cmp::gt(&l, &r),
        CmpOp::Ge => cmp::gt_eq(&l, &r),
    };
    let result = result.map_err(|e| format!("{:?}: {}", op, e))?;
    Ok(Arc::new(result))
}

/// SQL three-valued AND / OR: `FALSE AND NULL` is FALSE, `TRUE OR NULL` is TRUE.
pub(crate) fn eval_logic(
    arena: &ExprArena,
    op: LogicOp,
    left: ExprId,
    right: ExprId,
    chunk: &Chunk,
) -> Result<ArrayRef, String> {
    let l = as_boolean(&arena.eval(left, chunk)?, "logical")?;
    let r = as_boolean(&arena.eval(right, chunk)?, "logical")?;
    let result = match op {
        LogicOp::And => and_kleene(&l, &r),
        LogicOp::Or => or_kleene(&l, &r),
    };
    let result = result.map_err(|e| format!("{:?}: {}", op, e))?;
    Ok(Arc::new(result))
}

pub(crate) fn eval_not(arena: &ExprArena, child: ExprId, chunk: &Chunk) -> Result<ArrayRef, String> {
    let value = as_boolean(&arena.eval(child, chunk)?, "NOT")?;
    let result = not(&value).map_err(|e| e.to_string())?;
    Ok(Arc::new(result))
}
