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
//! Scalar expression evaluation over chunks.
//!
//! Responsibilities:
//! - Stores planner expressions in an arena addressed by `ExprId`.
//! - Evaluates an expression over a `Chunk`, producing one Arrow column with the chunk's row count.
//!
//! Key exported interfaces:
//! - Types: `ExprArena`, `ExprId`, `ExprNode`, `LiteralValue`.
//!
//! Current limitations:
//! - Arithmetic covers integer and floating point operands only.
//! - Unsupported operand types are reported as explicit errors instead of fallback behavior.

mod arithmetic;
mod comparison;
mod literal;

use std::sync::Arc;

use crate::common::ids::SlotId;
use crate::exec::chunk::Chunk;
use arrow::array::ArrayRef;
use arrow::compute::{is_not_null, is_null};
use arrow::datatypes::DataType;

use arithmetic::ArithOp;
use comparison::{CmpOp, LogicOp};

pub(crate) use comparison::as_boolean;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ExprId(pub usize);

#[derive(Clone, Debug)]
pub enum LiteralValue {
    Null,
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Bool(bool),
    Utf8(String),
    /// Days since the Unix epoch.
    Date32(i32),
}

#[derive(Clone, Debug)]
pub enum ExprNode {
    Literal(LiteralValue),
    /// Column reference resolved through the chunk's slot map.
    SlotId(SlotId),
    Add(ExprId, ExprId),
    Sub(ExprId, ExprId),
    Mul(ExprId, ExprId),
    Eq(ExprId, ExprId),
    /// `<=>`
    EqForNull(ExprId, ExprId),
    Ne(ExprId, ExprId),
    Lt(ExprId, ExprId),
    Le(ExprId, ExprId),
    Gt(ExprId, ExprId),
    Ge(ExprId, ExprId),
    And(ExprId, ExprId),
    Or(ExprId, ExprId),
    Not(ExprId),
    IsNull(ExprId),
    IsNotNull(ExprId),
}

#[derive(Clone, Debug, Default)]
pub struct ExprArena {
    nodes: Vec<ExprNode>,
    /// Declared result type per node; `None` when the planner left it untyped.
    types: Vec<Option<DataType>>,
}

impl ExprArena {
    pub fn push(&mut self, node: ExprNode) -> ExprId {
        self.push_node(node, None)
    }

    pub fn push_typed(&mut self, node: ExprNode, data_type: DataType) -> ExprId {
        self.push_node(node, Some(data_type).filter(|dt| !dt.is_null()))
    }

    fn push_node(&mut self, node: ExprNode, data_type: Option<DataType>) -> ExprId {
        self.nodes.push(node);
        self.types.push(data_type);
        ExprId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: ExprId) -> Option<&ExprNode> {
        self.nodes.get(id.0)
    }

    pub fn data_type(&self, id: ExprId) -> Option<&DataType> {
        self.types.get(id.0).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Evaluate `id` over `chunk`. The result always has `chunk.len()` rows.
    pub fn eval(&self, id: ExprId, chunk: &Chunk) -> Result<ArrayRef, String> {
        let node = self
            .node(id)
            .ok_or_else(|| format!("invalid ExprId {}", id.0))?;
        match node {
            ExprNode::Literal(v) => literal::eval_literal(v, self.data_type(id), chunk.len()),
            ExprNode::SlotId(slot_id) => chunk.column_by_slot_id(*slot_id),
            ExprNode::Add(a, b) => arithmetic::eval_arith(self, id, ArithOp::Add, *a, *b, chunk),
            ExprNode::Sub(a, b) => arithmetic::eval_arith(self, id, ArithOp::Sub, *a, *b, chunk),
            ExprNode::Mul(a, b) => arithmetic::eval_arith(self, id, ArithOp::Mul, *a, *b, chunk),
            ExprNode::Eq(a, b) => comparison::eval_cmp(self, CmpOp::Eq, *a, *b, chunk),
            ExprNode::EqForNull(a, b) => {
                comparison::eval_cmp(self, CmpOp::EqForNull, *a, *b, chunk)
            }
            ExprNode::Ne(a, b) => comparison::eval_cmp(self, CmpOp::Ne, *a, *b, chunk),
            ExprNode::Lt(a, b) => comparison::eval_cmp(self, CmpOp::Lt, *a, *b, chunk),
            ExprNode::Le(a, b) => comparison::eval_cmp(self, CmpOp::Le, *a, *b, chunk),
            ExprNode::Gt(a, b) => comparison::eval_cmp(self, CmpOp::Gt, *a, *b, chunk),
            ExprNode::Ge(a, b) => comparison::eval_cmp(self, CmpOp::Ge, *a, *b, chunk),
            ExprNode::And(a, b) => comparison::eval_logic(self, LogicOp::And, *a, *b, chunk),
            ExprNode::Or(a, b) => comparison::eval_logic(self, LogicOp::Or, *a, *b, chunk),
            ExprNode::Not(child) => comparison::eval_not(self, *child, chunk),
            // Both kernels read logical nulls, so an untyped NULL column is all null.
            ExprNode::IsNull(child) => {
                let array = self.eval(*child, chunk)?;
                let out = is_null(array.as_ref()).map_err(|e| e.to_string())?;
                Ok(Arc::new(out))
            }
            ExprNode::IsNotNull(child) => {
                let array = self.eval(*child, chunk)?;
                let out = is_not_null(array.as_ref()).map_err(|e| e.to_string())?;
                Ok(Arc::new(out))
            }
        }
    }
}
