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
//! One-row paired chunk used to evaluate the extra join predicate.
//!
//! The scope schema (probe fields followed by build fields) and its slot map are
//! resolved once per probe schema; each candidate pair only slices columns.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef};
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::common::ids::SlotId;
use crate::exec::chunk::{Chunk, slot_id_to_index_from_schema};
use crate::exec::expr::{ExprArena, ExprId, as_boolean};

pub(crate) struct JoinBatch {
    probe_schema: SchemaRef,
    build_schema: SchemaRef,
    schema: SchemaRef,
    slot_index: Arc<HashMap<SlotId, usize>>,
    probe_row: Vec<ArrayRef>,
}

impl JoinBatch {
    pub(crate) fn try_new(probe_schema: SchemaRef, build_schema: SchemaRef) -> Result<Self, String> {
        let fields = probe_schema
            .fields()
            .iter()
            .chain(build_schema.fields().iter())
            .cloned()
            .collect::<Vec<_>>();
        let schema = Arc::new(Schema::new(fields));
        let slot_index = slot_id_to_index_from_schema(schema.as_ref())
            .map_err(|e| format!("join predicate scope: {}", e))?;
        Ok(Self {
            probe_schema,
            build_schema,
            schema,
            slot_index: Arc::new(slot_index),
            probe_row: Vec::new(),
        })
    }

    /// Whether this scratch can pair rows of chunks with these schemas.
    pub(crate) fn matches(&self, probe_schema: &SchemaRef, build_schema: &SchemaRef) -> bool {
        (Arc::ptr_eq(&self.probe_schema, probe_schema) || self.probe_schema == *probe_schema)
            && (Arc::ptr_eq(&self.build_schema, build_schema)
                || self.build_schema == *build_schema)
    }

    /// Fix the probe half of the pair to `row` of `probe`.
    pub(crate) fn set_probe_row(&mut self, probe: &Chunk, row: usize) {
        self.probe_row.clear();
        self.probe_row
            .extend(probe.columns().iter().map(|c| c.slice(row, 1)));
    }

    fn pair(&self, build: &Chunk, row: usize) -> Result<Chunk, String> {
        let mut columns = Vec::with_capacity(self.schema.fields().len());
        columns.extend(self.probe_row.iter().cloned());
        columns.extend(build.columns().iter().map(|c| c.slice(row, 1)));
        let batch = RecordBatch::try_new(Arc::clone(&self.schema), columns)
            .map_err(|e| format!("build join predicate row: {}", e))?;
        Ok(Chunk::with_slot_index(batch, Arc::clone(&self.slot_index)))
    }

    /// Evaluate `predicate` over the current probe row paired with `row` of `build`.
    ///
    /// Returns `None` when the predicate is NULL.
    pub(crate) fn eval_predicate(
        &self,
        arena: &ExprArena,
        predicate: ExprId,
        build: &Chunk,
        row: usize,
    ) -> Result<Option<bool>, String> {
        let pair = self.pair(build, row)?;
        let result = arena.eval(predicate, &pair)?;
        if result.len() != 1 {
            return Err(format!(
                "join predicate returned {} rows for one candidate pair",
                result.len()
            ));
        }
        let result = as_boolean(&result, "join predicate")?;
        if result.is_null(0) {
            return Ok(None);
        }
        Ok(Some(result.value(0)))
    }
}
