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
//! Single-row (scalar subquery) hash join operator.
//!
//! Responsibilities:
//! - Receives the build-side hash index and build chunks once, then streams probe chunks through it.
//! - Emits one output chunk per probe chunk, with build columns taken from the unique match or NULL.
//! - Fails with a cardinality violation when more than one build row qualifies for a probe row.
//!
//! Key exported interfaces:
//! - Types: `SingleJoinOperatorFactory`, `SingleJoinOperator`, `SingleJoinParam`, `OutputColumn`.
//!
//! Current limitations:
//! - One operator instance per pipeline copy; the hash index is shared read-only between copies.
//! - Join keys use `=` semantics: probe rows with a NULL key never match.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, new_null_array};
use arrow::compute::interleave;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use super::join_batch::JoinBatch;
use super::join_conditions::{JoinCondition, JoinConditions};
use super::join_hash_map::{JoinHashIndex, ProbeMatch, UNIT_LIMIT};
use crate::common::config;
use crate::common::ids::SlotId;
use crate::common::status::ExecError;
use crate::exec::chunk::{Chunk, field_with_slot_id};
use crate::exec::expr::{ExprArena, ExprId};
use crate::exec::pipeline::operator::{CallResult, PullOperator};
use crate::exec::pipeline::operator_factory::OperatorFactory;
use crate::exec::pipeline::receiver::{ChunkReceiver, JoinSide, Received};
use crate::runtime::mem_tracker::MemTracker;
use crate::runtime::runtime_state::RuntimeState;
use crate::scalar_join_logging::{debug, info};

const CARDINALITY_VIOLATION_MSG: &str = "scalar subquery returns more than 1 row";

/// One column of the join output: column `pos` of the probe or build input.
#[derive(Clone, Debug)]
pub struct OutputColumn {
    pub side: JoinSide,
    pub pos: usize,
    pub data_type: DataType,
    pub slot_id: SlotId,
    pub name: String,
}

/// Plan-time configuration of a single join.
#[derive(Clone, Debug)]
pub struct SingleJoinParam {
    pub node_id: i32,
    pub arena: Arc<ExprArena>,
    pub conditions: Vec<JoinCondition>,
    /// Extra predicate evaluated over each (probe row, candidate build row) pair.
    pub other_predicate: Option<ExprId>,
    pub output_columns: Vec<OutputColumn>,
    /// Join key is unique on the build side.
    pub hash_on_pk: bool,
}

impl SingleJoinParam {
    /// Build-side key expressions, in condition order.
    pub fn build_exprs(&self) -> Vec<ExprId> {
        self.conditions.iter().map(|c| c.build).collect()
    }
}

/// Factory for single-join operators, one per pipeline copy.
pub struct SingleJoinOperatorFactory {
    name: String,
    param: Arc<SingleJoinParam>,
}

impl SingleJoinOperatorFactory {
    pub fn new(param: SingleJoinParam) -> Self {
        let name = if param.node_id >= 0 {
            format!("SINGLE_JOIN (id={})", param.node_id)
        } else {
            "SINGLE_JOIN".to_string()
        };
        Self {
            name,
            param: Arc::new(param),
        }
    }

    pub fn create_operator(
        &self,
        driver_id: i32,
        receiver: Box<dyn ChunkReceiver>,
    ) -> SingleJoinOperator {
        SingleJoinOperator::new(
            self.name.clone(),
            driver_id,
            Arc::clone(&self.param),
            receiver,
        )
    }
}

impl OperatorFactory for SingleJoinOperatorFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self, driver_id: i32, receiver: Box<dyn ChunkReceiver>) -> Box<dyn PullOperator> {
        Box::new(self.create_operator(driver_id, receiver))
    }
}

impl fmt::Display for SingleJoinOperatorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("single: single join ")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinPhase {
    Build,
    Probe,
    End,
}

/// Counters reported when the operator closes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SingleJoinStats {
    pub build_chunks: usize,
    pub build_rows: usize,
    pub input_chunks: usize,
    pub input_rows: usize,
    pub output_chunks: usize,
    pub output_rows: usize,
    pub matched_rows: usize,
    pub null_rows: usize,
    pub predicate_evals: usize,
}

pub struct SingleJoinOperator {
    name: String,
    driver_id: i32,
    param: Arc<SingleJoinParam>,
    receiver: Box<dyn ChunkReceiver>,
    phase: JoinPhase,
    prepared: bool,

    hash_map: Option<Arc<dyn JoinHashIndex>>,
    build_chunks: Vec<Chunk>,
    build_row_count: usize,

    conditions: JoinConditions,
    in_buckets: Vec<bool>,
    matches: Vec<ProbeMatch>,
    row_addrs: Vec<Option<(usize, usize)>>,
    join_batch: Option<JoinBatch>,
    result: Option<Chunk>,

    output_schema: Option<SchemaRef>,
    output_slot_index: Arc<HashMap<SlotId, usize>>,

    max_alloc_size: usize,
    mem_tracker: Option<Arc<MemTracker>>,
    accounted_bytes: i64,
    stats: SingleJoinStats,
}

impl SingleJoinOperator {
    fn new(
        name: String,
        driver_id: i32,
        param: Arc<SingleJoinParam>,
        receiver: Box<dyn ChunkReceiver>,
    ) -> Self {
        let conditions = JoinConditions::new(Arc::clone(&param.arena), &param.conditions);
        Self {
            name,
            driver_id,
            param,
            receiver,
            phase: JoinPhase::Build,
            prepared: false,
            hash_map: None,
            build_chunks: Vec::new(),
            build_row_count: 0,
            conditions,
            in_buckets: Vec::new(),
            matches: Vec::new(),
            row_addrs: Vec::new(),
            join_batch: None,
            result: None,
            output_schema: None,
            output_slot_index: Arc::new(HashMap::new()),
            max_alloc_size: 0,
            mem_tracker: None,
            accounted_bytes: 0,
            stats: SingleJoinStats::default(),
        }
    }

    pub fn phase(&self) -> JoinPhase {
        self.phase
    }

    pub fn stats(&self) -> &SingleJoinStats {
        &self.stats
    }

    /// High-water mark of the hash index footprint, in bytes.
    pub fn max_alloc_size(&self) -> usize {
        self.max_alloc_size
    }

    pub fn build_row_count(&self) -> usize {
        self.build_row_count
    }

    fn ensure_prepared(&mut self, state: &RuntimeState) -> Result<(), ExecError> {
        if self.prepared {
            return Ok(());
        }
        if self.param.conditions.is_empty() {
            return Err(ExecError::invariant(format!(
                "{} requires at least one equality condition",
                self.name
            )));
        }
        let mut fields = Vec::with_capacity(self.param.output_columns.len());
        for col in &self.param.output_columns {
            let field = Field::new(col.name.as_str(), col.data_type.clone(), true);
            fields.push(field_with_slot_id(field, col.slot_id));
        }
        let schema = Arc::new(Schema::new(fields));
        let slot_index = crate::exec::chunk::slot_id_to_index_from_schema(schema.as_ref())
            .map_err(|e| ExecError::invariant(format!("{} output: {}", self.name, e)))?;
        self.output_schema = Some(schema);
        self.output_slot_index = Arc::new(slot_index);

        self.in_buckets = vec![true; UNIT_LIMIT];
        self.matches = vec![ProbeMatch::NoMatch; UNIT_LIMIT];
        if self.mem_tracker.is_none()
            && let Some(parent) = state.mem_tracker()
        {
            self.mem_tracker = Some(MemTracker::new_child(self.name.clone(), &parent));
        }
        self.prepared = true;
        Ok(())
    }

    fn release_result(&mut self) {
        self.result = None;
    }

    fn charge_index(&mut self, bytes: usize) {
        self.max_alloc_size = self.max_alloc_size.max(bytes);
        let Some(tracker) = self.mem_tracker.as_ref() else {
            return;
        };
        let target = i64::try_from(self.max_alloc_size).unwrap_or(i64::MAX);
        let delta = target - self.accounted_bytes;
        if delta > 0 {
            tracker.consume(delta);
            self.accounted_bytes = target;
        }
    }

    fn build(&mut self, state: &RuntimeState) -> Result<(), ExecError> {
        let chunk_size = state.chunk_size();
        // An empty build side may still send "last" markers or empty chunks.
        loop {
            match self.receiver.receive(JoinSide::Build)? {
                None => {
                    debug!(
                        target: "scalar_join::single_join",
                        name = %self.name,
                        driver_id = self.driver_id,
                        "build side is empty"
                    );
                    return Ok(());
                }
                Some(Received::HashMap(map)) => {
                    if map.chunk_size() != chunk_size {
                        return Err(ExecError::invariant(format!(
                            "{}: hash map built with chunk size {}, runtime chunk size is {}",
                            self.name,
                            map.chunk_size(),
                            chunk_size
                        )));
                    }
                    if map.is_primary_key() != self.param.hash_on_pk {
                        return Err(ExecError::invariant(format!(
                            "{}: hash map primary-key mode is {}, join expects {}",
                            self.name,
                            map.is_primary_key(),
                            self.param.hash_on_pk
                        )));
                    }
                    self.charge_index(map.size_estimate());
                    self.hash_map = Some(map);
                    break;
                }
                Some(Received::Chunk(chunk)) if chunk.is_empty() => continue,
                Some(Received::Chunk(_)) => {
                    return Err(ExecError::invariant(format!(
                        "{}: build chunk received before the hash map",
                        self.name
                    )));
                }
            }
        }

        loop {
            let chunk = match self.receiver.receive(JoinSide::Build)? {
                None => break,
                Some(Received::Chunk(chunk)) => chunk,
                Some(Received::HashMap(_)) => {
                    return Err(ExecError::invariant(format!(
                        "{}: hash map received twice",
                        self.name
                    )));
                }
            };
            if chunk.is_empty() {
                continue;
            }
            if let Some(prev) = self.build_chunks.last()
                && prev.len() != chunk_size
            {
                return Err(ExecError::invariant(format!(
                    "{}: build chunk {} has {} rows but is not the last one; expected {}",
                    self.name,
                    self.build_chunks.len() - 1,
                    prev.len(),
                    chunk_size
                )));
            }
            if chunk.len() > chunk_size {
                return Err(ExecError::invariant(format!(
                    "{}: build chunk {} has {} rows, more than chunk size {}",
                    self.name,
                    self.build_chunks.len(),
                    chunk.len(),
                    chunk_size
                )));
            }
            let mut chunk = chunk;
            if let Some(tracker) = self.mem_tracker.as_ref() {
                chunk.transfer_to(tracker);
            }
            self.build_row_count += chunk.len();
            self.build_chunks.push(chunk);
        }

        if let Some(map) = self.hash_map.as_ref()
            && map.row_count() > self.build_row_count
        {
            return Err(ExecError::invariant(format!(
                "{}: hash map indexes {} rows but the build side has {}",
                self.name,
                map.row_count(),
                self.build_row_count
            )));
        }
        self.stats.build_chunks = self.build_chunks.len();
        self.stats.build_rows = self.build_row_count;
        debug!(
            target: "scalar_join::single_join",
            name = %self.name,
            driver_id = self.driver_id,
            build_chunks = self.build_chunks.len(),
            build_rows = self.build_row_count,
            max_alloc_size = self.max_alloc_size,
            "build finished"
        );
        Ok(())
    }

    fn ensure_join_batch(&mut self, probe: &Chunk) -> Result<(), ExecError> {
        let Some(first) = self.build_chunks.first() else {
            return Ok(());
        };
        let probe_schema = probe.schema();
        let build_schema = first.schema();
        if let Some(existing) = self.join_batch.as_ref()
            && existing.matches(&probe_schema, &build_schema)
        {
            return Ok(());
        }
        let batch = JoinBatch::try_new(probe_schema, build_schema)
            .map_err(|e| ExecError::failed(format!("{}: {}", self.name, e)))?;
        self.join_batch = Some(batch);
        Ok(())
    }

    fn eval_candidate(
        &mut self,
        predicate: ExprId,
        addr: u32,
        chunk_size: usize,
    ) -> Result<Option<bool>, ExecError> {
        let (chunk_idx, row) = decompose_address(addr, chunk_size);
        let build = self.build_chunks.get(chunk_idx).ok_or_else(|| {
            ExecError::invariant(format!(
                "{}: build row address {} points past {} build chunks",
                self.name,
                addr,
                self.build_chunks.len()
            ))
        })?;
        if row >= build.len() {
            return Err(ExecError::invariant(format!(
                "{}: build row address {} points past build chunk {} ({} rows)",
                self.name,
                addr,
                chunk_idx,
                build.len()
            )));
        }
        let scratch = self.join_batch.as_ref().ok_or_else(|| {
            ExecError::invariant(format!("{}: join predicate scratch missing", self.name))
        })?;
        self.stats.predicate_evals += 1;
        scratch
            .eval_predicate(&self.param.arena, predicate, build, row)
            .map_err(|e| ExecError::failed(format!("{}: {}", self.name, e)))
    }

    /// Resolve the lookup result of probe row `row` to at most one build row address.
    fn resolve_match(
        &mut self,
        map: &dyn JoinHashIndex,
        probe: &Chunk,
        row: usize,
        found: ProbeMatch,
    ) -> Result<Option<u32>, ExecError> {
        let predicate = self.param.other_predicate;
        let chunk_size = map.chunk_size();
        if let Some(scratch) = self.join_batch.as_mut()
            && predicate.is_some()
            && found != ProbeMatch::NoMatch
        {
            scratch.set_probe_row(probe, row);
        }

        if self.param.hash_on_pk {
            return match found {
                ProbeMatch::NoMatch => Ok(None),
                ProbeMatch::Single(addr) => match predicate {
                    None => Ok(Some(addr)),
                    Some(pred) => {
                        let keep = self.eval_candidate(pred, addr, chunk_size)? == Some(true);
                        Ok(keep.then_some(addr))
                    }
                },
                ProbeMatch::Candidates(group) => Err(ExecError::invariant(format!(
                    "{}: hash map returned candidate group {} in primary-key mode",
                    self.name, group
                ))),
            };
        }

        let single;
        let candidates: &[u32] = match found {
            ProbeMatch::NoMatch => return Ok(None),
            ProbeMatch::Single(addr) => {
                single = [addr];
                &single
            }
            ProbeMatch::Candidates(group) => map
                .candidates(group)
                .map_err(|e| ExecError::failed(format!("{}: {}", self.name, e)))?,
        };
        let Some(pred) = predicate else {
            if candidates.len() > 1 {
                return Err(ExecError::cardinality_violation(CARDINALITY_VIOLATION_MSG));
            }
            return Ok(candidates.first().copied());
        };
        let mut matched = None;
        for &addr in candidates {
            if self.eval_candidate(pred, addr, chunk_size)? != Some(true) {
                continue;
            }
            if matched.is_some() {
                return Err(ExecError::cardinality_violation(CARDINALITY_VIOLATION_MSG));
            }
            matched = Some(addr);
        }
        Ok(matched)
    }

    fn probe(&mut self, probe: &Chunk) -> Result<Chunk, ExecError> {
        let Some(map) = self.hash_map.clone() else {
            return self.assemble(probe);
        };
        let rows = probe.len();
        let chunk_size = map.chunk_size();
        let keys = self
            .conditions
            .eval(probe, map.key_types())
            .map_err(|e| ExecError::failed(format!("{}: {}", self.name, e)))?
            .to_vec();
        if self.param.other_predicate.is_some() {
            self.ensure_join_batch(probe)?;
        }

        self.row_addrs.clear();
        self.row_addrs.resize(rows, None);
        let mut start = 0;
        while start < rows {
            let n = (rows - start).min(UNIT_LIMIT);
            self.in_buckets[..n].fill(true);
            map.find_unit(
                &keys,
                start,
                n,
                &mut self.in_buckets[..n],
                &mut self.matches[..n],
            )
            .map_err(|e| ExecError::failed(format!("{}: {}", self.name, e)))?;
            for k in 0..n {
                if !self.in_buckets[k] {
                    continue;
                }
                let found = self.matches[k];
                if let Some(addr) = self.resolve_match(map.as_ref(), probe, start + k, found)? {
                    self.row_addrs[start + k] = Some(decompose_address(addr, chunk_size));
                }
            }
            start += n;
        }
        self.conditions.clear();
        self.assemble(probe)
    }

    /// Build one output column from the build side, NULL where a probe row has no match.
    fn build_column(&self, col: &OutputColumn, rows: usize) -> Result<ArrayRef, ExecError> {
        if self.row_addrs.len() != rows || self.row_addrs.iter().all(Option::is_none) {
            return Ok(new_null_array(&col.data_type, rows));
        }
        let mut sources: Vec<ArrayRef> = Vec::with_capacity(self.build_chunks.len() + 1);
        for (idx, chunk) in self.build_chunks.iter().enumerate() {
            let array = chunk.columns().get(col.pos).ok_or_else(|| {
                ExecError::failed(format!(
                    "{}: build column {} missing in build chunk {} ({} columns)",
                    self.name,
                    col.pos,
                    idx,
                    chunk.columns().len()
                ))
            })?;
            if array.data_type() != &col.data_type {
                return Err(ExecError::failed(format!(
                    "{}: build column {} has type {:?}, expected {:?}",
                    self.name,
                    col.pos,
                    array.data_type(),
                    col.data_type
                )));
            }
            sources.push(Arc::clone(array));
        }
        let null_source = self.build_chunks.len();
        sources.push(new_null_array(&col.data_type, 1));

        let indices: Vec<(usize, usize)> = self
            .row_addrs
            .iter()
            .map(|addr| addr.unwrap_or((null_source, 0)))
            .collect();
        let refs: Vec<&dyn Array> = sources.iter().map(|a| a.as_ref()).collect();
        interleave(&refs, &indices)
            .map_err(|e| ExecError::failed(format!("{}: materialize build column: {}", self.name, e)))
    }

    fn assemble(&mut self, probe: &Chunk) -> Result<Chunk, ExecError> {
        let rows = probe.len();
        if self.hash_map.is_none() {
            self.row_addrs.clear();
        }
        let schema = self.output_schema.clone().ok_or_else(|| {
            ExecError::invariant(format!("{}: output schema not prepared", self.name))
        })?;
        let mut columns = Vec::with_capacity(self.param.output_columns.len());
        for col in &self.param.output_columns {
            match col.side {
                JoinSide::Probe => {
                    let array = probe.columns().get(col.pos).ok_or_else(|| {
                        ExecError::failed(format!(
                            "{}: probe column {} missing ({} columns)",
                            self.name,
                            col.pos,
                            probe.columns().len()
                        ))
                    })?;
                    if array.data_type() != &col.data_type {
                        return Err(ExecError::failed(format!(
                            "{}: probe column {} has type {:?}, expected {:?}",
                            self.name,
                            col.pos,
                            array.data_type(),
                            col.data_type
                        )));
                    }
                    columns.push(Arc::clone(array));
                }
                JoinSide::Build => columns.push(self.build_column(col, rows)?),
            }
        }
        let batch = if columns.is_empty() {
            RecordBatch::try_new_with_options(
                schema,
                columns,
                &arrow::record_batch::RecordBatchOptions::new().with_row_count(Some(rows)),
            )
        } else {
            RecordBatch::try_new(schema, columns)
        }
        .map_err(|e| ExecError::failed(format!("{}: build output chunk: {}", self.name, e)))?;

        let matched = self.row_addrs.iter().filter(|a| a.is_some()).count();
        self.stats.matched_rows += matched;
        self.stats.null_rows += rows - matched;
        Ok(Chunk::with_slot_index(
            batch,
            Arc::clone(&self.output_slot_index),
        ))
    }

    fn release_build(&mut self) {
        self.build_chunks.clear();
        self.hash_map = None;
        self.join_batch = None;
        self.row_addrs = Vec::new();
        self.conditions.clear();
        if let Some(tracker) = self.mem_tracker.as_ref() {
            tracker.release(self.accounted_bytes);
        }
        self.accounted_bytes = 0;
    }

    fn log_stats(&self) {
        let s = &self.stats;
        if config::debug_join_stats() {
            info!(
                target: "scalar_join::single_join",
                name = %self.name,
                driver_id = self.driver_id,
                build_rows = s.build_rows,
                input_rows = s.input_rows,
                output_rows = s.output_rows,
                matched_rows = s.matched_rows,
                null_rows = s.null_rows,
                predicate_evals = s.predicate_evals,
                max_alloc_size = self.max_alloc_size,
                "single join finished"
            );
        } else {
            debug!(
                target: "scalar_join::single_join",
                name = %self.name,
                driver_id = self.driver_id,
                build_rows = s.build_rows,
                input_rows = s.input_rows,
                output_rows = s.output_rows,
                matched_rows = s.matched_rows,
                null_rows = s.null_rows,
                predicate_evals = s.predicate_evals,
                max_alloc_size = self.max_alloc_size,
                "single join finished"
            );
        }
    }
}

fn decompose_address(addr: u32, chunk_size: usize) -> (usize, usize) {
    let addr = addr as usize;
    (addr / chunk_size, addr % chunk_size)
}

impl PullOperator for SingleJoinOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_mem_tracker(&mut self, tracker: Arc<MemTracker>) {
        if let Some(current) = self.mem_tracker.as_ref() {
            if Arc::ptr_eq(current, &tracker) {
                return;
            }
            current.release(self.accounted_bytes);
        }
        tracker.consume(self.accounted_bytes);
        for chunk in self.build_chunks.iter_mut() {
            chunk.transfer_to(&tracker);
        }
        self.mem_tracker = Some(tracker);
    }

    fn prepare(&mut self, state: &RuntimeState) -> Result<(), ExecError> {
        self.ensure_prepared(state)
    }

    fn call(&mut self, state: &RuntimeState) -> Result<CallResult, ExecError> {
        if state.is_cancelled() {
            self.release_result();
            return Err(ExecError::cancelled(format!("{} cancelled", self.name)));
        }
        self.ensure_prepared(state)?;
        loop {
            match self.phase {
                JoinPhase::Build => {
                    self.build(state)?;
                    self.phase = JoinPhase::Probe;
                }
                JoinPhase::Probe => {
                    let chunk = match self.receiver.receive(JoinSide::Probe)? {
                        None => {
                            self.release_result();
                            self.phase = JoinPhase::End;
                            continue;
                        }
                        Some(Received::Chunk(chunk)) => chunk,
                        Some(Received::HashMap(_)) => {
                            return Err(ExecError::invariant(format!(
                                "{}: hash map received on the probe side",
                                self.name
                            )));
                        }
                    };
                    if chunk.is_last() {
                        self.release_result();
                        return Ok(CallResult::next(chunk));
                    }
                    if chunk.is_empty() {
                        continue;
                    }
                    self.release_result();
                    self.stats.input_chunks += 1;
                    self.stats.input_rows += chunk.len();
                    let mut out = self.probe(&chunk)?;
                    if let Some(tracker) = self.mem_tracker.as_ref() {
                        out.transfer_to(tracker);
                    }
                    self.stats.output_chunks += 1;
                    self.stats.output_rows += out.len();
                    self.result = Some(out.clone());
                    return Ok(CallResult::next(out));
                }
                JoinPhase::End => return Ok(CallResult::stop()),
            }
        }
    }

    fn close(&mut self) -> Result<(), ExecError> {
        self.release_result();
        self.release_build();
        self.log_stats();
        Ok(())
    }
}

impl Drop for SingleJoinOperator {
    fn drop(&mut self) {
        if let Some(tracker) = self.mem_tracker.as_ref() {
            tracker.release(self.accounted_bytes);
        }
        self.accounted_bytes = 0;
    }
}

impl fmt::Display for SingleJoinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("single: single join ")
    }
}
