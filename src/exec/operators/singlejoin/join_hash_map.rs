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
//! Build-side hash index for the single-row join.
//!
//! Responsibilities:
//! - Groups build rows by their encoded join key and lays out each group's row addresses contiguously.
//! - Answers unit-sized probe lookups with a membership flag and a tagged match per probe row.
//!
//! Key exported interfaces:
//! - Types: `JoinHashIndex`, `ProbeMatch`, `JoinHashMap`, `JoinHashMapBuilder`.
//! - Functions: `build_join_hash_map`.
//!
//! Current limitations:
//! - Rows with a NULL in any key column never enter the index (`=` semantics only).
//! - Row addresses are `u32`, so one build side holds at most `u32::MAX` rows.

use std::mem;

use arrow::array::{Array, ArrayRef};
use arrow::buffer::NullBuffer;
use arrow::datatypes::DataType;
use arrow::row::{RowConverter, SortField};
use hashbrown::HashMap;

use crate::exec::chunk::Chunk;
use crate::exec::expr::{ExprArena, ExprId};

/// Number of probe rows looked up per `find_unit` call.
pub const UNIT_LIMIT: usize = 256;

const ROW_NONE: u32 = u32::MAX;

/// Lookup result for one probe row.
///
/// Addresses are global build row ids: `chunk_index * chunk_size + row_in_chunk`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProbeMatch {
    #[default]
    NoMatch,
    /// The only build row carrying the key.
    Single(u32),
    /// A group of build rows carrying the key; see [`JoinHashIndex::candidates`].
    Candidates(usize),
}

/// Read-only hash index over the build side, shared by every copy of the probe operator.
pub trait JoinHashIndex: Send + Sync {
    /// Key column types the index was built with. Probe keys must be cast to these.
    fn key_types(&self) -> &[DataType];

    /// Chunk size used to compute row addresses.
    fn chunk_size(&self) -> usize;

    /// Whether every key maps to exactly one build row.
    fn is_primary_key(&self) -> bool;

    /// Look up probe rows `[start, start + n)` of `keys`.
    ///
    /// On entry the caller sets `in_buckets[..n]` to `true`; rows whose key cannot be
    /// looked up (a NULL key column) are cleared. `out[..n]` receives one match per row.
    fn find_unit(
        &self,
        keys: &[ArrayRef],
        start: usize,
        n: usize,
        in_buckets: &mut [bool],
        out: &mut [ProbeMatch],
    ) -> Result<(), String>;

    /// Build row addresses of a group, ascending.
    fn candidates(&self, group: usize) -> Result<&[u32], String>;

    /// Approximate heap footprint in bytes.
    fn size_estimate(&self) -> usize;

    fn row_count(&self) -> usize;
}

/// Hash index keyed by Arrow row-format encodings of the join key columns.
pub struct JoinHashMap {
    key_types: Vec<DataType>,
    chunk_size: usize,
    hash_on_pk: bool,
    converter: RowConverter,
    groups: HashMap<Box<[u8]>, usize>,
    group_offsets: Vec<u32>,
    group_rows: Vec<u32>,
    row_count: usize,
    key_bytes: usize,
}

impl std::fmt::Debug for JoinHashMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinHashMap")
            .field("key_types", &self.key_types)
            .field("chunk_size", &self.chunk_size)
            .field("hash_on_pk", &self.hash_on_pk)
            .field("groups", &self.groups.len())
            .field("row_count", &self.row_count)
            .finish()
    }
}

impl JoinHashMap {
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

fn key_nulls(keys: &[ArrayRef]) -> Vec<Option<NullBuffer>> {
    keys.iter().map(|k| k.logical_nulls()).collect()
}

fn row_has_null(nulls: &[Option<NullBuffer>], row: usize) -> bool {
    nulls
        .iter()
        .any(|n| n.as_ref().is_some_and(|n| n.is_null(row)))
}

fn check_key_columns(keys: &[ArrayRef], key_types: &[DataType]) -> Result<(), String> {
    if keys.len() != key_types.len() {
        return Err(format!(
            "join key length mismatch: expected {} columns, got {}",
            key_types.len(),
            keys.len()
        ));
    }
    for (idx, (array, expected)) in keys.iter().zip(key_types).enumerate() {
        if array.data_type() != expected {
            return Err(format!(
                "join key type mismatch at index {}: expected {:?}, got {:?}",
                idx,
                expected,
                array.data_type()
            ));
        }
    }
    Ok(())
}

impl JoinHashIndex for JoinHashMap {
    fn key_types(&self) -> &[DataType] {
        &self.key_types
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn is_primary_key(&self) -> bool {
        self.hash_on_pk
    }

    fn find_unit(
        &self,
        keys: &[ArrayRef],
        start: usize,
        n: usize,
        in_buckets: &mut [bool],
        out: &mut [ProbeMatch],
    ) -> Result<(), String> {
        if n > in_buckets.len() || n > out.len() {
            return Err(format!(
                "join lookup unit too large: n={} flags={} out={}",
                n,
                in_buckets.len(),
                out.len()
            ));
        }
        check_key_columns(keys, &self.key_types)?;
        let unit: Vec<ArrayRef> = keys.iter().map(|k| k.slice(start, n)).collect();
        let nulls = key_nulls(&unit);
        let rows = self
            .converter
            .convert_columns(&unit)
            .map_err(|e| e.to_string())?;
        for k in 0..n {
            if row_has_null(&nulls, k) {
                in_buckets[k] = false;
                out[k] = ProbeMatch::NoMatch;
                continue;
            }
            out[k] = match self.groups.get(rows.row(k).as_ref()) {
                None => ProbeMatch::NoMatch,
                Some(&group) if self.hash_on_pk => {
                    let first = self.group_offsets[group] as usize;
                    ProbeMatch::Single(self.group_rows[first])
                }
                Some(&group) => ProbeMatch::Candidates(group),
            };
        }
        Ok(())
    }

    fn candidates(&self, group: usize) -> Result<&[u32], String> {
        if group + 1 >= self.group_offsets.len() {
            return Err(format!(
                "join group id {} out of bounds (groups={})",
                group,
                self.groups.len()
            ));
        }
        let start = self.group_offsets[group] as usize;
        let end = self.group_offsets[group + 1] as usize;
        Ok(&self.group_rows[start..end])
    }

    fn size_estimate(&self) -> usize {
        let entry = mem::size_of::<(Box<[u8]>, usize)>() + 1;
        self.key_bytes
            .saturating_add(self.groups.capacity().saturating_mul(entry))
            .saturating_add(self.group_offsets.capacity() * mem::size_of::<u32>())
            .saturating_add(self.group_rows.capacity() * mem::size_of::<u32>())
    }

    fn row_count(&self) -> usize {
        self.row_count
    }
}

/// Incremental builder for [`JoinHashMap`].
///
/// Chunks must be added in build order; every chunk but the last one must hold
/// exactly `chunk_size` rows so that addresses decompose in O(1).
pub struct JoinHashMapBuilder {
    key_types: Vec<DataType>,
    hash_on_pk: bool,
    chunk_size: usize,
    converter: RowConverter,
    groups: HashMap<Box<[u8]>, usize>,
    group_head: Vec<u32>,
    row_next: Vec<u32>,
    row_count: usize,
    last_chunk_rows: Option<usize>,
    key_bytes: usize,
}

impl JoinHashMapBuilder {
    pub fn new(key_types: Vec<DataType>, hash_on_pk: bool, chunk_size: usize) -> Result<Self, String> {
        if key_types.is_empty() {
            return Err("join hash map requires join keys".to_string());
        }
        if chunk_size == 0 {
            return Err("join hash map chunk size must be positive".to_string());
        }
        let fields = key_types.iter().cloned().map(SortField::new).collect();
        let converter = RowConverter::new(fields).map_err(|e| e.to_string())?;
        Ok(Self {
            key_types,
            hash_on_pk,
            chunk_size,
            converter,
            groups: HashMap::new(),
            group_head: Vec::new(),
            row_next: Vec::new(),
            row_count: 0,
            last_chunk_rows: None,
            key_bytes: 0,
        })
    }

    pub fn add_chunk(&mut self, keys: &[ArrayRef], num_rows: usize) -> Result<(), String> {
        check_key_columns(keys, &self.key_types)?;
        if num_rows == 0 {
            return Ok(());
        }
        if let Some(prev) = self.last_chunk_rows
            && prev != self.chunk_size
        {
            return Err(format!(
                "join build chunk with {} rows is followed by another chunk; expected {} rows",
                prev, self.chunk_size
            ));
        }
        if num_rows > self.chunk_size {
            return Err(format!(
                "join build chunk has {} rows, more than chunk size {}",
                num_rows, self.chunk_size
            ));
        }
        if keys.iter().any(|k| k.len() != num_rows) {
            return Err("join key column length mismatch".to_string());
        }
        let next_row_count = self
            .row_count
            .checked_add(num_rows)
            .filter(|v| *v < ROW_NONE as usize)
            .ok_or_else(|| "join build row count overflow".to_string())?;

        let base_row_id = self.row_count as u32;
        self.row_next.resize(next_row_count, ROW_NONE);
        self.row_count = next_row_count;
        self.last_chunk_rows = Some(num_rows);

        let nulls = key_nulls(keys);
        let rows = self
            .converter
            .convert_columns(keys)
            .map_err(|e| e.to_string())?;
        for row in 0..num_rows {
            if row_has_null(&nulls, row) {
                continue;
            }
            let row_id = base_row_id + row as u32;
            let key = rows.row(row);
            let group = match self.groups.get(key.as_ref()) {
                Some(&group) => {
                    if self.hash_on_pk {
                        return Err(format!(
                            "duplicate key for primary-key join hash map at build row {}",
                            row_id
                        ));
                    }
                    group
                }
                None => {
                    let group = self.group_head.len();
                    self.group_head.push(ROW_NONE);
                    self.key_bytes += key.as_ref().len();
                    self.groups.insert(key.as_ref().into(), group);
                    group
                }
            };
            self.row_next[row_id as usize] = self.group_head[group];
            self.group_head[group] = row_id;
        }
        Ok(())
    }

    /// Lay out every group's rows contiguously, ascending by address.
    pub fn finish(self) -> Result<JoinHashMap, String> {
        let group_count = self.group_head.len();
        let mut counts = vec![0u32; group_count];
        for (group, head) in self.group_head.iter().enumerate() {
            let mut row = *head;
            while row != ROW_NONE {
                counts[group] += 1;
                row = self.row_next[row as usize];
            }
        }

        let mut offsets = Vec::with_capacity(group_count + 1);
        offsets.push(0u32);
        let mut total = 0u32;
        for count in &counts {
            total = total
                .checked_add(*count)
                .ok_or_else(|| "join group rows overflow".to_string())?;
            offsets.push(total);
        }

        // Chains are newest-first, so fill each group from its end.
        let mut rows = vec![0u32; total as usize];
        for (group, head) in self.group_head.iter().enumerate() {
            let mut write_pos = offsets[group + 1] as usize;
            let mut row = *head;
            while row != ROW_NONE {
                write_pos -= 1;
                rows[write_pos] = row;
                row = self.row_next[row as usize];
            }
        }

        Ok(JoinHashMap {
            key_types: self.key_types,
            chunk_size: self.chunk_size,
            hash_on_pk: self.hash_on_pk,
            converter: self.converter,
            groups: self.groups,
            group_offsets: offsets,
            group_rows: rows,
            row_count: self.row_count,
            key_bytes: self.key_bytes,
        })
    }
}

/// Evaluate the build-side key expressions over `chunks` and index them.
///
/// Returns `None` when the build side has no rows.
pub fn build_join_hash_map(
    arena: &ExprArena,
    build_exprs: &[ExprId],
    chunks: &[Chunk],
    hash_on_pk: bool,
    chunk_size: usize,
) -> Result<Option<JoinHashMap>, String> {
    let mut builder: Option<JoinHashMapBuilder> = None;
    for chunk in chunks.iter().filter(|c| !c.is_empty()) {
        let mut keys = Vec::with_capacity(build_exprs.len());
        for expr in build_exprs {
            keys.push(arena.eval(*expr, chunk)?);
        }
        if builder.is_none() {
            let key_types = keys.iter().map(|k| k.data_type().clone()).collect();
            builder = Some(JoinHashMapBuilder::new(key_types, hash_on_pk, chunk_size)?);
        }
        if let Some(builder) = builder.as_mut() {
            builder.add_chunk(&keys, chunk.len())?;
        }
    }
    builder.map(JoinHashMapBuilder::finish).transpose()
}
