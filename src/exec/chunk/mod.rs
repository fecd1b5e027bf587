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
//! Columnar chunk container.
//!
//! Responsibilities:
//! - Wraps an Arrow `RecordBatch` whose fields carry planner slot ids in their metadata.
//! - Carries the "last" control marker that some producers append to a stream.
//! - Charges chunk bytes to a `MemTracker` under the current-holder ownership model.
//!
//! Key exported interfaces:
//! - Types: `Chunk`.
//! - Functions: `field_with_slot_id`, `field_slot_id`, `record_batch_bytes`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arrow::array::{ArrayRef, RecordBatch};
use arrow::datatypes::{Field, Schema, SchemaRef};

use crate::common::ids::SlotId;
use crate::runtime::mem_tracker::MemTracker;

/// A chunk of data, consisting of multiple rows of same-length nullable columns.
#[derive(Debug, Clone)]
pub struct Chunk {
    batch: RecordBatch,
    slot_id_to_index: Arc<HashMap<SlotId, usize>>,
    is_last: bool,
    accounting: Option<Arc<ChunkAccounting>>,
}

impl Chunk {
    /// Wrap a batch whose every field carries a unique slot id.
    pub fn try_new(batch: RecordBatch) -> Result<Self, String> {
        let slot_id_to_index = slot_id_to_index_from_schema(batch.schema().as_ref())?;
        Ok(Self {
            batch,
            slot_id_to_index: Arc::new(slot_id_to_index),
            is_last: false,
            accounting: None,
        })
    }

    /// Wrap a batch with a slot map that the caller already resolved for its schema.
    pub(crate) fn with_slot_index(
        batch: RecordBatch,
        slot_id_to_index: Arc<HashMap<SlotId, usize>>,
    ) -> Self {
        Self {
            batch,
            slot_id_to_index,
            is_last: false,
            accounting: None,
        }
    }

    /// A zero-row chunk signalling that its producer has finished.
    pub fn new_last_marker() -> Self {
        Self {
            is_last: true,
            ..Self::default()
        }
    }

    pub fn is_last(&self) -> bool {
        self.is_last
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn column_by_slot_id(&self, slot_id: SlotId) -> Result<ArrayRef, String> {
        let idx = self
            .slot_id_to_index
            .get(&slot_id)
            .copied()
            .ok_or_else(|| {
                format!(
                    "slot id {} not found in chunk (num_columns={}, slot_ids={:?})",
                    slot_id,
                    self.batch.num_columns(),
                    self.slot_id_to_index.keys().collect::<Vec<_>>()
                )
            })?;
        self.batch
            .columns()
            .get(idx)
            .cloned()
            .ok_or_else(|| format!("slot id {} mapped to invalid index {}", slot_id, idx))
    }

    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn columns(&self) -> &[ArrayRef] {
        self.batch.columns()
    }

    /// Charge this chunk to `tracker`, moving the charge off the previous holder.
    pub fn transfer_to(&mut self, tracker: &Arc<MemTracker>) {
        if let Some(accounting) = self.accounting.as_ref() {
            accounting.transfer_to(tracker);
            return;
        }
        let bytes = chunk_bytes_i64(&self.batch);
        if bytes <= 0 {
            return;
        }
        self.accounting = Some(Arc::new(ChunkAccounting::new(bytes, tracker)));
    }
}

impl Default for Chunk {
    fn default() -> Self {
        Self {
            batch: RecordBatch::new_empty(Arc::new(Schema::empty())),
            slot_id_to_index: Arc::new(HashMap::new()),
            is_last: false,
            accounting: None,
        }
    }
}

pub const FIELD_META_SLOT_ID: &str = "scalar_join.slot_id";

pub fn field_with_slot_id(field: Field, slot_id: SlotId) -> Field {
    let mut meta = field.metadata().clone();
    meta.insert(FIELD_META_SLOT_ID.to_string(), slot_id.to_string());
    field.with_metadata(meta)
}

pub fn field_slot_id(field: &Field) -> Result<Option<SlotId>, String> {
    let Some(v) = field.metadata().get(FIELD_META_SLOT_ID) else {
        return Ok(None);
    };
    Ok(Some(v.parse::<SlotId>()?))
}

/// Resolve the slot id of every field of `schema` to its column index.
pub(crate) fn slot_id_to_index_from_schema(
    schema: &Schema,
) -> Result<HashMap<SlotId, usize>, String> {
    let mut map = HashMap::with_capacity(schema.fields().len());
    for (idx, field) in schema.fields().iter().enumerate() {
        let slot_id = field_slot_id(field)?.ok_or_else(|| {
            format!(
                "field {} ({}) carries no {} metadata",
                idx,
                field.name(),
                FIELD_META_SLOT_ID
            )
        })?;
        if let Some(prev) = map.insert(slot_id, idx) {
            return Err(format!(
                "duplicate slot id {} in chunk schema: fields {} ({}) and {} ({})",
                slot_id,
                prev,
                schema.field(prev).name(),
                idx,
                field.name()
            ));
        }
    }
    Ok(map)
}

/// Heap bytes held by `batch`. A sliced column reports its whole backing buffers.
pub fn record_batch_bytes(batch: &RecordBatch) -> usize {
    batch.get_array_memory_size()
}

#[derive(Debug)]
struct ChunkAccounting {
    bytes: i64,
    tracker: Mutex<Arc<MemTracker>>,
}

impl ChunkAccounting {
    fn new(bytes: i64, tracker: &Arc<MemTracker>) -> Self {
        tracker.consume(bytes);
        Self {
            bytes,
            tracker: Mutex::new(Arc::clone(tracker)),
        }
    }

    fn transfer_to(&self, tracker: &Arc<MemTracker>) {
        let mut guard = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
        if Arc::ptr_eq(&guard, tracker) {
            return;
        }
        guard.release(self.bytes);
        tracker.consume(self.bytes);
        *guard = Arc::clone(tracker);
    }
}

impl Drop for ChunkAccounting {
    fn drop(&mut self) {
        let guard = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
        guard.release(self.bytes);
    }
}

fn chunk_bytes_i64(batch: &RecordBatch) -> i64 {
    i64::try_from(record_batch_bytes(batch)).unwrap_or(i64::MAX)
}
