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
//! Common utilities and helpers for integration tests.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use tempfile::TempDir;

use scalar_join::common::ids::SlotId;
use scalar_join::exec::chunk::{Chunk, field_with_slot_id};
use scalar_join::exec::expr::{ExprArena, ExprId, ExprNode};
use scalar_join::exec::operators::singlejoin::{JoinHashIndex, build_join_hash_map};
use scalar_join::exec::pipeline::operator::PullOperator;
use scalar_join::exec::pipeline::receiver::QueueReceiver;
use scalar_join::runtime::runtime_state::RuntimeState;
use scalar_join::{
    ExecError, JoinCondition, JoinSide, OutputColumn, SingleJoinOperator,
    SingleJoinOperatorFactory, SingleJoinParam, scalar_join_config, scalar_join_logging,
};

/// Probe input: one nullable Int64 key column.
pub const PROBE_KEY_SLOT: SlotId = SlotId(1);
/// Build input: Int64 key column followed by a Utf8 payload column.
pub const BUILD_KEY_SLOT: SlotId = SlotId(2);
pub const BUILD_NAME_SLOT: SlotId = SlotId(3);

/// Test configuration for integration tests.
pub struct TestConfig {
    /// Temporary directory for test artifacts
    pub temp_dir: TempDir,
    /// Test config path
    pub config_path: PathBuf,
}

impl TestConfig {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let config_path = temp_dir.path().join("test_scalar_join.toml");

        let config_content = r#"
log_level = "debug"

[runtime]
chunk_size = 4

[debug]
join_stats = true
"#;

        std::fs::write(&config_path, config_content)?;

        Ok(Self {
            temp_dir,
            config_path,
        })
    }

    pub fn init_logging(&self) {
        scalar_join_logging::init_with_level("debug");
    }

    pub fn load_config(&self) -> anyhow::Result<&'static scalar_join_config::ScalarJoinConfig> {
        scalar_join_config::init_from_path(&self.config_path)
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self::new().expect("Failed to create test config")
    }
}

pub fn probe_chunk(keys: Vec<Option<i64>>) -> Chunk {
    let schema = Arc::new(Schema::new(vec![field_with_slot_id(
        Field::new("p_key", DataType::Int64, true),
        PROBE_KEY_SLOT,
    )]));
    let batch = RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(keys))])
        .expect("probe batch");
    Chunk::try_new(batch).expect("probe chunk")
}

/// Probe input whose key column is Float64 instead of Int64.
pub fn float_probe_chunk(keys: Vec<Option<f64>>) -> Chunk {
    let schema = Arc::new(Schema::new(vec![field_with_slot_id(
        Field::new("p_key", DataType::Float64, true),
        PROBE_KEY_SLOT,
    )]));
    let batch = RecordBatch::try_new(schema, vec![Arc::new(Float64Array::from(keys))])
        .expect("probe batch");
    Chunk::try_new(batch).expect("probe chunk")
}

pub fn build_chunk(rows: Vec<(Option<i64>, &str)>) -> Chunk {
    let schema = Arc::new(Schema::new(vec![
        field_with_slot_id(Field::new("b_key", DataType::Int64, true), BUILD_KEY_SLOT),
        field_with_slot_id(Field::new("b_name", DataType::Utf8, true), BUILD_NAME_SLOT),
    ]));
    let keys: Vec<Option<i64>> = rows.iter().map(|(k, _)| *k).collect();
    let names: Vec<&str> = rows.iter().map(|(_, n)| *n).collect();
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(keys)) as ArrayRef,
            Arc::new(StringArray::from(names)) as ArrayRef,
        ],
    )
    .expect("build batch");
    Chunk::try_new(batch).expect("build chunk")
}

/// Split `rows` into build chunks of `chunk_size` rows; only the last may be short.
pub fn build_chunks(rows: Vec<(Option<i64>, &str)>, chunk_size: usize) -> Vec<Chunk> {
    rows.chunks(chunk_size)
        .map(|part| build_chunk(part.to_vec()))
        .collect()
}

/// Join on `probe.p_key = build.b_key`, emitting `(p_key, b_name)`.
pub struct JoinSetup {
    pub arena: ExprArena,
    pub probe_key: ExprId,
    pub build_key: ExprId,
}

impl JoinSetup {
    pub fn new() -> Self {
        let mut arena = ExprArena::default();
        let probe_key = arena.push(ExprNode::SlotId(PROBE_KEY_SLOT));
        let build_key = arena.push(ExprNode::SlotId(BUILD_KEY_SLOT));
        Self {
            arena,
            probe_key,
            build_key,
        }
    }

    pub fn param(self, hash_on_pk: bool, other_predicate: Option<ExprId>) -> SingleJoinParam {
        SingleJoinParam {
            node_id: 7,
            arena: Arc::new(self.arena),
            conditions: vec![JoinCondition {
                probe: self.probe_key,
                build: self.build_key,
            }],
            other_predicate,
            output_columns: vec![
                OutputColumn {
                    side: JoinSide::Probe,
                    pos: 0,
                    data_type: DataType::Int64,
                    slot_id: SlotId(10),
                    name: "p_key".to_string(),
                },
                OutputColumn {
                    side: JoinSide::Build,
                    pos: 1,
                    data_type: DataType::Utf8,
                    slot_id: SlotId(11),
                    name: "b_name".to_string(),
                },
            ],
            hash_on_pk,
        }
    }
}

pub fn build_index(
    param: &SingleJoinParam,
    chunks: &[Chunk],
    chunk_size: usize,
) -> Option<Arc<dyn JoinHashIndex>> {
    build_join_hash_map(
        &param.arena,
        &param.build_exprs(),
        chunks,
        param.hash_on_pk,
        chunk_size,
    )
    .expect("build hash map")
    .map(|map| Arc::new(map) as Arc<dyn JoinHashIndex>)
}

/// Queue the build side (index first, then chunks) and the probe chunks.
pub fn feed(
    queue: &QueueReceiver,
    index: Option<Arc<dyn JoinHashIndex>>,
    build: Vec<Chunk>,
    probe: Vec<Chunk>,
) {
    if let Some(index) = index {
        queue.push_hash_map(index);
    }
    for chunk in build {
        queue.push_chunk(JoinSide::Build, chunk);
    }
    for chunk in probe {
        queue.push_chunk(JoinSide::Probe, chunk);
    }
}

pub fn new_operator(param: SingleJoinParam, queue: &QueueReceiver) -> SingleJoinOperator {
    let factory = SingleJoinOperatorFactory::new(param);
    factory.create_operator(0, Box::new(queue.clone()))
}

/// Call the operator until it stops, collecting every produced chunk.
pub fn drain(op: &mut SingleJoinOperator, state: &RuntimeState) -> Result<Vec<Chunk>, ExecError> {
    let mut out = Vec::new();
    loop {
        let result = op.call(state)?;
        if result.is_stop() {
            return Ok(out);
        }
        if let Some(chunk) = result.chunk {
            out.push(chunk);
        }
    }
}

/// Full join run: index built from `build_rows`, then every probe chunk streamed through.
pub fn run_join(
    param: SingleJoinParam,
    build_rows: Vec<(Option<i64>, &str)>,
    probe: Vec<Chunk>,
    chunk_size: usize,
) -> Result<Vec<Chunk>, ExecError> {
    let build = build_chunks(build_rows, chunk_size);
    let index = build_index(&param, &build, chunk_size);
    let queue = QueueReceiver::new();
    feed(&queue, index, build, probe);
    let state = RuntimeState::default().with_chunk_size(chunk_size);
    let mut op = new_operator(param, &queue);
    op.prepare(&state)?;
    let out = drain(&mut op, &state);
    op.close()?;
    out
}

pub fn probe_keys(chunk: &Chunk) -> Vec<Option<i64>> {
    chunk.columns()[0]
        .as_any()
        .downcast_ref::<Int64Array>()
        .expect("int64 probe column")
        .iter()
        .collect()
}

pub fn names(chunk: &Chunk) -> Vec<Option<String>> {
    chunk.columns()[1]
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("utf8 build column")
        .iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

/// Assert that a result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// Assert that a result is Err.
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        match $result {
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => e,
        }
    };
}
