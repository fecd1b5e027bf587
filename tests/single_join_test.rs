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
//! Integration tests for the single-row hash join operator.

use std::sync::Arc;

use arrow::datatypes::DataType;
use scalar_join::exec::chunk::Chunk;
use scalar_join::exec::expr::{ExprNode, LiteralValue};
use scalar_join::exec::operators::singlejoin::{JoinHashIndex, JoinPhase, build_join_hash_map};
use scalar_join::exec::pipeline::operator::PullOperator;
use scalar_join::exec::pipeline::receiver::QueueReceiver;
use scalar_join::runtime::mem_tracker::MemTracker;
use scalar_join::runtime::runtime_state::RuntimeState;
use scalar_join::{ExecError, ExecErrorKind, JoinSide};

use crate::common::{
    BUILD_KEY_SLOT, BUILD_NAME_SLOT, JoinSetup, PROBE_KEY_SLOT, build_chunk, build_chunks,
    build_index, drain, feed, float_probe_chunk, names, new_operator, probe_chunk, probe_keys,
    run_join,
};

mod common;

fn s(v: &str) -> Option<String> {
    Some(v.to_string())
}

/// `b_name = <literal>` as the extra predicate.
fn name_equals(setup: &mut JoinSetup, literal: LiteralValue) -> scalar_join::exec::expr::ExprId {
    let name = setup.arena.push(ExprNode::SlotId(BUILD_NAME_SLOT));
    let lit = setup.arena.push(ExprNode::Literal(literal));
    setup.arena.push(ExprNode::Eq(name, lit))
}

#[test]
fn test_primary_key_match_and_miss() {
    let param = JoinSetup::new().param(true, None);
    let out = run_join(
        param,
        vec![(Some(5), "A"), (Some(6), "B")],
        vec![probe_chunk(vec![Some(5), Some(7)])],
        4,
    )
    .expect("join");
    assert_eq!(out.len(), 1);
    assert_eq!(probe_keys(&out[0]), vec![Some(5), Some(7)]);
    assert_eq!(names(&out[0]), vec![s("A"), None]);
}

#[test]
fn test_null_probe_key_never_matches() {
    let param = JoinSetup::new().param(false, None);
    let out = run_join(
        param,
        vec![(None, "null-key"), (Some(1), "one")],
        vec![probe_chunk(vec![None, Some(1)])],
        4,
    )
    .expect("join");
    assert_eq!(probe_keys(&out[0]), vec![None, Some(1)]);
    assert_eq!(names(&out[0]), vec![None, s("one")]);
}

#[test]
fn test_duplicate_key_without_predicate_is_cardinality_violation() {
    let param = JoinSetup::new().param(false, None);
    let err = run_join(
        param,
        vec![(Some(1), "x"), (Some(1), "y")],
        vec![probe_chunk(vec![Some(1)])],
        4,
    )
    .expect_err("cardinality violation");
    assert_eq!(err.kind, ExecErrorKind::CardinalityViolation);
    assert_eq!(err.message, "scalar subquery returns more than 1 row");
    assert!(err.is_fatal());
}

#[test]
fn test_duplicate_key_is_fine_when_no_probe_row_hits_it() {
    let param = JoinSetup::new().param(false, None);
    let out = run_join(
        param,
        vec![(Some(1), "x"), (Some(1), "y"), (Some(2), "z")],
        vec![probe_chunk(vec![Some(2), Some(3)])],
        4,
    )
    .expect("join");
    assert_eq!(names(&out[0]), vec![s("z"), None]);
}

#[test]
fn test_predicate_selects_single_candidate() {
    let mut setup = JoinSetup::new();
    let pred = name_equals(&mut setup, LiteralValue::Utf8("y".to_string()));
    let param = setup.param(false, Some(pred));
    let out = run_join(
        param,
        vec![(Some(1), "x"), (Some(1), "y"), (Some(2), "z")],
        vec![probe_chunk(vec![Some(1), Some(2), Some(3)])],
        4,
    )
    .expect("join");
    assert_eq!(probe_keys(&out[0]), vec![Some(1), Some(2), Some(3)]);
    assert_eq!(names(&out[0]), vec![s("y"), None, None]);
}

#[test]
fn test_predicate_false_for_every_candidate_is_null() {
    let mut setup = JoinSetup::new();
    let pred = name_equals(&mut setup, LiteralValue::Utf8("C".to_string()));
    let param = setup.param(false, Some(pred));
    let out = run_join(
        param,
        vec![(Some(5), "A"), (Some(5), "B")],
        vec![probe_chunk(vec![Some(5)])],
        4,
    )
    .expect("join");
    assert_eq!(probe_keys(&out[0]), vec![Some(5)]);
    assert_eq!(names(&out[0]), vec![None]);
}

#[test]
fn test_predicate_matching_two_candidates_is_cardinality_violation() {
    let mut setup = JoinSetup::new();
    let name = setup.arena.push(ExprNode::SlotId(BUILD_NAME_SLOT));
    let pred = setup.arena.push(ExprNode::IsNotNull(name));
    let param = setup.param(false, Some(pred));
    let err = run_join(
        param,
        vec![(Some(1), "x"), (Some(1), "y")],
        vec![probe_chunk(vec![Some(1)])],
        4,
    )
    .expect_err("cardinality violation");
    assert_eq!(err.kind, ExecErrorKind::CardinalityViolation);
}

#[test]
fn test_null_predicate_counts_as_false() {
    let mut setup = JoinSetup::new();
    let pred = name_equals(&mut setup, LiteralValue::Null);
    let param = setup.param(true, Some(pred));
    let out = run_join(
        param,
        vec![(Some(5), "A")],
        vec![probe_chunk(vec![Some(5)])],
        4,
    )
    .expect("join");
    assert_eq!(names(&out[0]), vec![None]);
}

#[test]
fn test_primary_key_predicate_filters_match() {
    let mut setup = JoinSetup::new();
    let pred = name_equals(&mut setup, LiteralValue::Utf8("B".to_string()));
    let param = setup.param(true, Some(pred));
    let out = run_join(
        param,
        vec![(Some(5), "A"), (Some(6), "B")],
        vec![probe_chunk(vec![Some(5), Some(6)])],
        4,
    )
    .expect("join");
    assert_eq!(names(&out[0]), vec![None, s("B")]);
}

#[test]
fn test_empty_build_side_fills_nulls() {
    let param = JoinSetup::new().param(true, None);
    let out = run_join(
        param,
        vec![],
        vec![
            probe_chunk(vec![Some(1), None, Some(3)]),
            probe_chunk(vec![Some(4)]),
        ],
        4,
    )
    .expect("join");
    assert_eq!(out.len(), 2);
    assert_eq!(probe_keys(&out[0]), vec![Some(1), None, Some(3)]);
    assert_eq!(names(&out[0]), vec![None, None, None]);
    assert_eq!(names(&out[1]), vec![None]);
}

#[test]
fn test_last_marker_passes_through_and_empty_chunks_are_skipped() {
    let param = JoinSetup::new().param(true, None);
    let empty = probe_chunk(vec![]);
    let out = run_join(
        param,
        vec![(Some(1), "one")],
        vec![
            probe_chunk(vec![Some(1)]),
            Chunk::new_last_marker(),
            empty,
            probe_chunk(vec![Some(2)]),
        ],
        4,
    )
    .expect("join");
    assert_eq!(out.len(), 3);
    assert_eq!(names(&out[0]), vec![s("one")]);
    assert!(out[1].is_last());
    assert!(out[1].is_empty());
    assert!(!out[2].is_last());
    assert_eq!(names(&out[2]), vec![None]);
}

#[test]
fn test_probe_spanning_several_units_and_build_chunks() {
    let chunk_size = 300;
    let labels: Vec<String> = (0..600).map(|i| format!("n{}", i)).collect();
    let build_rows = labels
        .iter()
        .enumerate()
        .map(|(i, label)| (Some(i as i64), label.as_str()))
        .collect();
    let probe: Vec<Option<i64>> = (0..700).rev().map(Some).collect();

    let param = JoinSetup::new().param(true, None);
    let out = run_join(param, build_rows, vec![probe_chunk(probe.clone())], chunk_size)
        .expect("join");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].len(), 700);
    assert_eq!(probe_keys(&out[0]), probe);
    let got = names(&out[0]);
    for (row, key) in probe.iter().enumerate() {
        let key = key.expect("non-null key");
        let expected = (key < 600).then(|| format!("n{}", key));
        assert_eq!(got[row], expected, "row {} key {}", row, key);
    }
}

#[test]
fn test_end_is_idempotent() {
    let param = JoinSetup::new().param(true, None);
    let build = build_chunks(vec![(Some(1), "one")], 4);
    let index = build_index(&param, &build, 4);
    let queue = QueueReceiver::new();
    feed(&queue, index, build, vec![probe_chunk(vec![Some(1)])]);
    let state = RuntimeState::default().with_chunk_size(4);
    let mut op = new_operator(param, &queue);

    let out = drain(&mut op, &state).expect("drain");
    assert_eq!(out.len(), 1);
    assert_eq!(op.phase(), JoinPhase::End);
    let pulls = queue.pulls(JoinSide::Probe);
    for _ in 0..3 {
        let result = op.call(&state).expect("call after end");
        assert!(result.is_stop());
        assert!(result.chunk.is_none());
    }
    assert_eq!(queue.pulls(JoinSide::Probe), pulls);
    assert_eq!(op.stats().input_rows, 1);
    assert_eq!(op.stats().output_rows, 1);
    assert_eq!(op.stats().matched_rows, 1);
    op.close().expect("close");
}

#[test]
fn test_cancellation_is_checked_before_pulling() {
    let param = JoinSetup::new().param(true, None);
    let build = build_chunks(vec![(Some(1), "one")], 4);
    let index = build_index(&param, &build, 4);
    let queue = QueueReceiver::new();
    feed(&queue, index, build, vec![probe_chunk(vec![Some(1)])]);
    let state = RuntimeState::default().with_chunk_size(4);
    state.cancel();

    let mut op = new_operator(param, &queue);
    let err = op.call(&state).expect_err("cancelled");
    assert!(err.is_cancelled());
    assert!(!err.is_fatal());
    assert_eq!(queue.pulls(JoinSide::Build), 0);
    assert_eq!(queue.pulls(JoinSide::Probe), 0);
}

#[test]
fn test_cancellation_between_probe_chunks() {
    let param = JoinSetup::new().param(true, None);
    let build = build_chunks(vec![(Some(1), "one")], 4);
    let index = build_index(&param, &build, 4);
    let queue = QueueReceiver::new();
    feed(
        &queue,
        index,
        build,
        vec![probe_chunk(vec![Some(1)]), probe_chunk(vec![Some(2)])],
    );
    let state = RuntimeState::default().with_chunk_size(4);
    let mut op = new_operator(param, &queue);

    let first = op.call(&state).expect("first chunk");
    assert_eq!(first.chunk.map(|c| c.len()), Some(1));
    state.cancel();
    let pulls = queue.pulls(JoinSide::Probe);
    let err = op.call(&state).expect_err("cancelled");
    assert_eq!(err.kind, ExecErrorKind::Cancelled);
    assert_eq!(queue.pulls(JoinSide::Probe), pulls);
    assert_eq!(queue.remaining(JoinSide::Probe), 1);
}

#[test]
fn test_short_non_final_build_chunk_is_rejected() {
    let param = JoinSetup::new().param(true, None);
    let rows = vec![(Some(1), "a"), (Some(2), "b"), (Some(3), "c"), (Some(4), "d"), (Some(5), "e")];
    let index = build_index(&param, &build_chunks(rows.clone(), 4), 4);
    let queue = QueueReceiver::new();
    feed(&queue, index, build_chunks(rows, 2), vec![probe_chunk(vec![Some(1)])]);
    let state = RuntimeState::default().with_chunk_size(4);
    let mut op = new_operator(param, &queue);

    let err = op.call(&state).expect_err("invariant violation");
    assert_eq!(err.kind, ExecErrorKind::InvariantViolation);
    assert!(err.message.contains("expected 4"), "err={}", err);
}

#[test]
fn test_index_chunk_size_must_match_runtime() {
    let param = JoinSetup::new().param(true, None);
    let build = build_chunks(vec![(Some(1), "one")], 8);
    let index = build_index(&param, &build, 8);
    let queue = QueueReceiver::new();
    feed(&queue, index, build, vec![]);
    let state = RuntimeState::default().with_chunk_size(4);
    let mut op = new_operator(param, &queue);

    let err = op.call(&state).expect_err("invariant violation");
    assert_eq!(err.kind, ExecErrorKind::InvariantViolation);
}

#[test]
fn test_build_chunk_before_hash_map_is_rejected() {
    let param = JoinSetup::new().param(true, None);
    let build = build_chunks(vec![(Some(1), "one")], 4);
    let index = build_index(&param, &build, 4).expect("index");
    let queue = QueueReceiver::new();
    queue.push_chunk(JoinSide::Build, build_chunk(vec![(Some(1), "one")]));
    queue.push_hash_map(index);
    let state = RuntimeState::default().with_chunk_size(4);
    let mut op = new_operator(param, &queue);

    let err = op.call(&state).expect_err("invariant violation");
    assert_eq!(err.kind, ExecErrorKind::InvariantViolation);
    assert!(err.message.contains("before the hash map"), "err={}", err);
}

#[test]
fn test_second_hash_map_is_rejected() {
    let param = JoinSetup::new().param(true, None);
    let build = build_chunks(vec![(Some(1), "one")], 4);
    let index = build_index(&param, &build, 4).expect("index");
    let queue = QueueReceiver::new();
    queue.push_hash_map(Arc::clone(&index));
    queue.push_hash_map(index);
    let state = RuntimeState::default().with_chunk_size(4);
    let mut op = new_operator(param, &queue);

    let err = op.call(&state).expect_err("invariant violation");
    assert_eq!(err.kind, ExecErrorKind::InvariantViolation);
}

#[test]
fn test_upstream_errors_propagate_unchanged() {
    let param = JoinSetup::new().param(true, None);
    let queue = QueueReceiver::new();
    queue.push_chunk(JoinSide::Probe, probe_chunk(vec![Some(1)]));
    queue.push_error(JoinSide::Probe, ExecError::failed("probe scan failed"));
    let state = RuntimeState::default().with_chunk_size(4);
    let mut op = new_operator(param, &queue);

    let first = op.call(&state).expect("first chunk");
    assert!(first.chunk.is_some());
    let err = op.call(&state).expect_err("upstream error");
    assert_eq!(err, ExecError::failed("probe scan failed"));

    let build_queue = QueueReceiver::new();
    build_queue.push_error(JoinSide::Build, ExecError::failed("build scan failed"));
    let param = JoinSetup::new().param(true, None);
    let mut op = new_operator(param, &build_queue);
    let err = op.call(&state).expect_err("upstream error");
    assert_eq!(err.message, "build scan failed");
}

#[test]
fn test_duplicate_primary_key_is_rejected_at_build() {
    let param = JoinSetup::new().param(true, None);
    let build = build_chunks(vec![(Some(1), "x"), (Some(1), "y")], 4);
    let err = build_join_hash_map(&param.arena, &param.build_exprs(), &build, true, 4)
        .expect_err("duplicate key");
    assert!(err.contains("duplicate"), "err={}", err);
}

#[test]
fn test_memory_is_released_on_close() {
    let root = MemTracker::new_root("query");
    let state = RuntimeState::default()
        .with_chunk_size(4)
        .with_mem_tracker(Arc::clone(&root));
    let param = JoinSetup::new().param(true, None);
    let build = build_chunks(vec![(Some(1), "one"), (Some(2), "two")], 4);
    let index = build_index(&param, &build, 4);
    let queue = QueueReceiver::new();
    feed(&queue, index, build, vec![probe_chunk(vec![Some(2), Some(3)])]);
    let mut op = new_operator(param, &queue);
    op.prepare(&state).expect("prepare");

    let out = drain(&mut op, &state).expect("drain");
    assert_eq!(names(&out[0]), vec![s("two"), None]);
    assert!(root.current() > 0);
    assert!(op.max_alloc_size() > 0);
    drop(out);
    op.close().expect("close");
    assert_eq!(root.current(), 0);
    assert!(root.peak() > 0);
}

#[test]
fn test_correlated_predicate_sees_each_probe_row() {
    // b_key * 2 = p_key + p_key only holds when the predicate reads the probe row being resolved.
    let chunk_size = 300;
    let mut setup = JoinSetup::new();
    let p_key = setup.arena.push(ExprNode::SlotId(PROBE_KEY_SLOT));
    let b_key = setup.arena.push(ExprNode::SlotId(BUILD_KEY_SLOT));
    let two = setup.arena.push(ExprNode::Literal(LiteralValue::Int64(2)));
    let doubled_build = setup.arena.push(ExprNode::Mul(b_key, two));
    let doubled_probe = setup.arena.push(ExprNode::Add(p_key, p_key));
    let pred = setup.arena.push(ExprNode::Eq(doubled_build, doubled_probe));
    let param = setup.param(false, Some(pred));

    let labels: Vec<String> = (0..600).map(|i| format!("n{}", i)).collect();
    let build_rows = labels
        .iter()
        .enumerate()
        .map(|(i, label)| (Some(i as i64), label.as_str()))
        .collect();
    let probe: Vec<Option<i64>> = (0..600).rev().map(Some).collect();

    let out = run_join(param, build_rows, vec![probe_chunk(probe.clone())], chunk_size)
        .expect("join");
    assert_eq!(out.len(), 1);
    assert_eq!(probe_keys(&out[0]), probe);
    let got = names(&out[0]);
    for (row, key) in probe.iter().enumerate() {
        let key = key.expect("non-null key");
        assert_eq!(got[row], Some(format!("n{}", key)), "row {} key {}", row, key);
    }
}

#[test]
fn test_empty_build_side_with_markers_fills_nulls() {
    let param = JoinSetup::new().param(true, None);
    let queue = QueueReceiver::new();
    queue.push_chunk(JoinSide::Build, Chunk::new_last_marker());
    queue.push_chunk(JoinSide::Build, build_chunk(vec![]));
    queue.push_chunk(JoinSide::Probe, probe_chunk(vec![Some(1), Some(2)]));
    let state = RuntimeState::default().with_chunk_size(4);
    let mut op = new_operator(param, &queue);

    let out = drain(&mut op, &state).expect("drain");
    assert_eq!(out.len(), 1);
    assert_eq!(probe_keys(&out[0]), vec![Some(1), Some(2)]);
    assert_eq!(names(&out[0]), vec![None, None]);
    assert_eq!(op.build_row_count(), 0);
    op.close().expect("close");
}

#[test]
fn test_empty_build_chunks_before_hash_map_are_dropped() {
    let param = JoinSetup::new().param(true, None);
    let build = build_chunks(vec![(Some(1), "one")], 4);
    let index = build_index(&param, &build, 4);
    let queue = QueueReceiver::new();
    queue.push_chunk(JoinSide::Build, Chunk::new_last_marker());
    feed(&queue, index, build, vec![probe_chunk(vec![Some(1), Some(2)])]);
    let state = RuntimeState::default().with_chunk_size(4);
    let mut op = new_operator(param, &queue);

    let out = drain(&mut op, &state).expect("drain");
    assert_eq!(names(&out[0]), vec![s("one"), None]);
    op.close().expect("close");
}

#[test]
fn test_float_probe_keys_only_match_integral_values() {
    let mut param = JoinSetup::new().param(true, None);
    param.output_columns[0].data_type = DataType::Float64;
    let build = build_chunks(vec![(Some(5), "A"), (Some(6), "B")], 4);
    let index = build_index(&param, &build, 4);
    let queue = QueueReceiver::new();
    feed(
        &queue,
        index,
        build,
        vec![float_probe_chunk(vec![Some(5.5), Some(5.9), Some(5.0), Some(6.000001)])],
    );
    let state = RuntimeState::default().with_chunk_size(4);
    let mut op = new_operator(param, &queue);

    let out = drain(&mut op, &state).expect("drain");
    assert_eq!(out.len(), 1);
    assert_eq!(names(&out[0]), vec![None, None, s("A"), None]);
    op.close().expect("close");
}

#[test]
fn test_hash_map_mode_must_match_join() {
    let param = JoinSetup::new().param(true, None);
    let build = build_chunks(vec![(Some(1), "one")], 4);
    let index = build_join_hash_map(&param.arena, &param.build_exprs(), &build, false, 4)
        .expect("build hash map")
        .expect("non-empty map");
    let index: Arc<dyn JoinHashIndex> = Arc::new(index);
    let queue = QueueReceiver::new();
    feed(&queue, Some(index), build, vec![probe_chunk(vec![Some(1)])]);
    let state = RuntimeState::default().with_chunk_size(4);
    let mut op = new_operator(param, &queue);

    let err = op.call(&state).expect_err("invariant violation");
    assert_eq!(err.kind, ExecErrorKind::InvariantViolation);
    assert!(err.message.contains("primary-key mode"), "err={}", err);
}
