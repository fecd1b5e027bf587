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
//! Single-row hash join operator module exports.
//!
//! Responsibilities:
//! - Registers the scalar-subquery join operator, its hash index and probe-key evaluation.
//! - Exposes the factory and parameter types used to wire the operator into a pipeline.
//!
//! Current limitations:
//! - Only the probe side runs here; the hash index is built upstream and received once.

mod join_batch;
mod join_conditions;
pub mod join_hash_map;
mod single_join_operator;

pub use crate::exec::pipeline::receiver::JoinSide;
pub use join_conditions::JoinCondition;
pub use join_hash_map::{
    JoinHashIndex, JoinHashMap, JoinHashMapBuilder, ProbeMatch, UNIT_LIMIT, build_join_hash_map,
};
pub use single_join_operator::{
    JoinPhase, OutputColumn, SingleJoinOperator, SingleJoinOperatorFactory, SingleJoinParam,
    SingleJoinStats,
};
