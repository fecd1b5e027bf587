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
//! Core pull-operator contract.
//!
//! Responsibilities:
//! - Defines the call-driven execution step used by the driver to pull one output chunk.
//! - Defines the `Next`/`Stop` status pair returned together with an optional chunk.
//!
//! Key exported interfaces:
//! - Types: `PullOperator`, `CallResult`, `ExecStatus`.
//!
//! Current limitations:
//! - A single driver owns an operator instance; there is no blocked-reason signaling.
//! - Unsupported states should be surfaced as explicit runtime errors instead of fallback behavior.

use crate::common::status::ExecError;
use crate::exec::chunk::Chunk;
use crate::runtime::mem_tracker::MemTracker;
use crate::runtime::runtime_state::RuntimeState;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecStatus {
    /// The operator may produce more output; call again.
    Next,
    /// The operator's output stream has ended.
    Stop,
}

/// Result of one pull step.
#[derive(Debug)]
pub struct CallResult {
    pub chunk: Option<Chunk>,
    pub status: ExecStatus,
}

impl CallResult {
    pub fn next(chunk: Chunk) -> Self {
        Self {
            chunk: Some(chunk),
            status: ExecStatus::Next,
        }
    }

    pub fn stop() -> Self {
        Self {
            chunk: None,
            status: ExecStatus::Stop,
        }
    }

    pub fn is_stop(&self) -> bool {
        self.status == ExecStatus::Stop
    }
}

/// Base operator contract implemented by pull-driven operators.
pub trait PullOperator: Send {
    fn name(&self) -> &str;

    fn set_mem_tracker(&mut self, tracker: Arc<MemTracker>) {
        let _ = tracker;
    }

    fn prepare(&mut self, state: &RuntimeState) -> Result<(), ExecError> {
        let _ = state;
        Ok(())
    }

    /// Advance the operator by one step.
    ///
    /// After `Stop` has been returned every further call must return `Stop` again.
    fn call(&mut self, state: &RuntimeState) -> Result<CallResult, ExecError>;

    fn close(&mut self) -> Result<(), ExecError> {
        Ok(())
    }
}
