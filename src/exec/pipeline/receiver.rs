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
//! Upstream transport for two-input operators.
//!
//! Responsibilities:
//! - Defines the pull contract a join uses to receive probe chunks, build chunks and the
//!   build-side hash index from its producers.
//! - Provides an in-memory queue implementation for local wiring and tests.
//!
//! Key exported interfaces:
//! - Types: `JoinSide`, `Received`, `ChunkReceiver`, `QueueReceiver`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::common::status::ExecError;
use crate::exec::chunk::Chunk;
use crate::exec::operators::singlejoin::join_hash_map::JoinHashIndex;

/// Input channel of a join. The discriminants are the channel indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinSide {
    Probe = 0,
    Build = 1,
}

impl JoinSide {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One message received from an upstream producer.
pub enum Received {
    Chunk(Chunk),
    /// The build-side hash index. Sent at most once, before any build chunk.
    HashMap(Arc<dyn JoinHashIndex>),
}

impl fmt::Debug for Received {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Received::Chunk(chunk) => f
                .debug_struct("Chunk")
                .field("rows", &chunk.len())
                .field("is_last", &chunk.is_last())
                .finish(),
            Received::HashMap(map) => f
                .debug_struct("HashMap")
                .field("size_estimate", &map.size_estimate())
                .finish(),
        }
    }
}

/// Pull contract for the two upstream channels of a join.
///
/// `Ok(None)` marks end-of-stream on that side. Errors reported by the producer are
/// returned as `Err` and must be propagated unchanged.
pub trait ChunkReceiver: Send {
    fn receive(&mut self, side: JoinSide) -> Result<Option<Received>, ExecError>;
}

enum QueuedItem {
    Message(Received),
    Error(ExecError),
}

#[derive(Default)]
struct QueueState {
    sides: [VecDeque<QueuedItem>; 2],
    pulls: [usize; 2],
}

/// In-memory receiver backed by one FIFO per side.
///
/// Cloned handles share the queues, so a caller can keep one handle to inspect
/// pull counts after handing another one to an operator.
#[derive(Clone, Default)]
pub struct QueueReceiver {
    state: Arc<Mutex<QueueState>>,
}

impl QueueReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_chunk(&self, side: JoinSide, chunk: Chunk) {
        self.push(side, QueuedItem::Message(Received::Chunk(chunk)));
    }

    pub fn push_hash_map(&self, map: Arc<dyn JoinHashIndex>) {
        self.push(JoinSide::Build, QueuedItem::Message(Received::HashMap(map)));
    }

    /// Queue an upstream failure; it is returned by the pull that reaches it.
    pub fn push_error(&self, side: JoinSide, err: ExecError) {
        self.push(side, QueuedItem::Error(err));
    }

    /// Number of `receive` calls observed on `side`, including those that hit end-of-stream.
    pub fn pulls(&self, side: JoinSide) -> usize {
        self.lock().pulls[side.index()]
    }

    pub fn remaining(&self, side: JoinSide) -> usize {
        self.lock().sides[side.index()].len()
    }

    fn push(&self, side: JoinSide, item: QueuedItem) {
        self.lock().sides[side.index()].push_back(item);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ChunkReceiver for QueueReceiver {
    fn receive(&mut self, side: JoinSide) -> Result<Option<Received>, ExecError> {
        let mut guard = self.lock();
        guard.pulls[side.index()] += 1;
        match guard.sides[side.index()].pop_front() {
            None => Ok(None),
            Some(QueuedItem::Message(msg)) => Ok(Some(msg)),
            Some(QueuedItem::Error(err)) => Err(err),
        }
    }
}
