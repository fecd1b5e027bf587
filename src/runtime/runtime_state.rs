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
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::common::config;
use crate::runtime::mem_tracker::{self, MemTracker};

/// RuntimeState is a per-fragment-instance execution context.
///
/// It carries the fixed chunk size every operator of the fragment agrees on, the
/// cancellation flag that operators check at the start of each call, and the
/// fragment memory tracker.
#[derive(Debug, Clone)]
pub struct RuntimeState {
    chunk_size: usize,
    cancelled: Arc<AtomicBool>,
    mem_tracker: Option<Arc<MemTracker>>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            chunk_size: config::chunk_size(),
            cancelled: Arc::new(AtomicBool::new(false)),
            mem_tracker: None,
        }
    }
}

impl RuntimeState {
    /// Create a state whose memory tracker hangs off the process tracker.
    pub fn new(fragment_label: impl Into<String>) -> Self {
        let process = mem_tracker::process_mem_tracker();
        Self {
            mem_tracker: Some(MemTracker::new_child(fragment_label, &process)),
            ..Self::default()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_mem_tracker(mut self, tracker: Arc<MemTracker>) -> Self {
        self.mem_tracker = Some(tracker);
        self
    }

    /// Return the row count of every chunk but the last one in a stream.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    /// Request cancellation. Every clone of this state observes the flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn mem_tracker(&self) -> Option<Arc<MemTracker>> {
        self.mem_tracker.clone()
    }
}
