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
use crate::scalar_join_config::config as scalar_join_app_config;

pub(crate) fn chunk_size() -> usize {
    scalar_join_app_config()
        .ok()
        .map(|c| c.runtime.chunk_size)
        .filter(|v| *v > 0)
        .unwrap_or(4096)
}

pub(crate) fn debug_join_stats() -> bool {
    scalar_join_app_config()
        .ok()
        .map(|c| c.debug.join_stats)
        .unwrap_or(false)
}
