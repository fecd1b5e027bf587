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
//! Execution status returned by pull operators.
//!
//! Expression, chunk and hash-index helpers report failures as plain `String`s.
//! Operators wrap them into [`ExecError`] so the driver can tell a cancelled
//! fragment from a failed query and from an engine defect.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecErrorKind {
    /// The fragment was cancelled by the caller. Not a query failure.
    Cancelled,
    /// A scalar subquery produced more than one row for an outer row.
    CardinalityViolation,
    /// An engine invariant was broken (e.g. a non-final build chunk of the wrong size).
    InvariantViolation,
    /// Any other error, including those propagated from upstream operators.
    Failed,
}

impl ExecErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecErrorKind::Cancelled => "CANCELLED",
            ExecErrorKind::CardinalityViolation => "CARDINALITY_VIOLATION",
            ExecErrorKind::InvariantViolation => "INTERNAL_ERROR",
            ExecErrorKind::Failed => "RUNTIME_ERROR",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecError {
    pub kind: ExecErrorKind,
    pub message: String,
}

impl ExecError {
    pub fn new(kind: ExecErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ExecErrorKind::Cancelled, message)
    }

    pub fn cardinality_violation(message: impl Into<String>) -> Self {
        Self::new(ExecErrorKind::CardinalityViolation, message)
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(ExecErrorKind::InvariantViolation, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(ExecErrorKind::Failed, message)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ExecErrorKind::Cancelled
    }

    /// Fatal errors must abort the query; they are never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ExecErrorKind::CardinalityViolation | ExecErrorKind::InvariantViolation
        )
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for ExecError {}

impl From<String> for ExecError {
    fn from(message: String) -> Self {
        Self::failed(message)
    }
}
