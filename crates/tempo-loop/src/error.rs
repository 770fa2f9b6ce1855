// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for task-looper operations.

use std::fmt;

/// A specialized `Result` type for task-looper operations.
pub type LooperResult<T> = Result<T, LooperError>;

/// An error that can occur when submitting work to a task looper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LooperError {
    /// The worker thread has terminated; the looper no longer accepts
    /// tasks.
    ShutDown,
}

impl fmt::Display for LooperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LooperError::ShutDown => write!(f, "Task looper has shut down"),
        }
    }
}

impl std::error::Error for LooperError {}
