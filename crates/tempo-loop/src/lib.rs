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

//! # Tempo Loop
//!
//! Asynchronous counterpart to the cooperative tickers in `tempo-core`: a
//! task looper that drains deferred work on its own dedicated thread, with
//! FIFO ordering, per-task failure isolation, and forced or graceful
//! shutdown.

#![warn(missing_docs)]

pub mod error;
pub mod runner;

pub use error::{LooperError, LooperResult};
pub use runner::{BackgroundTaskRunner, LooperTask, RunnerConfig, TaskLooper};
