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

//! # Tempo Core
//!
//! Tick pacing primitives for loop-driven programs (game servers and other
//! hosts that run periodic work at a controllable cadence). Provides the
//! ticker family (fixed, drift-compensating, percentage-scaled, and
//! feedback-auto-scaled interval computation), batch draining with per-task
//! failure isolation, and small helpers callers use alongside a ticker.
//!
//! Tickers are cooperative: the host loop owns the sleep and calls `tick()`
//! itself. Nothing in this crate spawns a thread.

#![warn(missing_docs)]

pub mod flags;
pub mod task;
pub mod ticker;
pub mod timer;

pub use flags::BitFlags;
pub use task::{log_sink, run_isolated, FailureSink, TaskBatch, TaskFailure};
pub use ticker::{AutoScaleConfig, TickTask, Ticker};
pub use timer::Stopwatch;
