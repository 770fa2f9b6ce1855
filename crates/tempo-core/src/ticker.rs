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

//! Cooperative tickers: drain queued tasks and report the next interval.
//!
//! A ticker never sleeps and never spawns a thread. The host loop owns the
//! cadence and is expected to alternate `sleep(ticker.interval())` and
//! `ticker.tick()`. The variants differ only in how they compute the
//! reported interval:
//!
//! - fixed: a constant interval, always;
//! - drift-compensating: shortens the next interval by the execution time
//!   consumed by previous ticks;
//! - scaled: multiplies the base interval by an externally driven delay
//!   percentage;
//! - auto-scaled: a feedback controller that raises the delay when drains
//!   overrun the interval and gradually relaxes it when stable, with a
//!   cooldown window after each adjustment to prevent oscillation.

use crate::task::{log_sink, run_isolated, FailureSink, TaskBatch};
use crate::timer::Stopwatch;
use std::time::Duration;

/// A unit of deferred work executed on the next [`Ticker::tick`].
pub type TickTask = Box<dyn FnOnce() + Send + 'static>;

/// Tuning for the auto-scaling feedback controller.
#[derive(Debug, Clone)]
pub struct AutoScaleConfig {
    /// Percentage points removed from the delay per stable adjustment.
    pub decrease_step: f64,
    /// Number of ticks after an adjustment during which no further
    /// adjustment is made.
    pub cooldown_ticks: u32,
}

impl Default for AutoScaleConfig {
    fn default() -> Self {
        Self {
            decrease_step: 1.0,
            cooldown_ticks: 4,
        }
    }
}

/// Percentage-scaled interval state shared by the scaled and auto-scaled
/// variants.
#[derive(Debug, Clone)]
struct Scale {
    delay_percent: f64,
    current: Duration,
}

impl Scale {
    fn new(base: Duration) -> Self {
        Self {
            delay_percent: 0.0,
            current: base,
        }
    }

    /// Sets the delay percentage and recomputes the scaled interval.
    /// 0 is nominal speed; positive percentages slow the tick down.
    fn update(&mut self, base: Duration, percent: f64) {
        self.delay_percent = percent;
        let scaled_ms = (base.as_millis() as f64 * (1.0 + percent / 100.0)).round();
        self.current = Duration::from_millis(scaled_ms.max(0.0) as u64);
    }
}

/// How a ticker computes its next reported interval, with the state each
/// strategy needs.
enum Pacing {
    Fixed,
    DriftCompensating {
        strict_to_minus: bool,
        overrun: Duration,
    },
    Scaled(Scale),
    AutoScaled {
        scale: Scale,
        config: AutoScaleConfig,
        cooldown_remaining: i64,
    },
}

/// A cooperative ticker: queued tasks, a failure sink, and a pacing
/// strategy.
///
/// Not safe to share across threads; the host must serialize all calls on
/// one instance.
pub struct Ticker {
    base_interval: Duration,
    pending: Vec<TickTask>,
    sink: FailureSink,
    pacing: Pacing,
}

impl Ticker {
    fn with_pacing(base_interval: Duration, pacing: Pacing) -> Self {
        Self {
            base_interval,
            pending: Vec::new(),
            sink: log_sink(),
            pacing,
        }
    }

    /// Creates a ticker that always reports `interval`.
    pub fn fixed(interval: Duration) -> Self {
        Self::with_pacing(interval, Pacing::Fixed)
    }

    /// Creates a ticker that shortens the next interval by accumulated
    /// execution overrun.
    ///
    /// With `strict_to_minus` the full execution time of every tick is
    /// carried, so the long-run average interval is preserved even under
    /// sustained overload. Without it the carry is capped at one base
    /// interval per tick, which prevents runaway catch-up bursts after a
    /// long stall.
    pub fn drift_compensating(interval: Duration, strict_to_minus: bool) -> Self {
        Self::with_pacing(
            interval,
            Pacing::DriftCompensating {
                strict_to_minus,
                overrun: Duration::ZERO,
            },
        )
    }

    /// Creates a ticker whose interval is scaled by an externally driven
    /// delay percentage (see [`Ticker::update_delay`]).
    pub fn scaled(interval: Duration) -> Self {
        Self::with_pacing(interval, Pacing::Scaled(Scale::new(interval)))
    }

    /// Creates a ticker that adjusts its own delay percentage from measured
    /// drain times.
    pub fn auto_scaled(interval: Duration, config: AutoScaleConfig) -> Self {
        Self::with_pacing(
            interval,
            Pacing::AutoScaled {
                scale: Scale::new(interval),
                config,
                cooldown_remaining: 0,
            },
        )
    }

    /// Queues a task for the next [`Ticker::tick`]. Unbounded.
    pub fn add_task(&mut self, task: impl FnOnce() + Send + 'static) {
        self.pending.push(Box::new(task));
    }

    /// Replaces the sink that caught task failures are reported to.
    pub fn set_failure_sink(&mut self, sink: FailureSink) {
        self.sink = sink;
    }

    /// Returns the configured base interval, before any compensation or
    /// scaling.
    pub fn base_interval(&self) -> Duration {
        self.base_interval
    }

    /// Returns the duration the host should wait before the next tick.
    /// Zero means "fire again immediately".
    pub fn interval(&self) -> Duration {
        match &self.pacing {
            Pacing::Fixed => self.base_interval,
            Pacing::DriftCompensating { overrun, .. } => {
                self.base_interval.saturating_sub(*overrun)
            }
            Pacing::Scaled(scale) | Pacing::AutoScaled { scale, .. } => scale.current,
        }
    }

    /// Returns the execution overrun not yet paid back against future
    /// intervals. Zero for variants that do not track drift.
    pub fn overrun(&self) -> Duration {
        match &self.pacing {
            Pacing::DriftCompensating { overrun, .. } => *overrun,
            _ => Duration::ZERO,
        }
    }

    /// Returns the current delay percentage. Zero for variants without
    /// scaling state.
    pub fn current_delay(&self) -> f64 {
        match &self.pacing {
            Pacing::Scaled(scale) | Pacing::AutoScaled { scale, .. } => scale.delay_percent,
            _ => 0.0,
        }
    }

    /// Sets the delay percentage on a scaled or auto-scaled ticker and
    /// recomputes its interval. 0 is nominal speed; positive is slower.
    ///
    /// Ignored (with a warning) on variants without scaling state.
    pub fn update_delay(&mut self, percent: f64) {
        let base = self.base_interval;
        match &mut self.pacing {
            Pacing::Scaled(scale) | Pacing::AutoScaled { scale, .. } => {
                scale.update(base, percent);
            }
            _ => log::warn!("update_delay({percent}) ignored: ticker has no scaling state"),
        }
    }

    /// Drains the tasks queued since the last tick and updates pacing state.
    pub fn tick(&mut self) {
        match &self.pacing {
            Pacing::Fixed | Pacing::Scaled(_) => self.drain_pending(),
            Pacing::DriftCompensating { .. } => self.tick_drift(),
            Pacing::AutoScaled { .. } => self.tick_auto(),
        }
    }

    fn drain_pending(&mut self) {
        let mut batch = TaskBatch::new(std::mem::take(&mut self.pending));
        batch.drain(&self.sink, run_isolated);
    }

    fn tick_drift(&mut self) {
        let base = self.base_interval;
        // One interval's worth of debt is forgiven per call: a held-over
        // tick consumes one window.
        if let Pacing::DriftCompensating { overrun, .. } = &mut self.pacing {
            *overrun = overrun.saturating_sub(base);
        }
        let watch = Stopwatch::new();
        self.drain_pending();
        let elapsed = watch.elapsed();
        if let Pacing::DriftCompensating {
            strict_to_minus,
            overrun,
        } = &mut self.pacing
        {
            *overrun += if *strict_to_minus {
                elapsed
            } else {
                elapsed.min(base)
            };
        }
    }

    fn tick_auto(&mut self) {
        let base = self.base_interval;
        let watch = Stopwatch::new();
        self.drain_pending();
        let elapsed = watch.elapsed();
        if let Pacing::AutoScaled {
            scale,
            config,
            cooldown_remaining,
        } = &mut self.pacing
        {
            *cooldown_remaining -= 1;
            if *cooldown_remaining >= 0 {
                // Cooling: a recent adjustment is still being held.
                return;
            }
            if elapsed > scale.current {
                // Falling behind: jump the delay up in one shot.
                let overrun_interval = scale.current;
                let base_ms = base.as_millis() as f64;
                let raise = (elapsed.as_millis() as f64 - base_ms) / base_ms * 100.0;
                let next = scale.delay_percent + raise;
                scale.update(base, next);
                *cooldown_remaining = i64::from(config.cooldown_ticks);
                log::debug!(
                    "auto-scale: drain took {elapsed:?} (> {overrun_interval:?}), delay now {:.1}%",
                    scale.delay_percent
                );
            } else if scale.delay_percent > 0.0 {
                // Healthy with slack: relax gradually.
                let next = (scale.delay_percent - config.decrease_step).max(0.0);
                scale.update(base, next);
                *cooldown_remaining = i64::from(config.cooldown_ticks);
                log::trace!("auto-scale: stable, delay now {:.1}%", scale.delay_percent);
            }
            // At zero delay and on time: no change, and no cooldown reset,
            // so the controller can react on the very next tick.
        }
    }
}
