// Copyright 2025 dentsusoken
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

use crate::error::{LeaseError, Result};
use retry::delay::{Exponential, jitter};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy for store operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffSettings {
    /// When disabled, the first failure is returned as is.
    pub enabled: bool,
    /// Keep retrying past `max_elapsed_time_ms`.
    pub blocking: bool,
    pub initial_interval_ms: u64,
    pub randomization_factor: f64,
    pub multiplier: f64,
    pub max_interval_ms: u64,
    pub max_elapsed_time_ms: u64,
    /// Total attempts including the first one. 0 means unlimited.
    pub max_attempts: u32,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            blocking: false,
            initial_interval_ms: 50,
            randomization_factor: 0.5,
            multiplier: 1.5,
            max_interval_ms: 10_000,
            max_elapsed_time_ms: 15 * 60 * 1_000,
            max_attempts: 0,
        }
    }
}

impl BackoffSettings {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub fn max_elapsed_time(&self) -> Duration {
        Duration::from_millis(self.max_elapsed_time_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.randomization_factor) {
            return Err(LeaseError::InvalidConfig(format!(
                "backoff.randomization_factor must be within [0, 1], got {}",
                self.randomization_factor
            )));
        }
        if self.multiplier < 1.0 || !self.multiplier.is_finite() {
            return Err(LeaseError::InvalidConfig(format!(
                "backoff.multiplier must be at least 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max_interval_ms < self.initial_interval_ms {
            return Err(LeaseError::InvalidConfig(format!(
                "backoff.max_interval_ms ({}) must not be below backoff.initial_interval_ms ({})",
                self.max_interval_ms, self.initial_interval_ms
            )));
        }
        Ok(())
    }
}

/// Randomized exponential delay sequence, capped at `max_interval`.
///
/// Each delay is drawn from `[base * (1 - r), base * (1 + r)]` where `r` is
/// the randomization factor.
pub struct ExponentialBackoff {
    initial_ms: u64,
    multiplier: f64,
    randomization: f64,
    cap: Duration,
    delays: Exponential,
}

impl ExponentialBackoff {
    pub fn new(settings: &BackoffSettings) -> Self {
        let multiplier = settings.multiplier.max(1.0);
        Self {
            initial_ms: settings.initial_interval_ms,
            multiplier,
            randomization: settings.randomization_factor.clamp(0.0, 1.0),
            cap: settings.max_interval(),
            delays: Exponential::from_millis_with_factor(settings.initial_interval_ms, multiplier),
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        self.next().unwrap_or(self.cap)
    }

    pub fn reset(&mut self) {
        self.delays = Exponential::from_millis_with_factor(self.initial_ms, self.multiplier);
    }

    fn randomize(&self, base: Duration) -> Duration {
        if self.randomization <= 0.0 {
            return base;
        }
        let spread = base.mul_f64(self.randomization);
        base - spread + jitter(spread * 2)
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let base = self.delays.next()?.min(self.cap);
        Some(self.randomize(base))
    }
}
