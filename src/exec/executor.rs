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

use crate::context::Context;
use crate::error::{LeaseError, Result};
use crate::exec::backoff::{BackoffSettings, ExponentialBackoff};
use log::{info, warn};
use std::fmt;
use std::time::Instant;

/// Verdict of an [`ErrorChecker`] about one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// The checker has no opinion; the next checker is asked.
    Unknown,
    Retryable,
    Permanent,
}

pub type ErrorChecker = fn(&LeaseError) -> ErrorType;

/// Treats cancellation as permanent and has no opinion on anything else.
pub fn check_request_canceled(err: &LeaseError) -> ErrorType {
    if err.is_request_canceled() {
        ErrorType::Permanent
    } else {
        ErrorType::Unknown
    }
}

/// What an executor is retrying, for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableResource {
    pub kind: String,
    pub name: String,
}

impl ExecutableResource {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ExecutableResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Retries an operation with exponential backoff.
///
/// Each failure is passed through the checkers in order; the first verdict
/// other than [`ErrorType::Unknown`] wins. A failure nobody classifies is
/// permanent.
#[derive(Debug, Clone)]
pub struct BackoffExecutor {
    resource: ExecutableResource,
    settings: BackoffSettings,
    checks: Vec<ErrorChecker>,
}

impl BackoffExecutor {
    pub fn new(
        resource: ExecutableResource,
        settings: BackoffSettings,
        checks: Vec<ErrorChecker>,
    ) -> Self {
        Self {
            resource,
            settings,
            checks,
        }
    }

    pub fn settings(&self) -> &BackoffSettings {
        &self.settings
    }

    pub fn classify(&self, err: &LeaseError) -> ErrorType {
        self.checks
            .iter()
            .map(|check| check(err))
            .find(|verdict| *verdict != ErrorType::Unknown)
            .unwrap_or(ErrorType::Permanent)
    }

    pub fn execute<T, F>(&self, ctx: &Context, mut op: F) -> Result<T>
    where
        F: FnMut(&Context) -> Result<T>,
    {
        let start = Instant::now();
        let mut backoff = ExponentialBackoff::new(&self.settings);
        let mut attempts: u32 = 0;
        let resource = &self.resource;

        loop {
            attempts = attempts.saturating_add(1);
            let err = match op(ctx) {
                Ok(value) => {
                    if attempts > 1 {
                        info!(
                            "Request to {resource} succeeded after {} retries in {:.3}s",
                            attempts - 1,
                            start.elapsed().as_secs_f64()
                        );
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !self.settings.enabled || self.classify(&err) != ErrorType::Retryable {
                return Err(err);
            }

            if self.settings.max_attempts > 0 && attempts >= self.settings.max_attempts {
                warn!("Giving up on {resource} after {attempts} attempts: {err}");
                return Err(err);
            }

            let elapsed = start.elapsed();
            let limit = self.settings.max_elapsed_time();
            if !self.settings.blocking && !limit.is_zero() && elapsed > limit {
                warn!(
                    "Crossed max elapsed time on {resource} after {} retries in {:.3}s: {err}",
                    attempts - 1,
                    elapsed.as_secs_f64()
                );
                return Err(LeaseError::MaxElapsedTime {
                    limit,
                    elapsed,
                    source: Box::new(err),
                });
            }

            let delay = backoff.next_delay();
            warn!(
                "Retrying {resource} in {:.3}s after error: {err}",
                delay.as_secs_f64()
            );
            ctx.sleep(delay)?;
        }
    }
}
