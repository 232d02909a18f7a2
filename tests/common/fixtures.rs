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

/// Shared fixtures for integration tests
use leasehold::exec::BackoffSettings;
use leasehold::lock::LockSettings;
use leasehold::token::TokenSource;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock settings retrying every millisecond, at most `max_attempts` times
/// (0 keeps retrying until the context ends).
pub fn quick_lock_settings(max_attempts: u32) -> LockSettings {
    LockSettings {
        backoff: BackoffSettings {
            initial_interval_ms: 1,
            randomization_factor: 0.0,
            multiplier: 1.0,
            max_interval_ms: 1,
            max_attempts,
            ..BackoffSettings::default()
        },
        ..LockSettings::default()
    }
}

/// Predictable `<prefix>-<n>` tokens
pub struct CountingTokens {
    prefix: &'static str,
    next: AtomicUsize,
}

impl CountingTokens {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicUsize::new(1),
        }
    }
}

impl TokenSource for CountingTokens {
    fn new_token(&self) -> String {
        format!("{}-{}", self.prefix, self.next.fetch_add(1, Ordering::SeqCst))
    }
}
