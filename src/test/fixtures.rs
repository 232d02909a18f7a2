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

/// Shared fixtures for unit tests
use crate::exec::BackoffSettings;
use crate::token::TokenSource;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Backoff that retries almost immediately with no jitter
pub fn fast_backoff() -> BackoffSettings {
    BackoffSettings {
        initial_interval_ms: 1,
        randomization_factor: 0.0,
        multiplier: 1.0,
        max_interval_ms: 2,
        ..BackoffSettings::default()
    }
}

/// Hands out `<prefix>-1`, `<prefix>-2`, ... so tests can predict tokens
pub struct SequenceTokenSource {
    prefix: String,
    next: AtomicUsize,
}

impl SequenceTokenSource {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: AtomicUsize::new(1),
        }
    }
}

impl TokenSource for SequenceTokenSource {
    fn new_token(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{}-{n}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_tokens() {
        let tokens = SequenceTokenSource::new("token");
        assert_eq!(tokens.new_token(), "token-1");
        assert_eq!(tokens.new_token(), "token-2");
    }

    #[test]
    fn test_fast_backoff_is_valid() {
        assert!(fast_backoff().validate().is_ok());
    }
}
