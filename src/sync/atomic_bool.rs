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
use std::sync::atomic::{AtomicBool, Ordering};

/// A boolean that can be read, written and flipped without a mutex.
#[derive(Debug, Default)]
pub struct AtomicBoolean {
    value: AtomicBool,
}

impl AtomicBoolean {
    pub fn new(initial: bool) -> Self {
        Self {
            value: AtomicBool::new(initial),
        }
    }

    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    /// Inverts the value and returns the new one.
    pub fn flip(&self) -> bool {
        let mut current = self.value.load(Ordering::Relaxed);
        loop {
            match self.value.compare_exchange_weak(
                current,
                !current,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return !current,
                Err(actual) => current = actual,
            }
        }
    }

    /// Stores `new` only if the current value is `expected`.
    pub fn compare_and_set(&self, expected: bool, new: bool) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
