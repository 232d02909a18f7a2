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
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

/// A mutex that can be permanently disabled exactly once.
///
/// Once poisoned, every later acquisition fails with
/// [`LeaseError::AlreadyPoisoned`]. Rust's own mutex poisoning (a panic while
/// holding the guard) is ignored here; only [`PoisonedLock::poison`] counts.
#[derive(Debug, Default)]
pub struct PoisonedLock {
    poisoned: Mutex<bool>,
}

/// Proof of holding a [`PoisonedLock`]. Unlocks on drop.
#[derive(Debug)]
pub struct PoisonedLockGuard<'a> {
    poisoned: MutexGuard<'a, bool>,
}

impl PoisonedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the lock is free, then fails if it has been poisoned.
    pub fn lock(&self) -> Result<PoisonedLockGuard<'_>> {
        let guard = self.poisoned.lock().unwrap_or_else(PoisonError::into_inner);
        Self::admit(guard)
    }

    /// Non-blocking variant of [`PoisonedLock::lock`]; `Ok(None)` when busy.
    pub fn try_lock(&self) -> Result<Option<PoisonedLockGuard<'_>>> {
        let guard = match self.poisoned.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(err)) => err.into_inner(),
            Err(TryLockError::WouldBlock) => return Ok(None),
        };
        Self::admit(guard).map(Some)
    }

    /// Poisons the lock, waiting for the current holder first.
    ///
    /// A second call fails with `AlreadyPoisoned` and leaves the lock poisoned.
    pub fn poison(&self) -> Result<()> {
        let mut poisoned = self.poisoned.lock().unwrap_or_else(PoisonError::into_inner);
        if *poisoned {
            return Err(LeaseError::AlreadyPoisoned);
        }
        *poisoned = true;
        Ok(())
    }

    /// Runs `predicate` while holding the lock and poisons iff it returns `true`.
    ///
    /// An error from the predicate is returned without poisoning.
    pub fn poison_if<P>(&self, predicate: P) -> Result<bool>
    where
        P: FnOnce() -> Result<bool>,
    {
        let mut poisoned = self.poisoned.lock().unwrap_or_else(PoisonError::into_inner);
        if *poisoned {
            return Err(LeaseError::AlreadyPoisoned);
        }
        let should_poison = predicate()?;
        if should_poison {
            *poisoned = true;
        }
        Ok(should_poison)
    }

    pub fn is_poisoned(&self) -> bool {
        *self.poisoned.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(guard: MutexGuard<'_, bool>) -> Result<PoisonedLockGuard<'_>> {
        if *guard {
            return Err(LeaseError::AlreadyPoisoned);
        }
        Ok(PoisonedLockGuard { poisoned: guard })
    }
}

impl PoisonedLockGuard<'_> {
    /// Poisons the lock while holding it. Takes effect when the guard is dropped.
    pub fn poison(mut self) {
        *self.poisoned = true;
    }

    pub fn unlock(self) {}
}
