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

//! Per-key exclusive locking over an unbounded key space.
//!
//! The map mutex is only held long enough to adjust an entry's reference
//! count, so locking two different keys never serializes. An entry lives in
//! the map exactly while its reference count is above zero.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct KeyLock {
    entries: Mutex<HashMap<String, KeyEntry>>,
}

#[derive(Debug)]
struct KeyEntry {
    refs: usize,
    gate: Arc<Gate>,
}

#[derive(Debug, Default)]
struct Gate {
    held: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    fn acquire(&self) {
        let held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        let mut held = self
            .cond
            .wait_while(held, |held| *held)
            .unwrap_or_else(PoisonError::into_inner);
        *held = true;
    }

    fn release(&self) {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.cond.notify_one();
    }
}

/// Holds the lock for one key until dropped or [`KeyLockGuard::unlock`]ed.
#[derive(Debug)]
#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct KeyLockGuard<'a> {
    owner: &'a KeyLock,
    key: String,
    gate: Arc<Gate>,
}

impl KeyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until `key` is free and returns its guard.
    pub fn lock(&self, key: &str) -> KeyLockGuard<'_> {
        let gate = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = entries.entry(key.to_string()).or_insert_with(|| KeyEntry {
                refs: 0,
                gate: Arc::new(Gate::default()),
            });
            entry.refs += 1;
            Arc::clone(&entry.gate)
        };

        gate.acquire();

        KeyLockGuard {
            owner: self,
            key: key.to_string(),
            gate,
        }
    }

    /// Number of keys currently locked or waited on.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unlock(&self, key: &str, gate: &Gate) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        gate.release();
        if let Some(entry) = entries.get_mut(key) {
            entry.refs -= 1;
            if entry.refs == 0 {
                entries.remove(key);
            }
        }
    }
}

impl KeyLockGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn unlock(self) {}
}

impl Drop for KeyLockGuard<'_> {
    fn drop(&mut self) {
        self.owner.unlock(&self.key, &self.gate);
    }
}
