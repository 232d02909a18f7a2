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

use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Thread-safe memoizing initializer.
///
/// The initializer receives a caller-supplied argument. Only successful
/// results are cached; a failed initialization is attempted again on the
/// next call.
pub struct Lazy<T, F> {
    value: RwLock<Option<T>>,
    init: F,
}

impl<T, F> Lazy<T, F> {
    pub fn new(init: F) -> Self {
        Self {
            value: RwLock::new(None),
            init,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<T: Clone, F> Lazy<T, F> {
    pub fn get<A, E>(&self, arg: A) -> Result<T, E>
    where
        F: Fn(A) -> Result<T, E>,
    {
        if let Some(value) = self
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(value.clone());
        }

        let mut slot = self.value.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = slot.as_ref() {
            return Ok(value.clone());
        }

        let value = (self.init)(arg)?;
        *slot = Some(value.clone());
        Ok(value)
    }
}

impl<T, F> fmt::Debug for Lazy<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
