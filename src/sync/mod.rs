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
//! In-process synchronization primitives.
//!
//! These are synchronous and context-free: they may block the calling thread
//! but never spawn background work.

mod atomic_bool;
mod key_lock;
mod lazy;
mod poisoned_lock;
mod signal_once;

pub use atomic_bool::AtomicBoolean;
pub use key_lock::{KeyLock, KeyLockGuard};
pub use lazy::Lazy;
pub use poisoned_lock::{PoisonedLock, PoisonedLockGuard};
pub use signal_once::SignalOnce;
