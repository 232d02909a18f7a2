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

use crate::clock::{Clock, from_millis, to_millis, until};
use crate::context::Context;
use crate::error::{LeaseError, Result};
use crate::lock::DistributedLock;
use crate::lock::provider::ProviderShared;
use crate::sync::{AtomicBoolean, SignalOnce};
use chrono::{DateTime, Utc};
use log::warn;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle for a lock held in a store.
///
/// Owns a watcher thread that warns when the lease runs out before the lock
/// is renewed or released. The watcher is joined by [`DistributedLock::release`]
/// or on drop.
pub struct StoreLock {
    state: Arc<LockState>,
    shared: Arc<ProviderShared>,
    ctx: Context,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

struct LockState {
    resource: String,
    token: String,
    expires_at: AtomicI64,
    stop: SignalOnce,
    released: AtomicBoolean,
    clock: Arc<dyn Clock>,
}

impl LockState {
    fn expires_at(&self) -> DateTime<Utc> {
        from_millis(self.expires_at.load(Ordering::Acquire))
    }

    fn remaining(&self) -> Duration {
        until(self.clock.now(), self.expires_at())
    }

    fn watch(&self) {
        loop {
            let remaining = self.remaining();
            if remaining.is_zero() {
                warn!(
                    "Lock on {} expired at {} before it was renewed or released",
                    self.resource,
                    self.expires_at()
                );
                return;
            }
            if self.stop.wait_timeout(remaining) {
                return;
            }
        }
    }
}

impl StoreLock {
    pub(crate) fn start(
        shared: Arc<ProviderShared>,
        ctx: Context,
        resource: String,
        token: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Self> {
        let state = Arc::new(LockState {
            resource,
            token,
            expires_at: AtomicI64::new(to_millis(expires_at)),
            stop: SignalOnce::new(),
            released: AtomicBoolean::new(false),
            clock: Arc::clone(&shared.clock),
        });

        let watched = Arc::clone(&state);
        let watcher = thread::Builder::new()
            .name(format!("lock-watcher-{}", state.resource))
            .spawn(move || watched.watch())?;

        Ok(Self {
            state,
            shared,
            ctx,
            watcher: Mutex::new(Some(watcher)),
        })
    }

    pub fn token(&self) -> &str {
        &self.state.token
    }

    /// Last known expiry of the lease.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.state.expires_at()
    }

    pub fn is_released(&self) -> bool {
        self.state.released.get()
    }

    #[cfg(test)]
    fn watcher_finished(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_none_or(JoinHandle::is_finished)
    }

    fn not_owned(&self) -> LeaseError {
        LeaseError::lock_not_owned(self.state.resource.clone())
    }

    fn stop_watcher(&self) {
        self.state.stop.signal();
        let handle = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            warn!("Watcher for lock on {} panicked", self.state.resource);
        }
    }
}

impl DistributedLock for StoreLock {
    fn resource(&self) -> &str {
        &self.state.resource
    }

    fn renew(&self, ctx: &Context, lock_time: Duration) -> Result<()> {
        if self.state.released.get() {
            return Err(self.not_owned());
        }
        let expires_at =
            self.shared
                .renew(ctx, &self.state.resource, &self.state.token, lock_time)?;
        self.state
            .expires_at
            .store(to_millis(expires_at), Ordering::Release);
        Ok(())
    }

    fn release(&self) -> Result<()> {
        self.stop_watcher();

        if !self.state.released.compare_and_set(false, true) {
            return Err(self.not_owned());
        }

        let remaining = self.state.remaining();
        if remaining.is_zero() {
            return Err(self.not_owned());
        }

        // The delete gets its own window even when the caller's context is gone.
        let ctx = self.ctx.detached(remaining);
        self.shared
            .release(&ctx, &self.state.resource, &self.state.token)
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if !self.state.released.get() {
            warn!(
                "Lock on {} dropped without release; it stays held until {}",
                self.state.resource,
                self.state.expires_at()
            );
        }
        self.stop_watcher();
    }
}

impl fmt::Debug for StoreLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreLock")
            .field("resource", &self.state.resource)
            .field("expires_at", &self.state.expires_at())
            .field("released", &self.state.released.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::clock::FakeClock;
    use crate::context::Context;
    use crate::error::LeaseError;
    use crate::lock::{DistributedLock, LockSettings, StoreLockProvider};
    use crate::store::MemoryStore;
    use crate::test::fixtures::{SequenceTokenSource, fast_backoff};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn setup() -> (Arc<MemoryStore>, FakeClock, StoreLockProvider) {
        let store = Arc::new(MemoryStore::new());
        let clock = FakeClock::at_epoch_secs(1_000);
        let settings = LockSettings {
            backoff: fast_backoff(),
            ..LockSettings::default()
        };
        let provider = StoreLockProvider::with_interfaces(
            store.clone(),
            Arc::new(clock.clone()),
            Arc::new(SequenceTokenSource::new("t")),
            &settings,
        );
        (store, clock, provider)
    }

    #[test]
    fn release_after_local_expiry_skips_the_store() {
        let (store, clock, provider) = setup();
        let lock = provider.acquire_lock(&Context::background(), "a").unwrap();

        clock.advance(Duration::from_secs(61));
        let calls = store.calls();
        let err = lock.release().unwrap_err();

        assert!(err.is_lock_not_owned());
        assert_eq!(store.calls(), calls);
    }

    #[test]
    fn renew_extends_local_expiry() {
        let (_store, clock, provider) = setup();
        let lock = provider.acquire_lock(&Context::background(), "a").unwrap();
        assert_eq!(lock.expires_at().timestamp(), 1_060);

        clock.advance(Duration::from_secs(30));
        lock.renew(&Context::background(), Duration::from_secs(120))
            .unwrap();
        assert_eq!(lock.expires_at().timestamp(), 1_150);

        // Past the original expiry, the renewed lease still lets release reach the store.
        clock.advance(Duration::from_secs(60));
        lock.release().unwrap();
    }

    #[test]
    fn renew_after_store_expiry_is_not_owned() {
        let (_store, clock, provider) = setup();
        let ctx = Context::background();
        let first = provider.acquire_lock(&ctx, "a").unwrap();

        clock.advance(Duration::from_secs(120));
        let second = provider.acquire_lock(&ctx, "a").unwrap();

        let err = first.renew(&ctx, Duration::from_secs(60)).unwrap_err();
        assert!(err.is_lock_not_owned());
        second.release().unwrap();
    }

    #[test]
    fn second_release_is_not_owned() {
        let (store, _clock, provider) = setup();
        let lock = provider.acquire_lock(&Context::background(), "a").unwrap();
        lock.release().unwrap();

        let calls = store.calls();
        assert!(lock.release().unwrap_err().is_lock_not_owned());
        assert!(lock.renew(&Context::background(), Duration::from_secs(1)).is_err());
        assert_eq!(store.calls(), calls);
        assert!(lock.is_released());
    }

    #[test]
    fn release_outlives_cancelled_acquire_context() {
        let (store, _clock, provider) = setup();
        let ctx = Context::background();
        let lock = provider.acquire_lock(&ctx, "a").unwrap();
        ctx.cancel();

        lock.release().unwrap();
        assert!(store.items("locks").is_empty());
    }

    #[test]
    fn out_of_range_renewal_is_rejected() {
        let (store, _clock, provider) = setup();
        let ctx = Context::background();
        let lock = provider.acquire_lock(&ctx, "a").unwrap();
        let expires_at = lock.expires_at();

        let calls = store.calls();
        let err = lock
            .renew(&ctx, Duration::from_secs(u64::MAX / 4))
            .unwrap_err();
        assert!(matches!(err, LeaseError::InvalidConfig(_)));
        assert_eq!(store.calls(), calls);
        assert_eq!(lock.expires_at(), expires_at);
        lock.release().unwrap();
    }

    #[test]
    fn watcher_exits_once_the_lease_runs_out() {
        let store = Arc::new(MemoryStore::new());
        let settings = LockSettings {
            default_lock_time_ms: 50,
            backoff: fast_backoff(),
            ..LockSettings::default()
        };
        let provider = StoreLockProvider::new(store, &settings);
        let lock = provider.acquire_lock(&Context::background(), "a").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !lock.watcher_finished() {
            assert!(Instant::now() < deadline, "watcher still running");
            thread::sleep(Duration::from_millis(10));
        }
        assert!(lock.release().unwrap_err().is_lock_not_owned());
    }

    #[test]
    fn dropping_a_held_lock_stops_the_watcher() {
        let (store, _clock, provider) = setup();
        let lock = provider.acquire_lock(&Context::background(), "a").unwrap();
        drop(lock);
        // The record stays until its lease runs out.
        assert_eq!(store.items("locks").len(), 1);
    }
}
