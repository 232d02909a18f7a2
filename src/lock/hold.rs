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

//! Keeps a lock alive with periodic renewals until it is released.

use crate::context::Context;
use crate::error::{LeaseError, Result};
use crate::lock::DistributedLock;
use crate::sync::PoisonedLock;
use log::{debug, warn};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A lock plus the worker renewing it every `lock_time / 2`.
pub struct LockHolder {
    lock: Arc<dyn DistributedLock>,
    stop: Context,
    gate: Arc<PoisonedLock>,
    renew_error: Arc<Mutex<Option<LeaseError>>>,
    worker: Option<JoinHandle<()>>,
}

/// Starts renewing `lock` in the background.
///
/// Renewal stops when `ctx` is cancelled (the lock is then left to expire)
/// or when the holder is released. A renewal failure other than cancellation
/// ends the worker and is reported by [`LockHolder::release`].
pub fn hold_lock(
    ctx: &Context,
    lock: Arc<dyn DistributedLock>,
    lock_time: Duration,
) -> Result<LockHolder> {
    let stop = ctx.with_cancel();
    let gate = Arc::new(PoisonedLock::new());
    let renew_error = Arc::new(Mutex::new(None));

    let worker = {
        let lock = Arc::clone(&lock);
        let stop = stop.clone();
        let gate = Arc::clone(&gate);
        let renew_error = Arc::clone(&renew_error);
        thread::Builder::new()
            .name(format!("lock-renewer-{}", lock.resource()))
            .spawn(move || renew_until_stopped(&*lock, &stop, &gate, &renew_error, lock_time))?
    };

    Ok(LockHolder {
        lock,
        stop,
        gate,
        renew_error,
        worker: Some(worker),
    })
}

fn renew_until_stopped(
    lock: &dyn DistributedLock,
    stop: &Context,
    gate: &PoisonedLock,
    renew_error: &Mutex<Option<LeaseError>>,
    lock_time: Duration,
) {
    let interval = lock_time / 2;
    loop {
        if stop.sleep(interval).is_err() {
            return;
        }
        let Ok(guard) = gate.lock() else {
            return;
        };
        if stop.is_cancelled() {
            return;
        }
        let result = lock.renew(stop, lock_time);
        drop(guard);

        match result {
            Ok(()) => debug!("Renewed lock on {} for {lock_time:?}", lock.resource()),
            Err(err) if err.is_request_canceled() => return,
            Err(err) => {
                warn!("Failed to renew lock on {}: {err}", lock.resource());
                *renew_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
                return;
            }
        }
    }
}

impl LockHolder {
    pub fn lock(&self) -> &dyn DistributedLock {
        &*self.lock
    }

    /// Stops renewing and releases the lock.
    ///
    /// A stored renewal failure is returned even when the release succeeds;
    /// when both fail they are combined into `RenewAndRelease`.
    pub fn release(mut self) -> Result<()> {
        self.stop_renewing();
        let renew_error = self
            .renew_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match (renew_error, self.lock.release()) {
            (None, released) => released,
            (Some(renew), Ok(())) => Err(renew),
            (Some(renew), Err(release)) => Err(LeaseError::RenewAndRelease {
                renew: Box::new(renew),
                release: Box::new(release),
            }),
        }
    }

    fn stop_renewing(&mut self) {
        // Cancel first so an in-flight renewal stops retrying; the poison
        // then waits for it to return and refuses any later one.
        self.stop.cancel();
        match self.gate.poison() {
            Ok(()) | Err(LeaseError::AlreadyPoisoned) => {}
            Err(err) => warn!(
                "Failed to stop renewals of lock on {}: {err}",
                self.lock.resource()
            ),
        }
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("Renewal worker for lock on {} panicked", self.lock.resource());
        }
    }
}

impl Drop for LockHolder {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop_renewing();
        }
    }
}
