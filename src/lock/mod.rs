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

//! Distributed locks leased from a conditional store.
//!
//! A lock moves through `unheld -> held -> (renewed)* -> released | expired`.
//! The store's conditional writes are the only arbiter of ownership; the
//! in-memory handle just remembers the token and the last known expiry.

mod handle;
mod hold;
mod provider;
mod record;

pub use handle::StoreLock;
pub use hold::{LockHolder, hold_lock};
pub use provider::StoreLockProvider;
pub use record::LockRecord;

use crate::clock::MAX_LEASE;
use crate::context::Context;
use crate::error::{LeaseError, Result};
use crate::exec::BackoffSettings;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A held lease on a named resource.
pub trait DistributedLock: Send + Sync {
    /// Fully qualified resource name, including the domain prefix.
    fn resource(&self) -> &str;

    /// Extends the lease to `lock_time` from now.
    ///
    /// Fails with `LockNotOwned` when the stored record is gone or carries
    /// another token.
    fn renew(&self, ctx: &Context, lock_time: Duration) -> Result<()>;

    /// Gives the lease back. The handle must not be used afterwards.
    fn release(&self) -> Result<()>;
}

#[cfg_attr(test, automock)]
pub trait DistributedLockProvider: Send + Sync {
    fn acquire(&self, ctx: &Context, resource: &str) -> Result<Box<dyn DistributedLock>>;
}

impl<T: DistributedLock + ?Sized> DistributedLock for Box<T> {
    fn resource(&self) -> &str {
        (**self).resource()
    }

    fn renew(&self, ctx: &Context, lock_time: Duration) -> Result<()> {
        (**self).renew(ctx, lock_time)
    }

    fn release(&self) -> Result<()> {
        (**self).release()
    }
}

impl<T: DistributedLock + ?Sized> DistributedLock for Arc<T> {
    fn resource(&self) -> &str {
        (**self).resource()
    }

    fn renew(&self, ctx: &Context, lock_time: Duration) -> Result<()> {
        (**self).renew(ctx, lock_time)
    }

    fn release(&self) -> Result<()> {
        (**self).release()
    }
}

/// A missing handle behaves like one that lost ownership, so cleanup code can
/// renew or release unconditionally even when acquisition failed.
impl<T: DistributedLock> DistributedLock for Option<T> {
    fn resource(&self) -> &str {
        self.as_ref().map_or("", |lock| lock.resource())
    }

    fn renew(&self, ctx: &Context, lock_time: Duration) -> Result<()> {
        match self {
            Some(lock) => lock.renew(ctx, lock_time),
            None => Err(LeaseError::lock_not_owned("")),
        }
    }

    fn release(&self) -> Result<()> {
        match self {
            Some(lock) => lock.release(),
            None => Err(LeaseError::lock_not_owned("")),
        }
    }
}

impl<T: DistributedLockProvider + ?Sized> DistributedLockProvider for Arc<T> {
    fn acquire(&self, ctx: &Context, resource: &str) -> Result<Box<dyn DistributedLock>> {
        (**self).acquire(ctx, resource)
    }
}

/// Settings of the `[lock]` configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockSettings {
    /// Prefix applied to every resource name as `<domain>-<resource>`.
    pub domain: String,
    pub table_name: String,
    pub default_lock_time_ms: u64,
    /// Records expired by less than this are still treated as held.
    pub skew_threshold_ms: u64,
    pub backoff: BackoffSettings,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            domain: String::new(),
            table_name: "locks".to_string(),
            default_lock_time_ms: 60_000,
            skew_threshold_ms: 5_000,
            backoff: BackoffSettings::default(),
        }
    }
}

impl LockSettings {
    pub fn default_lock_time(&self) -> Duration {
        Duration::from_millis(self.default_lock_time_ms)
    }

    pub fn skew_threshold(&self) -> Duration {
        Duration::from_millis(self.skew_threshold_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_lock_time_ms == 0 {
            return Err(LeaseError::InvalidConfig(
                "lock.default_lock_time_ms must be greater than zero".to_string(),
            ));
        }
        if self.default_lock_time() > MAX_LEASE || self.skew_threshold() > MAX_LEASE {
            return Err(LeaseError::InvalidConfig(format!(
                "lock.default_lock_time_ms and lock.skew_threshold_ms must not exceed {}",
                MAX_LEASE.as_millis()
            )));
        }
        if self.table_name.trim().is_empty() {
            return Err(LeaseError::InvalidConfig(
                "lock.table_name must not be empty".to_string(),
            ));
        }
        self.backoff.validate()
    }

    /// Applies the domain prefix to a resource name.
    pub fn qualify(&self, resource: &str) -> String {
        if self.domain.is_empty() {
            resource.to_string()
        } else {
            format!("{}-{resource}", self.domain)
        }
    }
}
