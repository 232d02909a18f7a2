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

use crate::clock::{Clock, SystemClock, checked_after, checked_before, to_millis};
use crate::context::Context;
use crate::error::{LeaseError, Result};
use crate::exec::{BackoffExecutor, ErrorType, ExecutableResource};
use crate::lock::handle::StoreLock;
use crate::lock::record::{EXPIRES_AT, LockRecord, RESOURCE, TOKEN};
use crate::lock::{DistributedLock, DistributedLockProvider, LockSettings};
use crate::store::condition::{attribute_exists, attribute_not_exists, eq, lt};
use crate::store::{Attributes, ConditionalStore, Record, TableSchema, WriteOutcome};
use crate::token::{TokenSource, UuidTokenSource};
use chrono::{DateTime, Utc};
use log::debug;
use std::sync::Arc;
use std::time::Duration;

/// Lock provider backed by a [`ConditionalStore`] table.
#[derive(Clone)]
pub struct StoreLockProvider {
    shared: Arc<ProviderShared>,
}

/// State shared by the provider and every handle it hands out.
pub(crate) struct ProviderShared {
    store: Arc<dyn ConditionalStore>,
    executor: BackoffExecutor,
    pub(crate) clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenSource>,
    table: TableSchema,
    default_lock_time: Duration,
    skew: Duration,
    settings: LockSettings,
}

/// Cancellation, lost ownership and out-of-range lease times end the retry
/// loop; anything else is assumed to be a transient store failure.
pub(crate) fn check_lock_error(err: &LeaseError) -> ErrorType {
    if err.is_request_canceled()
        || err.is_lock_not_owned()
        || matches!(err, LeaseError::InvalidConfig(_))
    {
        ErrorType::Permanent
    } else {
        ErrorType::Retryable
    }
}

impl StoreLockProvider {
    pub fn new(store: Arc<dyn ConditionalStore>, settings: &LockSettings) -> Self {
        Self::with_interfaces(
            store,
            Arc::new(SystemClock),
            Arc::new(UuidTokenSource),
            settings,
        )
    }

    pub fn with_interfaces(
        store: Arc<dyn ConditionalStore>,
        clock: Arc<dyn Clock>,
        tokens: Arc<dyn TokenSource>,
        settings: &LockSettings,
    ) -> Self {
        let executor = BackoffExecutor::new(
            ExecutableResource::new("lock", settings.table_name.clone()),
            settings.backoff.clone(),
            vec![check_lock_error],
        );
        Self {
            shared: Arc::new(ProviderShared {
                store,
                executor,
                clock,
                tokens,
                table: TableSchema::for_record::<LockRecord>(settings.table_name.clone()),
                default_lock_time: settings.default_lock_time(),
                skew: settings.skew_threshold(),
                settings: settings.clone(),
            }),
        }
    }

    pub fn table(&self) -> &TableSchema {
        &self.shared.table
    }

    /// Acquires `resource`, returning the concrete handle.
    pub fn acquire_lock(&self, ctx: &Context, resource: &str) -> Result<StoreLock> {
        let resource = self.shared.settings.qualify(resource);
        let token = self.shared.tokens.new_token();

        let expires_at = self
            .shared
            .executor
            .execute(ctx, |ctx| self.shared.try_acquire(ctx, &resource, &token))?;

        debug!("Acquired lock on {resource} until {expires_at}");
        StoreLock::start(
            Arc::clone(&self.shared),
            ctx.clone(),
            resource,
            token,
            expires_at,
        )
    }

    /// Reads the stored record for `resource`, if any, without taking the lock.
    pub fn inspect(&self, ctx: &Context, resource: &str) -> Result<Option<LockRecord>> {
        let resource = self.shared.settings.qualify(resource);
        let item = self
            .shared
            .store
            .get_item(ctx, &self.shared.table, &resource)?;
        item.map(|attrs| LockRecord::from_attributes(&self.shared.table.name, &attrs))
            .transpose()
    }
}

impl DistributedLockProvider for StoreLockProvider {
    fn acquire(&self, ctx: &Context, resource: &str) -> Result<Box<dyn DistributedLock>> {
        Ok(Box::new(self.acquire_lock(ctx, resource)?))
    }
}

impl ProviderShared {
    fn try_acquire(&self, ctx: &Context, resource: &str, token: &str) -> Result<DateTime<Utc>> {
        let now = self.clock.now();
        let ttl_threshold = checked_before(now, self.skew)?;
        let expires_at = checked_after(now, self.default_lock_time)?;

        let record = LockRecord {
            resource: resource.to_string(),
            token: token.to_string(),
            expires_at,
        };
        let condition =
            attribute_not_exists(RESOURCE).or(lt(EXPIRES_AT, to_millis(ttl_threshold)));

        match self
            .store
            .put_item(ctx, &self.table, record.to_attributes(), Some(condition))?
        {
            WriteOutcome::Applied => Ok(expires_at),
            WriteOutcome::ConditionFailed if ctx.is_cancelled() => {
                Err(LeaseError::RequestCanceled)
            }
            WriteOutcome::ConditionFailed => Err(LeaseError::lock_owned(resource)),
        }
    }

    /// Extends the lease and returns the new expiry.
    pub(crate) fn renew(
        &self,
        ctx: &Context,
        resource: &str,
        token: &str,
        lock_time: Duration,
    ) -> Result<DateTime<Utc>> {
        let expires_at = self.executor.execute(ctx, |ctx| {
            let expires_at = checked_after(self.clock.now(), lock_time)?;
            let mut updates = Attributes::new();
            updates.insert(EXPIRES_AT.to_string(), to_millis(expires_at).into());

            let outcome = self.store.update_item(
                ctx,
                &self.table,
                resource,
                updates,
                Some(ownership(token)),
            )?;
            if outcome.is_condition_failed() {
                return Err(LeaseError::lock_not_owned(resource));
            }
            Ok(expires_at)
        })?;

        debug!("Renewed lock on {resource} until {expires_at}");
        Ok(expires_at)
    }

    /// Deletes the record if it still carries `token`. Not retried.
    pub(crate) fn release(&self, ctx: &Context, resource: &str, token: &str) -> Result<()> {
        let outcome = self
            .store
            .delete_item(ctx, &self.table, resource, Some(ownership(token)))?;
        if outcome.is_condition_failed() {
            return Err(LeaseError::lock_not_owned(resource));
        }
        debug!("Released lock on {resource}");
        Ok(())
    }
}

fn ownership(token: &str) -> crate::store::Condition {
    attribute_exists(RESOURCE).and(eq(TOKEN, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::exec::BackoffSettings;
    use crate::store::{MemoryStore, MockStore};
    use crate::test::fixtures::{SequenceTokenSource, fast_backoff};

    fn settings(max_attempts: u32) -> LockSettings {
        LockSettings {
            domain: "jobs".to_string(),
            backoff: BackoffSettings {
                max_attempts,
                ..fast_backoff()
            },
            ..LockSettings::default()
        }
    }

    fn provider(store: Arc<dyn ConditionalStore>, clock: &FakeClock) -> StoreLockProvider {
        StoreLockProvider::with_interfaces(
            store,
            Arc::new(clock.clone()),
            Arc::new(SequenceTokenSource::new("token")),
            &settings(3),
        )
    }

    #[test]
    fn acquire_writes_qualified_record() {
        let store = Arc::new(MemoryStore::new());
        let clock = FakeClock::at_epoch_secs(1_000);
        let provider = provider(store.clone(), &clock);

        let lock = provider
            .acquire_lock(&Context::background(), "nightly")
            .unwrap();
        assert_eq!(lock.resource(), "jobs-nightly");

        let record = provider
            .inspect(&Context::background(), "nightly")
            .unwrap()
            .unwrap();
        assert_eq!(record.token, "token-1");
        assert_eq!(record.expires_at.timestamp(), 1_060);
        lock.release().unwrap();
    }

    #[test]
    fn contended_acquire_fails_with_lock_owned() {
        let store = Arc::new(MemoryStore::new());
        let clock = FakeClock::at_epoch_secs(1_000);
        let provider = provider(store.clone(), &clock);
        let ctx = Context::background();

        let held = provider.acquire_lock(&ctx, "nightly").unwrap();
        let calls_before = store.calls();
        let err = provider.acquire_lock(&ctx, "nightly").unwrap_err();

        assert!(err.is_lock_owned());
        assert_eq!(store.calls() - calls_before, 3);
        held.release().unwrap();
    }

    #[test]
    fn record_expired_within_skew_is_still_held() {
        let store = Arc::new(MemoryStore::new());
        let clock = FakeClock::at_epoch_secs(1_000);
        let provider = provider(store.clone(), &clock);
        let ctx = Context::background();

        let stale = provider.acquire_lock(&ctx, "nightly").unwrap();
        // 2s past expiry is inside the 5s skew window.
        clock.advance(Duration::from_secs(62));
        assert!(provider.acquire_lock(&ctx, "nightly").unwrap_err().is_lock_owned());

        clock.advance(Duration::from_secs(10));
        let fresh = provider.acquire_lock(&ctx, "nightly").unwrap();
        assert!(stale.release().unwrap_err().is_lock_not_owned());
        fresh.release().unwrap();
    }

    #[test]
    fn transient_store_errors_are_retried() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next(2, || LeaseError::StoreUnavailable("throttled".to_string()));
        let clock = FakeClock::at_epoch_secs(1_000);
        let provider = provider(store.clone(), &clock);

        let lock = provider
            .acquire_lock(&Context::background(), "nightly")
            .unwrap();
        lock.release().unwrap();
    }

    #[test]
    fn cancelled_context_is_not_retried() {
        let store = Arc::new(MemoryStore::new());
        let clock = FakeClock::at_epoch_secs(1_000);
        let provider = provider(store.clone(), &clock);
        let ctx = Context::background();
        ctx.cancel();

        let err = provider.acquire_lock(&ctx, "nightly").unwrap_err();
        assert!(err.is_request_canceled());
        assert_eq!(store.calls(), 1);
    }

    #[test]
    fn condition_failure_after_cancel_reports_cancellation() {
        let mut store = MockStore::new();
        let ctx = Context::background();
        let cancel = ctx.clone();
        store.expect_put_item().times(1).returning(move |_, _, _, _| {
            cancel.cancel();
            Ok(WriteOutcome::ConditionFailed)
        });

        let clock = FakeClock::at_epoch_secs(1_000);
        let provider = provider(Arc::new(store), &clock);
        let err = provider.acquire_lock(&ctx, "nightly").unwrap_err();
        assert!(matches!(err, LeaseError::RequestCanceled));
    }

    #[test]
    fn renew_condition_failure_is_not_owned_and_not_retried() {
        let mut store = MockStore::new();
        store
            .expect_update_item()
            .times(1)
            .returning(|_, _, _, _, _| Ok(WriteOutcome::ConditionFailed));

        let clock = FakeClock::at_epoch_secs(1_000);
        let provider = provider(Arc::new(store), &clock);
        let err = provider
            .shared
            .renew(&Context::background(), "jobs-a", "t", Duration::from_secs(30))
            .unwrap_err();
        assert!(err.is_lock_not_owned());
    }

    #[test]
    fn release_uses_token_condition() {
        let mut store = MockStore::new();
        store
            .expect_delete_item()
            .withf(|_, _, key, condition| {
                key == "jobs-a"
                    && condition.as_ref().map(ToString::to_string).as_deref()
                        == Some("attribute_exists(resource) AND token = \"t\"")
            })
            .times(1)
            .returning(|_, _, _, _| Ok(WriteOutcome::Applied));

        let clock = FakeClock::at_epoch_secs(1_000);
        let provider = provider(Arc::new(store), &clock);
        provider
            .shared
            .release(&Context::background(), "jobs-a", "t")
            .unwrap();
    }

    #[test]
    fn check_lock_error_classification() {
        assert_eq!(
            check_lock_error(&LeaseError::RequestCanceled),
            ErrorType::Permanent
        );
        assert_eq!(
            check_lock_error(&LeaseError::lock_not_owned("a")),
            ErrorType::Permanent
        );
        assert_eq!(
            check_lock_error(&LeaseError::InvalidConfig("lock time".to_string())),
            ErrorType::Permanent
        );
        assert_eq!(
            check_lock_error(&LeaseError::lock_owned("a")),
            ErrorType::Retryable
        );
        assert_eq!(
            check_lock_error(&LeaseError::StoreUnavailable("x".to_string())),
            ErrorType::Retryable
        );
    }
}
