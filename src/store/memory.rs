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

//! In-process store, mostly for tests and single-process setups.

use crate::context::Context;
use crate::error::{LeaseError, Result};
use crate::store::{
    Attributes, Condition, ConditionalStore, Mutation, TableSchema, WriteOutcome, plan_delete,
    plan_put, plan_update,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Produces the error returned by an injected failure.
pub type Fault = fn() -> LeaseError;

type Table = BTreeMap<String, Attributes>;

#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
    auto_create: bool,
    calls: AtomicUsize,
    faults: Mutex<VecDeque<Fault>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// A store that creates tables on first use.
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            auto_create: true,
            calls: AtomicUsize::new(0),
            faults: Mutex::new(VecDeque::new()),
        }
    }

    /// A store that reports `TableNotFound` until [`MemoryStore::create_table`] is called.
    pub fn without_auto_create() -> Self {
        Self {
            auto_create: false,
            ..Self::new()
        }
    }

    pub fn create_table(&self, name: &str) {
        self.tables().entry(name.to_string()).or_default();
    }

    /// Number of store operations issued so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes the next `count` operations fail with `fault()`.
    pub fn fail_next(&self, count: usize, fault: Fault) {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        faults.extend(std::iter::repeat_n(fault, count));
    }

    /// Snapshot of a table's items, keyed by hash key.
    pub fn items(&self, table: &str) -> Table {
        self.tables().get(table).cloned().unwrap_or_default()
    }

    fn tables(&self) -> MutexGuard<'_, HashMap<String, Table>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Common prologue of every operation, then `f` on the table under the lock.
    fn with_table<T>(
        &self,
        ctx: &Context,
        schema: &TableSchema,
        f: impl FnOnce(&mut Table) -> T,
    ) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.err()?;

        let fault = self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(fault) = fault {
            return Err(fault());
        }

        let mut tables = self.tables();
        if !tables.contains_key(&schema.name) {
            if !self.auto_create {
                return Err(LeaseError::TableNotFound(schema.name.clone()));
            }
            tables.insert(schema.name.clone(), Table::new());
        }
        let table = tables
            .get_mut(&schema.name)
            .ok_or_else(|| LeaseError::TableNotFound(schema.name.clone()))?;
        Ok(f(table))
    }
}

fn apply(table: &mut Table, key: &str, mutation: Option<Mutation>) -> WriteOutcome {
    match mutation {
        Some(Mutation::Write(item)) => {
            table.insert(key.to_string(), item);
            WriteOutcome::Applied
        }
        Some(Mutation::Remove) => {
            table.remove(key);
            WriteOutcome::Applied
        }
        None => WriteOutcome::ConditionFailed,
    }
}

impl ConditionalStore for MemoryStore {
    fn put_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        item: Attributes,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome> {
        let key = table.key_of(&item)?;
        self.with_table(ctx, table, |items| {
            let mutation = plan_put(items.get(&key), item, condition.as_ref());
            apply(items, &key, mutation)
        })
    }

    fn update_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        key: &str,
        updates: Attributes,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome> {
        self.with_table(ctx, table, |items| {
            let mutation = plan_update(table, key, items.get(key), updates, condition.as_ref());
            apply(items, key, mutation)
        })
    }

    fn delete_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        key: &str,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome> {
        self.with_table(ctx, table, |items| {
            let mutation = plan_delete(items.get(key), condition.as_ref());
            apply(items, key, mutation)
        })
    }

    fn get_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        key: &str,
    ) -> Result<Option<Attributes>> {
        self.with_table(ctx, table, |items| items.get(key).cloned())
    }
}
