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

//! Conditional-write key-value store abstraction.
//!
//! Locks and leader election only ever talk to a [`ConditionalStore`]. Every
//! write carries an optional [`Condition`] that the store evaluates atomically
//! against the current item; a false condition leaves the item untouched and
//! yields [`WriteOutcome::ConditionFailed`].

pub mod condition;
mod file;
mod hygiene;
mod memory;
mod schema;

pub use condition::Condition;
pub use file::FileStore;
pub use hygiene::{HygieneReport, ListableStore, StoreHygieneRunner};
pub use memory::{Fault, MemoryStore};
pub use schema::{Record, TableSchema, int_attr, string_attr};

use crate::context::Context;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(test)]
use mockall::mock;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Int(i64),
    Str(String),
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(i64::from(value))
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Int(value) => write!(f, "{value}"),
            AttributeValue::Str(value) => write!(f, "{value:?}"),
        }
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    ConditionFailed,
}

impl WriteOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }

    pub fn is_condition_failed(self) -> bool {
        matches!(self, WriteOutcome::ConditionFailed)
    }
}

/// Key-value store with conditional writes.
///
/// Implementations must fail with `RequestCanceled` when `ctx` is already
/// cancelled and with `TableNotFound` for a missing table.
pub trait ConditionalStore: Send + Sync {
    /// Replaces the whole item keyed by the schema's hash key in `item`.
    fn put_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        item: Attributes,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome>;

    /// Merges `updates` into the item, creating it when absent.
    fn update_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        key: &str,
        updates: Attributes,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome>;

    /// Removes the item. Deleting an absent item whose condition holds is applied.
    fn delete_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        key: &str,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome>;

    fn get_item(&self, ctx: &Context, table: &TableSchema, key: &str)
    -> Result<Option<Attributes>>;
}

impl<S: ConditionalStore + ?Sized> ConditionalStore for std::sync::Arc<S> {
    fn put_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        item: Attributes,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome> {
        (**self).put_item(ctx, table, item, condition)
    }

    fn update_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        key: &str,
        updates: Attributes,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome> {
        (**self).update_item(ctx, table, key, updates, condition)
    }

    fn delete_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        key: &str,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome> {
        (**self).delete_item(ctx, table, key, condition)
    }

    fn get_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        key: &str,
    ) -> Result<Option<Attributes>> {
        (**self).get_item(ctx, table, key)
    }
}

/// Change to apply to a stored item once its condition has been checked.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Mutation {
    Write(Attributes),
    Remove,
}

/// Decides the outcome of a write against the item currently stored.
///
/// Shared by every backend so they agree on condition semantics.
pub(crate) fn plan_put(
    current: Option<&Attributes>,
    item: Attributes,
    condition: Option<&Condition>,
) -> Option<Mutation> {
    condition_holds(current, condition).then_some(Mutation::Write(item))
}

pub(crate) fn plan_update(
    table: &TableSchema,
    key: &str,
    current: Option<&Attributes>,
    updates: Attributes,
    condition: Option<&Condition>,
) -> Option<Mutation> {
    if !condition_holds(current, condition) {
        return None;
    }
    let mut merged = current.cloned().unwrap_or_default();
    merged.insert(
        table.hash_key.to_string(),
        AttributeValue::Str(key.to_string()),
    );
    merged.extend(updates);
    Some(Mutation::Write(merged))
}

pub(crate) fn plan_delete(
    current: Option<&Attributes>,
    condition: Option<&Condition>,
) -> Option<Mutation> {
    condition_holds(current, condition).then_some(Mutation::Remove)
}

fn condition_holds(current: Option<&Attributes>, condition: Option<&Condition>) -> bool {
    condition.is_none_or(|condition| condition.evaluate(current))
}

#[cfg(test)]
mock! {
    pub Store {}

    impl ConditionalStore for Store {
        fn put_item(
            &self,
            ctx: &Context,
            table: &TableSchema,
            item: Attributes,
            condition: Option<Condition>,
        ) -> Result<WriteOutcome>;

        fn update_item(
            &self,
            ctx: &Context,
            table: &TableSchema,
            key: &str,
            updates: Attributes,
            condition: Option<Condition>,
        ) -> Result<WriteOutcome>;

        fn delete_item(
            &self,
            ctx: &Context,
            table: &TableSchema,
            key: &str,
            condition: Option<Condition>,
        ) -> Result<WriteOutcome>;

        fn get_item(
            &self,
            ctx: &Context,
            table: &TableSchema,
            key: &str,
        ) -> Result<Option<Attributes>>;
    }
}
