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

//! Sweeps expired records and abandoned write artifacts out of a table.
//!
//! Expired records are deleted with a condition on their TTL attribute, so a
//! holder renewing concurrently always wins over the sweep.

use crate::clock::{Clock, checked_before, to_millis};
use crate::context::Context;
use crate::error::{LeaseError, Result};
use crate::store::condition::lt;
use crate::store::file::{STAGING_SEGMENT, remove_if_exists};
use crate::store::{AttributeValue, ConditionalStore, FileStore, MemoryStore, TableSchema};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// A store whose keys can be enumerated.
pub trait ListableStore: ConditionalStore {
    fn list_keys(&self, table: &TableSchema) -> Result<Vec<String>>;

    /// Directory holding the table's files, for stores that have one.
    fn table_path(&self, _table: &TableSchema) -> Option<PathBuf> {
        None
    }
}

impl ListableStore for FileStore {
    fn list_keys(&self, table: &TableSchema) -> Result<Vec<String>> {
        FileStore::list_keys(self, table)
    }

    fn table_path(&self, table: &TableSchema) -> Option<PathBuf> {
        Some(self.table_dir(table))
    }
}

impl ListableStore for MemoryStore {
    fn list_keys(&self, table: &TableSchema) -> Result<Vec<String>> {
        Ok(self.items(&table.name).into_keys().collect())
    }
}

/// Summary of a hygiene sweep.
#[derive(Debug, Default, Clone)]
pub struct HygieneReport {
    pub examined: usize,
    pub removed: usize,
    pub removed_staging: usize,
    pub errors: usize,
    pub duration: Duration,
}

pub struct StoreHygieneRunner<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    grace: Duration,
    staging_threshold: Duration,
}

impl<S: ListableStore + ?Sized> StoreHygieneRunner<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, grace: Duration) -> Self {
        Self {
            store,
            clock,
            grace,
            staging_threshold: Self::default_staging_threshold(),
        }
    }

    /// Staging files younger than this may still belong to a live write.
    pub fn default_staging_threshold() -> Duration {
        Duration::from_secs(600)
    }

    pub fn with_staging_threshold(mut self, threshold: Duration) -> Self {
        self.staging_threshold = threshold;
        self
    }

    pub fn run(&self, ctx: &Context, table: &TableSchema) -> Result<HygieneReport> {
        self.run_with_now(ctx, table, SystemTime::now())
    }

    pub(crate) fn run_with_now(
        &self,
        ctx: &Context,
        table: &TableSchema,
        files_now: SystemTime,
    ) -> Result<HygieneReport> {
        let start = Instant::now();
        let mut report = HygieneReport::default();

        let Some(ttl) = table.ttl_attribute else {
            return Err(LeaseError::InvalidConfig(format!(
                "table '{}' has no TTL attribute to sweep by",
                table.name
            )));
        };
        let threshold = to_millis(checked_before(self.clock.now(), self.grace)?);

        for key in self.store.list_keys(table)? {
            ctx.err()?;
            report.examined += 1;
            match self.sweep_record(ctx, table, &key, ttl, threshold) {
                Ok(true) => report.removed += 1,
                Ok(false) => {}
                Err(err) if err.is_request_canceled() => return Err(err),
                Err(err) => {
                    warn!("Failed to sweep {}/{key}: {err}", table.name);
                    report.errors += 1;
                }
            }
        }

        if let Some(dir) = self.store.table_path(table) {
            sweep_staging(&dir, files_now, self.staging_threshold, &mut report);
        }

        report.duration = start.elapsed();
        debug!(
            "Store hygiene on '{}' examined {} record(s), removed {} record(s) and {} staging file(s) in {:.3}s (errors: {})",
            table.name,
            report.examined,
            report.removed,
            report.removed_staging,
            report.duration.as_secs_f64(),
            report.errors
        );
        Ok(report)
    }

    fn sweep_record(
        &self,
        ctx: &Context,
        table: &TableSchema,
        key: &str,
        ttl: &str,
        threshold: i64,
    ) -> Result<bool> {
        let Some(item) = self.store.get_item(ctx, table, key)? else {
            return Ok(false);
        };
        match item.get(ttl) {
            Some(AttributeValue::Int(expires)) if *expires < threshold => {}
            _ => return Ok(false),
        }
        let outcome = self
            .store
            .delete_item(ctx, table, key, Some(lt(ttl, threshold)))?;
        Ok(outcome.is_applied())
    }
}

fn sweep_staging(dir: &Path, now: SystemTime, threshold: Duration, report: &mut HygieneReport) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Failed to read table directory {}: {err}", dir.display());
            report.errors += 1;
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !is_staging(&path) {
            continue;
        }
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(
                    "Failed to read metadata for staging file {}: {err}",
                    path.display()
                );
                report.errors += 1;
                continue;
            }
        };
        if !is_stale(&metadata, now, threshold) {
            continue;
        }
        match remove_if_exists(&path) {
            Ok(true) => report.removed_staging += 1,
            Ok(false) => {}
            Err(err) => {
                warn!("Failed to remove staging file {}: {err}", path.display());
                report.errors += 1;
            }
        }
    }
}

fn is_staging(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.contains(STAGING_SEGMENT))
        .unwrap_or(false)
}

fn is_stale(metadata: &fs::Metadata, now: SystemTime, threshold: Duration) -> bool {
    match metadata.modified() {
        Ok(modified) => match now.duration_since(modified) {
            Ok(age) => age >= threshold,
            Err(_) => false,
        },
        Err(_) => false,
    }
}
