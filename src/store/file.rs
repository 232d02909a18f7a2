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

//! Directory-backed store shared by every process on the host.
//!
//! Each table is a directory and each item a JSON file named after the
//! hex-encoded key. A conditional write holds the in-process [`KeyLock`] for
//! the key and an advisory lock on the adjacent `.lock` file while it reads,
//! evaluates and writes, which makes it atomic across threads and processes.
//! Items are replaced through a staging file and a rename, so readers never
//! observe a partial write.

use crate::context::Context;
use crate::error::{LeaseError, Result};
use crate::exec::{BackoffSettings, ExponentialBackoff};
use crate::store::{
    Attributes, Condition, ConditionalStore, Mutation, TableSchema, WriteOutcome, plan_delete,
    plan_put, plan_update,
};
use crate::sync::KeyLock;
use log::{debug, trace};
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub(crate) const ITEM_SUFFIX: &str = ".json";
pub(crate) const LOCK_SUFFIX: &str = ".lock";
/// Substring marking in-flight item writes.
pub(crate) const STAGING_SEGMENT: &str = ".staging-";

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    keys: KeyLock,
    auto_create: bool,
    polling: BackoffSettings,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            keys: KeyLock::new(),
            auto_create: true,
            polling: BackoffSettings {
                initial_interval_ms: 1,
                randomization_factor: 0.2,
                multiplier: 2.0,
                max_interval_ms: 50,
                ..BackoffSettings::default()
            },
        }
    }

    pub fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create_table(&self, name: &str) -> Result<()> {
        fs::create_dir_all(self.root.join(name))?;
        Ok(())
    }

    pub fn table_dir(&self, table: &TableSchema) -> PathBuf {
        self.root.join(&table.name)
    }

    /// Keys of every item currently stored in `table`.
    pub fn list_keys(&self, table: &TableSchema) -> Result<Vec<String>> {
        let dir = self.existing_table_dir(table)?;
        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(encoded) = name.strip_suffix(ITEM_SUFFIX) else {
                continue;
            };
            match hex::decode(encoded).map(String::from_utf8) {
                Ok(Ok(key)) => keys.push(key),
                _ => debug!("Skipping unrecognised file {}", entry.path().display()),
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn existing_table_dir(&self, table: &TableSchema) -> Result<PathBuf> {
        let dir = self.table_dir(table);
        if dir.is_dir() {
            return Ok(dir);
        }
        if !self.auto_create {
            return Err(LeaseError::TableNotFound(table.name.clone()));
        }
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Runs `f` on the current item while holding both key locks, then applies its mutation.
    fn with_item<F>(&self, ctx: &Context, table: &TableSchema, key: &str, f: F) -> Result<WriteOutcome>
    where
        F: FnOnce(Option<&Attributes>) -> Option<Mutation>,
    {
        ctx.err()?;
        let dir = self.existing_table_dir(table)?;
        let paths = ItemPaths::new(&dir, key);

        let _guard = self.keys.lock(&format!("{}/{key}", table.name));
        let _file_lock = self.lock_file(ctx, &paths.lock)?;

        let current = read_item(&paths.item)?;
        match f(current.as_ref()) {
            Some(Mutation::Write(item)) => {
                write_item(&paths, &item)?;
                trace!("Wrote {}/{key}", table.name);
                Ok(WriteOutcome::Applied)
            }
            Some(Mutation::Remove) => {
                remove_if_exists(&paths.item)?;
                trace!("Removed {}/{key}", table.name);
                Ok(WriteOutcome::Applied)
            }
            None => Ok(WriteOutcome::ConditionFailed),
        }
    }

    fn lock_file(&self, ctx: &Context, path: &Path) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        let mut backoff = ExponentialBackoff::new(&self.polling);
        loop {
            match file.try_lock() {
                Ok(()) => return Ok(file),
                Err(TryLockError::WouldBlock) => ctx.sleep(backoff.next_delay())?,
                Err(TryLockError::Error(err)) => {
                    return Err(LeaseError::StoreUnavailable(format!(
                        "failed to lock {}: {err}",
                        path.display()
                    )));
                }
            }
        }
    }
}

struct ItemPaths {
    item: PathBuf,
    lock: PathBuf,
    dir: PathBuf,
    encoded: String,
}

impl ItemPaths {
    fn new(dir: &Path, key: &str) -> Self {
        let encoded = hex::encode(key);
        Self {
            item: dir.join(format!("{encoded}{ITEM_SUFFIX}")),
            lock: dir.join(format!("{encoded}{LOCK_SUFFIX}")),
            dir: dir.to_path_buf(),
            encoded,
        }
    }

    fn staging(&self) -> PathBuf {
        self.dir.join(format!(
            "{}{ITEM_SUFFIX}{STAGING_SEGMENT}{}",
            self.encoded,
            Uuid::new_v4()
        ))
    }
}

fn read_item(path: &Path) -> Result<Option<Attributes>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn write_item(paths: &ItemPaths, item: &Attributes) -> Result<()> {
    let staging = paths.staging();
    let payload = serde_json::to_vec_pretty(item)?;
    let written = (|| -> io::Result<()> {
        let mut file = File::create(&staging)?;
        file.write_all(&payload)?;
        file.sync_all()?;
        fs::rename(&staging, &paths.item)
    })();
    if let Err(err) = written {
        if let Err(cleanup) = remove_if_exists(&staging) {
            debug!(
                "Failed to remove staging file {}: {cleanup}",
                staging.display()
            );
        }
        return Err(err.into());
    }
    Ok(())
}

pub(crate) fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

impl ConditionalStore for FileStore {
    fn put_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        item: Attributes,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome> {
        let key = table.key_of(&item)?;
        self.with_item(ctx, table, &key, |current| {
            plan_put(current, item, condition.as_ref())
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
        self.with_item(ctx, table, key, |current| {
            plan_update(table, key, current, updates, condition.as_ref())
        })
    }

    fn delete_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        key: &str,
        condition: Option<Condition>,
    ) -> Result<WriteOutcome> {
        self.with_item(ctx, table, key, |current| {
            plan_delete(current, condition.as_ref())
        })
    }

    fn get_item(
        &self,
        ctx: &Context,
        table: &TableSchema,
        key: &str,
    ) -> Result<Option<Attributes>> {
        ctx.err()?;
        let dir = self.existing_table_dir(table)?;
        read_item(&ItemPaths::new(&dir, key).item)
    }
}
