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

use leasehold::clock::SystemClock;
use leasehold::context::Context;
use leasehold::lock::{DistributedLock, LockRecord, LockSettings, StoreLockProvider};
use leasehold::store::condition::{attribute_not_exists, eq};
use leasehold::store::{
    Attributes, ConditionalStore, FileStore, Record, StoreHygieneRunner, TableSchema,
};
use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn item(key: &str, owner: &str) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("id".to_string(), key.into());
    attrs.insert("owner".to_string(), owner.into());
    attrs
}

fn table() -> TableSchema {
    TableSchema::new("things", "id", None)
}

#[test]
fn separate_store_instances_see_one_winner() {
    let root = TempDir::new().unwrap();
    let barrier = Arc::new(Barrier::new(6));

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let store = FileStore::new(root.path());
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store
                    .put_item(
                        &Context::background(),
                        &table(),
                        item("k", &format!("w{i}")),
                        Some(attribute_not_exists("id")),
                    )
                    .unwrap()
            })
        })
        .collect();

    let applied = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|outcome| outcome.is_applied())
        .count();
    assert_eq!(applied, 1);
}

#[test]
fn conditional_delete_respects_owner() {
    let root = TempDir::new().unwrap();
    let store = FileStore::new(root.path());
    let ctx = Context::background();

    store.put_item(&ctx, &table(), item("k", "a"), None).unwrap();
    assert!(
        store
            .delete_item(&ctx, &table(), "k", Some(eq("owner", "b")))
            .unwrap()
            .is_condition_failed()
    );
    assert!(
        store
            .delete_item(&ctx, &table(), "k", Some(eq("owner", "a")))
            .unwrap()
            .is_applied()
    );
    assert!(store.get_item(&ctx, &table(), "k").unwrap().is_none());
}

#[test]
fn keys_with_path_characters_stay_inside_table() {
    let root = TempDir::new().unwrap();
    let store = FileStore::new(root.path());
    let ctx = Context::background();

    store
        .put_item(&ctx, &table(), item("../etc/passwd", "a"), None)
        .unwrap();
    assert_eq!(store.list_keys(&table()).unwrap(), vec!["../etc/passwd"]);
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 1);
}

#[test]
fn sweep_removes_only_expired_locks() {
    let root = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(root.path()));
    let ctx = Context::background();

    let short = StoreLockProvider::new(
        store.clone(),
        &LockSettings {
            default_lock_time_ms: 20,
            ..LockSettings::default()
        },
    );
    let long = StoreLockProvider::new(store.clone(), &LockSettings::default());

    let expiring = short.acquire_lock(&ctx, "expiring").unwrap();
    let live = long.acquire_lock(&ctx, "live").unwrap();
    thread::sleep(Duration::from_millis(60));

    let locks = TableSchema::for_record::<LockRecord>("locks");
    let report = StoreHygieneRunner::new(store.clone(), Arc::new(SystemClock), Duration::ZERO)
        .run(&ctx, &locks)
        .unwrap();

    assert_eq!(report.examined, 2);
    assert_eq!(report.removed, 1);
    assert_eq!(store.list_keys(&locks).unwrap(), vec!["live"]);

    assert!(expiring.release().unwrap_err().is_lock_not_owned());
    live.release().unwrap();
}

#[test]
fn records_are_plain_json() {
    let root = TempDir::new().unwrap();
    let store = FileStore::new(root.path());
    let ctx = Context::background();
    store.put_item(&ctx, &table(), item("k", "a"), None).unwrap();

    let file = fs::read_dir(root.path().join("things"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|path| path.extension().is_some_and(|ext| ext == "json"))
        .unwrap();
    let parsed: Attributes = serde_json::from_str(&fs::read_to_string(file).unwrap()).unwrap();
    assert_eq!(parsed, item("k", "a"));

    let record = LockRecord {
        resource: "r".to_string(),
        token: "t".to_string(),
        expires_at: chrono::Utc::now(),
    };
    assert_eq!(record.key(), "r");
}
