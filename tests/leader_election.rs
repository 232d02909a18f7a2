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

use leasehold::context::Context;
use leasehold::election::{
    ElectionDeps, ElectionRegistry, LeaderElection, LeaderElectionSettings, StaticLeaderElection,
    check_leadership,
};
use leasehold::error::LeaseError;
use leasehold::store::{ConditionalStore, FileStore};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn settings(lease_ms: u64) -> LeaderElectionSettings {
    LeaderElectionSettings {
        group_id: "nightly-report".to_string(),
        lease_duration_ms: lease_ms,
        ..LeaderElectionSettings::default()
    }
}

/// Each member opens its own store on the shared directory, like separate processes would.
fn member_election(root: &TempDir, lease_ms: u64) -> Box<dyn LeaderElection> {
    let store: Arc<dyn ConditionalStore> = Arc::new(FileStore::new(root.path()));
    ElectionRegistry::with_defaults()
        .build(&ElectionDeps::new(store), &settings(lease_ms))
        .unwrap()
}

#[test]
fn leadership_moves_after_lease_expires() {
    let root = TempDir::new().unwrap();
    let a = member_election(&root, 100);
    let b = member_election(&root, 100);
    let ctx = Context::background();

    assert!(a.is_leader(&ctx, "a").unwrap());
    assert!(!b.is_leader(&ctx, "b").unwrap());

    thread::sleep(Duration::from_millis(150));
    assert!(b.is_leader(&ctx, "b").unwrap());
    assert!(!a.is_leader(&ctx, "a").unwrap());
}

#[test]
fn resign_hands_over_immediately() {
    let root = TempDir::new().unwrap();
    let a = member_election(&root, 60_000);
    let b = member_election(&root, 60_000);
    let ctx = Context::background();

    assert!(a.is_leader(&ctx, "a").unwrap());
    b.resign(&ctx, "b").unwrap();
    assert!(!b.is_leader(&ctx, "b").unwrap());

    a.resign(&ctx, "a").unwrap();
    assert!(b.is_leader(&ctx, "b").unwrap());
}

#[test]
fn concurrent_members_elect_one_leader() {
    let root = TempDir::new().unwrap();
    let handles: Vec<_> = (0..6)
        .map(|i| {
            let election = member_election(&root, 60_000);
            thread::spawn(move || election.is_leader(&Context::background(), &format!("m{i}")))
        })
        .collect();

    let leaders = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .filter(|leading| *leading)
        .count();
    assert_eq!(leaders, 1);
}

#[test]
fn missing_table_is_fatal_for_callers() {
    let root = TempDir::new().unwrap();
    let store: Arc<dyn ConditionalStore> =
        Arc::new(FileStore::new(root.path()).with_auto_create(false));
    let election = ElectionRegistry::with_defaults()
        .build(&ElectionDeps::new(store), &settings(60_000))
        .unwrap();

    let err = check_leadership(election.as_ref(), &Context::background(), "a").unwrap_err();
    assert!(err.is_leader_election_fatal());
}

#[test]
fn registry_rejects_unknown_types_and_accepts_custom_ones() {
    let root = TempDir::new().unwrap();
    let store: Arc<dyn ConditionalStore> = Arc::new(FileStore::new(root.path()));
    let deps = ElectionDeps::new(store);
    let mut registry = ElectionRegistry::with_defaults();

    let custom = LeaderElectionSettings {
        kind: "always".to_string(),
        ..settings(60_000)
    };
    assert!(matches!(
        registry.build(&deps, &custom),
        Err(LeaseError::UnknownElectionType(_))
    ));

    registry.register(
        "always",
        Box::new(|_, _| Ok(Box::new(StaticLeaderElection::new(true)))),
    );
    let election = registry.build(&deps, &custom).unwrap();
    assert!(election.is_leader(&Context::background(), "anyone").unwrap());
}
