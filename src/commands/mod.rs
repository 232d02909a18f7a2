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

pub mod config;
pub mod elect;
pub mod hold;
pub mod resign;
pub mod status;
pub mod sweep;

use crate::config::{LeaseholdConfig, StoreBackend};
use crate::context::Context;
use crate::election::{ElectionDeps, ElectionRegistry, LeaderElection};
use crate::error::Result;
use crate::lock::StoreLockProvider;
use crate::store::{ConditionalStore, FileStore, ListableStore, MemoryStore};
use crate::sync::Lazy;
use log::debug;
use std::sync::Arc;

pub const DEFAULT_ELECTION: &str = "default";

type StoreInit = fn(&LeaseholdConfig) -> Result<Arc<dyn ListableStore>>;

/// What every command needs: configuration, a cancellable context and a
/// store opened on first use.
pub struct CommandContext<'a> {
    pub config: &'a LeaseholdConfig,
    pub ctx: Context,
    store: Lazy<Arc<dyn ListableStore>, StoreInit>,
}

impl<'a> CommandContext<'a> {
    pub fn new(config: &'a LeaseholdConfig, ctx: Context) -> Self {
        Self {
            config,
            ctx,
            store: Lazy::new(open_store as StoreInit),
        }
    }

    pub fn store(&self) -> Result<Arc<dyn ListableStore>> {
        self.store.get(self.config)
    }

    pub fn lock_provider(&self) -> Result<StoreLockProvider> {
        let store: Arc<dyn ConditionalStore> = self.store()?;
        Ok(StoreLockProvider::new(store, &self.config.lock))
    }

    pub fn election(&self, name: &str) -> Result<Box<dyn LeaderElection>> {
        let store: Arc<dyn ConditionalStore> = self.store()?;
        let settings = self.config.leader_election(name);
        ElectionRegistry::with_defaults().build(&ElectionDeps::new(store), &settings)
    }
}

fn open_store(config: &LeaseholdConfig) -> Result<Arc<dyn ListableStore>> {
    let auto_create = config.store.auto_create_tables;
    match config.store.backend {
        StoreBackend::File => {
            let root = config.store_path();
            debug!("Opening file store at {}", root.display());
            Ok(Arc::new(FileStore::new(root).with_auto_create(auto_create)))
        }
        StoreBackend::Memory => {
            debug!("Opening in-memory store");
            let store = if auto_create {
                MemoryStore::new()
            } else {
                MemoryStore::without_auto_create()
            };
            Ok(Arc::new(store))
        }
    }
}
