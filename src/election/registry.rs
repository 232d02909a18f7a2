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

use crate::clock::{Clock, SystemClock};
use crate::election::{
    LeaderElection, LeaderElectionSettings, STATIC_ELECTION, STORE_ELECTION,
    StaticLeaderElection, StoreLeaderElection,
};
use crate::error::{LeaseError, Result};
use crate::store::ConditionalStore;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// What an election factory may build on.
#[derive(Clone)]
pub struct ElectionDeps {
    pub store: Arc<dyn ConditionalStore>,
    pub clock: Arc<dyn Clock>,
}

impl ElectionDeps {
    pub fn new(store: Arc<dyn ConditionalStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

pub type ElectionFactory = Box<
    dyn Fn(&ElectionDeps, &LeaderElectionSettings) -> Result<Box<dyn LeaderElection>>
        + Send
        + Sync,
>;

/// Maps election type names to factories.
pub struct ElectionRegistry {
    factories: HashMap<String, ElectionFactory>,
}

impl ElectionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry knowing the `store` and `static` strategies.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            STORE_ELECTION,
            Box::new(|deps, settings| {
                Ok(Box::new(StoreLeaderElection::new(
                    Arc::clone(&deps.store),
                    Arc::clone(&deps.clock),
                    settings,
                )))
            }),
        );
        registry.register(
            STATIC_ELECTION,
            Box::new(|_, settings| Ok(Box::new(StaticLeaderElection::new(settings.result)))),
        );
        registry
    }

    /// Adds or replaces the factory for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, factory: ElectionFactory) {
        let kind = kind.into();
        debug!("Registering leader election type {kind}");
        self.factories.insert(kind, factory);
    }

    pub fn build(
        &self,
        deps: &ElectionDeps,
        settings: &LeaderElectionSettings,
    ) -> Result<Box<dyn LeaderElection>> {
        let factory = self
            .factories
            .get(&settings.kind)
            .ok_or_else(|| LeaseError::UnknownElectionType(settings.kind.clone()))?;
        factory(deps, settings)
    }

    /// Registered type names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for ElectionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::store::MemoryStore;

    fn deps() -> ElectionDeps {
        ElectionDeps::new(Arc::new(MemoryStore::new()))
    }

    fn settings(kind: &str) -> LeaderElectionSettings {
        LeaderElectionSettings {
            kind: kind.to_string(),
            group_id: "reports".to_string(),
            result: true,
            ..LeaderElectionSettings::default()
        }
    }

    #[test]
    fn defaults_cover_store_and_static() {
        let registry = ElectionRegistry::with_defaults();
        assert_eq!(registry.kinds(), vec!["static", "store"]);

        let ctx = Context::background();
        let store = registry.build(&deps(), &settings("store")).unwrap();
        assert!(store.is_leader(&ctx, "a").unwrap());
        assert!(!store.is_leader(&ctx, "b").unwrap());

        let fixed = registry.build(&deps(), &settings("static")).unwrap();
        assert!(fixed.is_leader(&ctx, "b").unwrap());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let registry = ElectionRegistry::with_defaults();
        let err = registry
            .build(&deps(), &settings("zookeeper"))
            .err()
            .unwrap();
        assert!(matches!(err, LeaseError::UnknownElectionType(kind) if kind == "zookeeper"));
    }

    #[test]
    fn custom_factories_can_be_registered() {
        let mut registry = ElectionRegistry::new();
        registry.register(
            "never",
            Box::new(|_, _| Ok(Box::new(StaticLeaderElection::new(false)))),
        );
        let election = registry.build(&deps(), &settings("never")).unwrap();
        assert!(!election.is_leader(&Context::background(), "a").unwrap());
        assert!(registry.build(&deps(), &settings("store")).is_err());
    }
}
