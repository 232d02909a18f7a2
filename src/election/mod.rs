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

//! Leader election strategies.

mod fixed;
mod registry;
mod store;

pub use fixed::StaticLeaderElection;
pub use registry::{ElectionDeps, ElectionFactory, ElectionRegistry};
pub use store::{LeaderRecord, StoreLeaderElection};

use crate::clock::MAX_LEASE;
use crate::context::Context;
use crate::error::{LeaseError, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

pub const STORE_ELECTION: &str = "store";
pub const STATIC_ELECTION: &str = "static";

/// Elects a single leader per group.
#[cfg_attr(test, automock)]
pub trait LeaderElection: Send + Sync {
    /// Claims or extends leadership for `member_id`; `Ok(false)` when another
    /// member holds a live lease.
    fn is_leader(&self, ctx: &Context, member_id: &str) -> Result<bool>;

    /// Gives up leadership if `member_id` currently holds it.
    fn resign(&self, ctx: &Context, member_id: &str) -> Result<()>;
}

/// Asks `election` whether `member_id` leads, assuming leadership when the
/// election fails transiently so that work does not stall.
///
/// Fatal election errors and cancellation are returned.
pub fn check_leadership(
    election: &dyn LeaderElection,
    ctx: &Context,
    member_id: &str,
) -> Result<bool> {
    match election.is_leader(ctx, member_id) {
        Ok(leading) => Ok(leading),
        Err(err @ LeaseError::LeaderElectionTransient(_)) => {
            warn!("Assuming leader role for {member_id} as the election failed: {err}");
            Ok(true)
        }
        Err(err) => Err(err),
    }
}

/// Wraps a store error the way election callers expect.
pub(crate) fn classify_election_error(err: LeaseError) -> LeaseError {
    if err.is_request_canceled() {
        err
    } else if err.is_table_not_found() {
        LeaseError::LeaderElectionFatal(Box::new(err))
    } else {
        LeaseError::LeaderElectionTransient(Box::new(err))
    }
}

/// Settings of one `[leader_election.<name>]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderElectionSettings {
    #[serde(rename = "type")]
    pub kind: String,
    pub table_name: String,
    /// Election scope; defaults to the section name.
    pub group_id: String,
    pub lease_duration_ms: u64,
    /// Answer of the static strategy.
    pub result: bool,
}

impl Default for LeaderElectionSettings {
    fn default() -> Self {
        Self {
            kind: STORE_ELECTION.to_string(),
            table_name: "leader-elections".to_string(),
            group_id: String::new(),
            lease_duration_ms: 60_000,
            result: false,
        }
    }
}

impl LeaderElectionSettings {
    pub fn lease_duration(&self) -> Duration {
        Duration::from_millis(self.lease_duration_ms)
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if self.kind == STORE_ELECTION && self.lease_duration_ms == 0 {
            return Err(LeaseError::InvalidConfig(format!(
                "leader_election.{name}.lease_duration_ms must be greater than zero"
            )));
        }
        if self.lease_duration() > MAX_LEASE {
            return Err(LeaseError::InvalidConfig(format!(
                "leader_election.{name}.lease_duration_ms must not exceed {}",
                MAX_LEASE.as_millis()
            )));
        }
        Ok(())
    }
}
