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

use crate::clock::{Clock, checked_after, from_millis, to_millis};
use crate::context::Context;
use crate::election::{LeaderElection, LeaderElectionSettings, classify_election_error};
use crate::error::Result;
use crate::store::condition::{attribute_not_exists, eq, lt, not_eq};
use crate::store::{Attributes, ConditionalStore, Record, TableSchema, int_attr, string_attr};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

const GROUP_ID: &str = "group_id";
const MEMBER_ID: &str = "member_id";
const LEADING_UNTIL: &str = "leading_until";

/// Persisted leadership lease of one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderRecord {
    pub group_id: String,
    pub member_id: String,
    pub leading_until: DateTime<Utc>,
}

impl Record for LeaderRecord {
    const HASH_KEY: &'static str = GROUP_ID;
    const TTL_ATTRIBUTE: Option<&'static str> = Some(LEADING_UNTIL);

    fn key(&self) -> &str {
        &self.group_id
    }

    fn to_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert(GROUP_ID.to_string(), self.group_id.clone().into());
        attrs.insert(MEMBER_ID.to_string(), self.member_id.clone().into());
        attrs.insert(
            LEADING_UNTIL.to_string(),
            to_millis(self.leading_until).into(),
        );
        attrs
    }

    fn from_attributes(table: &str, attrs: &Attributes) -> Result<Self> {
        Ok(Self {
            group_id: string_attr(table, attrs, GROUP_ID)?,
            member_id: string_attr(table, attrs, MEMBER_ID)?,
            leading_until: from_millis(int_attr(table, attrs, LEADING_UNTIL)?),
        })
    }
}

/// Leader election through conditional writes on a store table.
pub struct StoreLeaderElection {
    store: Arc<dyn ConditionalStore>,
    clock: Arc<dyn Clock>,
    table: TableSchema,
    group_id: String,
    lease: Duration,
}

impl StoreLeaderElection {
    pub fn new(
        store: Arc<dyn ConditionalStore>,
        clock: Arc<dyn Clock>,
        settings: &LeaderElectionSettings,
    ) -> Self {
        Self {
            store,
            clock,
            table: TableSchema::for_record::<LeaderRecord>(settings.table_name.clone()),
            group_id: settings.group_id.clone(),
            lease: settings.lease_duration(),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Current leadership record, if any.
    pub fn current(&self, ctx: &Context) -> Result<Option<LeaderRecord>> {
        let item = self
            .store
            .get_item(ctx, &self.table, &self.group_id)
            .map_err(classify_election_error)?;
        item.map(|attrs| LeaderRecord::from_attributes(&self.table.name, &attrs))
            .transpose()
    }
}

impl LeaderElection for StoreLeaderElection {
    fn is_leader(&self, ctx: &Context, member_id: &str) -> Result<bool> {
        let now = self.clock.now();
        let record = LeaderRecord {
            group_id: self.group_id.clone(),
            member_id: member_id.to_string(),
            leading_until: checked_after(now, self.lease)?,
        };

        let condition = attribute_not_exists(MEMBER_ID)
            .or(eq(MEMBER_ID, member_id))
            .or(not_eq(MEMBER_ID, member_id).and(lt(LEADING_UNTIL, to_millis(now))));

        let outcome = self
            .store
            .put_item(ctx, &self.table, record.to_attributes(), Some(condition))
            .map_err(classify_election_error)?;

        let leading = outcome.is_applied();
        debug!(
            "Member {member_id} {} group {}",
            if leading { "leads" } else { "does not lead" },
            self.group_id
        );
        Ok(leading)
    }

    fn resign(&self, ctx: &Context, member_id: &str) -> Result<()> {
        let outcome = self
            .store
            .delete_item(ctx, &self.table, &self.group_id, Some(eq(MEMBER_ID, member_id)))
            .map_err(classify_election_error)?;

        if outcome.is_condition_failed() {
            warn!(
                "Could not resign {member_id} as leader of {}: not the current leader",
                self.group_id
            );
        }
        Ok(())
    }
}
