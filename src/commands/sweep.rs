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

use crate::clock::SystemClock;
use crate::commands::CommandContext;
use crate::election::LeaderRecord;
use crate::error::Result;
use crate::lock::LockRecord;
use crate::store::{HygieneReport, StoreHygieneRunner, TableSchema};
use log::info;
use std::sync::Arc;
use std::time::Duration;

pub struct SweepCommand<'a> {
    context: &'a CommandContext<'a>,
}

impl<'a> SweepCommand<'a> {
    pub fn new(context: &'a CommandContext<'a>) -> Result<Self> {
        Ok(Self { context })
    }

    /// Sweeps the lock table, or the table of `election` when given.
    pub fn execute(&self, grace: Duration, election: Option<&str>) -> Result<HygieneReport> {
        let table = match election {
            Some(name) => {
                let settings = self.context.config.leader_election(name);
                TableSchema::for_record::<LeaderRecord>(settings.table_name)
            }
            None => TableSchema::for_record::<LockRecord>(self.context.config.lock.table_name.clone()),
        };

        info!("Sweeping table {} with a grace of {grace:?}", table.name);
        let runner =
            StoreHygieneRunner::new(self.context.store()?, Arc::new(SystemClock), grace);
        let report = runner.run(&self.context.ctx, &table)?;

        println!(
            "Swept {}: examined {}, removed {} expired records and {} staging files ({} errors) in {:?}",
            table.name,
            report.examined,
            report.removed,
            report.removed_staging,
            report.errors,
            report.duration
        );
        Ok(report)
    }
}
