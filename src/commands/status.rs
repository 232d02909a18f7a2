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
use crate::commands::CommandContext;
use crate::error::Result;
use crate::lock::LockRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
struct StatusOutput {
    resource: String,
    held: bool,
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl StatusOutput {
    fn new(resource: &str, record: Option<&LockRecord>, now: DateTime<Utc>) -> Self {
        Self {
            resource: record.map_or_else(|| resource.to_string(), |r| r.resource.clone()),
            held: record.is_some_and(|r| r.expires_at > now),
            token: record.map(|r| r.token.clone()),
            expires_at: record.map(|r| r.expires_at),
        }
    }
}

pub struct StatusCommand<'a> {
    context: &'a CommandContext<'a>,
}

impl<'a> StatusCommand<'a> {
    pub fn new(context: &'a CommandContext<'a>) -> Result<Self> {
        Ok(Self { context })
    }

    pub fn execute(&self, resource: &str, json: bool) -> Result<()> {
        let provider = self.context.lock_provider()?;
        let record = provider.inspect(&self.context.ctx, resource)?;
        let output = StatusOutput::new(resource, record.as_ref(), SystemClock.now());

        if json {
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        match (&output.expires_at, output.held) {
            (None, _) => println!("{} is not locked", output.resource),
            (Some(expires_at), true) => println!(
                "{} is locked until {expires_at} (token {})",
                output.resource,
                output.token.as_deref().unwrap_or_default()
            ),
            (Some(expires_at), false) => println!(
                "{} has an expired lock record (expired at {expires_at})",
                output.resource
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(expires_secs: i64) -> LockRecord {
        LockRecord {
            resource: "billing-jobs".to_string(),
            token: "t-1".to_string(),
            expires_at: Utc.timestamp_opt(expires_secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_live_record_is_held() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        let output = StatusOutput::new("jobs", Some(&record(1_060)), now);
        assert!(output.held);
        assert_eq!(output.resource, "billing-jobs");
        assert_eq!(output.token.as_deref(), Some("t-1"));
    }

    #[test]
    fn test_expired_or_missing_record_is_not_held() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        assert!(!StatusOutput::new("jobs", Some(&record(999)), now).held);

        let missing = StatusOutput::new("jobs", None, now);
        assert!(!missing.held);
        assert_eq!(missing.resource, "jobs");
        assert!(missing.expires_at.is_none());
    }
}
