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

use crate::commands::CommandContext;
use crate::election::check_leadership;
use crate::error::Result;
use serde::Serialize;

#[derive(Serialize)]
struct ElectOutput<'a> {
    election: &'a str,
    member_id: &'a str,
    leader: bool,
}

pub struct ElectCommand<'a> {
    context: &'a CommandContext<'a>,
}

impl<'a> ElectCommand<'a> {
    pub fn new(context: &'a CommandContext<'a>) -> Result<Self> {
        Ok(Self { context })
    }

    /// Runs one election round for `member_id` and reports the outcome.
    pub fn execute(&self, member_id: &str, election_name: &str, json: bool) -> Result<bool> {
        let election = self.context.election(election_name)?;
        let leader = check_leadership(election.as_ref(), &self.context.ctx, member_id)?;

        if json {
            let output = ElectOutput {
                election: election_name,
                member_id,
                leader,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else if leader {
            println!("{member_id} is the leader of {election_name}");
        } else {
            println!("{member_id} is not the leader of {election_name}");
        }
        Ok(leader)
    }
}
