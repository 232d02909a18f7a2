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
use crate::error::Result;
use log::info;

pub struct ResignCommand<'a> {
    context: &'a CommandContext<'a>,
}

impl<'a> ResignCommand<'a> {
    pub fn new(context: &'a CommandContext<'a>) -> Result<Self> {
        Ok(Self { context })
    }

    pub fn execute(&self, member_id: &str, election_name: &str) -> Result<()> {
        info!("Resigning {member_id} from election {election_name}");
        let election = self.context.election(election_name)?;
        election.resign(&self.context.ctx, member_id)?;
        println!("{member_id} is no longer leading {election_name}");
        Ok(())
    }
}
