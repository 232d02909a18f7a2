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

use crate::context::Context;
use crate::election::LeaderElection;
use crate::error::Result;

/// Always gives the same answer. For single-instance deployments or when
/// leadership is decided elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct StaticLeaderElection {
    result: bool,
}

impl StaticLeaderElection {
    pub fn new(result: bool) -> Self {
        Self { result }
    }
}

impl LeaderElection for StaticLeaderElection {
    fn is_leader(&self, _ctx: &Context, _member_id: &str) -> Result<bool> {
        Ok(self.result)
    }

    fn resign(&self, _ctx: &Context, _member_id: &str) -> Result<()> {
        Ok(())
    }
}
