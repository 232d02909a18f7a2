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

use crate::error::LeaseError;

pub fn get_exit_code(error: &LeaseError) -> i32 {
    match error {
        LeaseError::InvalidConfig(_)
        | LeaseError::ConfigError(_)
        | LeaseError::Config(_)
        | LeaseError::UnknownElectionType(_) => 2,

        LeaseError::LockOwned { .. } => 3,

        LeaseError::LockNotOwned { .. } => 4,

        LeaseError::LeaderElectionFatal(_) | LeaseError::TableNotFound(_) => 5,

        LeaseError::AlreadyPoisoned => 6,

        LeaseError::StoreUnavailable(_) | LeaseError::LeaderElectionTransient(_) => 20,

        LeaseError::MaxElapsedTime { source, .. } => get_exit_code(source),

        LeaseError::RequestCanceled => 130, // Conventional exit code after SIGINT

        _ => 1,
    }
}
