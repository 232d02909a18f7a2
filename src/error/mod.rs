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

mod context;
mod exit_codes;
#[cfg(test)]
mod tests;

pub use context::{ErrorContext, format_error_chain};
pub use exit_codes::get_exit_code;

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeaseError {
    /// Acquisition lost the race against a live holder. Retryable.
    #[error("lock owned: '{resource}' is held by another owner")]
    LockOwned { resource: String },

    /// The caller no longer (or never) owned the lock. Never retried.
    #[error("the lock on '{resource}' was not (no longer) owned by you")]
    LockNotOwned { resource: String },

    #[error("request canceled")]
    RequestCanceled,

    #[error("leader election failed fatally: {0}")]
    LeaderElectionFatal(#[source] Box<LeaseError>),

    #[error("leader election failed: {0}")]
    LeaderElectionTransient(#[source] Box<LeaseError>),

    #[error("lock is already poisoned")]
    AlreadyPoisoned,

    #[error("table '{0}' does not exist")]
    TableNotFound(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid record in table '{table}': {details}")]
    InvalidRecord { table: String, details: String },

    #[error("crossed max elapsed time of {limit:?} after {elapsed:?}: {source}")]
    MaxElapsedTime {
        limit: Duration,
        elapsed: Duration,
        #[source]
        source: Box<LeaseError>,
    },

    #[error("failed to renew lock: {renew}; failed to release lock: {release}")]
    RenewAndRelease {
        renew: Box<LeaseError>,
        release: Box<LeaseError>,
    },

    #[error("unknown leader election type '{0}'")]
    UnknownElectionType(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, LeaseError>;

impl LeaseError {
    pub fn lock_owned(resource: impl Into<String>) -> Self {
        LeaseError::LockOwned {
            resource: resource.into(),
        }
    }

    pub fn lock_not_owned(resource: impl Into<String>) -> Self {
        LeaseError::LockNotOwned {
            resource: resource.into(),
        }
    }

    /// Returns the error wrapped by this one, if any.
    pub fn inner(&self) -> Option<&LeaseError> {
        match self {
            LeaseError::LeaderElectionFatal(inner)
            | LeaseError::LeaderElectionTransient(inner)
            | LeaseError::MaxElapsedTime { source: inner, .. } => Some(inner),
            _ => None,
        }
    }

    fn any(&self, predicate: impl Fn(&LeaseError) -> bool) -> bool {
        let mut current = Some(self);
        while let Some(err) = current {
            if predicate(err) {
                return true;
            }
            current = err.inner();
        }
        false
    }

    pub fn is_request_canceled(&self) -> bool {
        self.any(|err| matches!(err, LeaseError::RequestCanceled))
    }

    pub fn is_lock_owned(&self) -> bool {
        self.any(|err| matches!(err, LeaseError::LockOwned { .. }))
    }

    pub fn is_lock_not_owned(&self) -> bool {
        self.any(|err| matches!(err, LeaseError::LockNotOwned { .. }))
    }

    pub fn is_table_not_found(&self) -> bool {
        self.any(|err| matches!(err, LeaseError::TableNotFound(_)))
    }

    pub fn is_leader_election_fatal(&self) -> bool {
        matches!(self, LeaseError::LeaderElectionFatal(_))
    }
}
