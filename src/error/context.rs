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
use std::fmt;

pub struct ErrorContext<'a> {
    pub error: &'a LeaseError,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl<'a> ErrorContext<'a> {
    pub fn new(error: &'a LeaseError) -> Self {
        let (suggestion, details) = match error {
            LeaseError::LockOwned { resource } => {
                let suggestion = Some(
                    "Another process currently holds this lock. Wait for it to be released or \
                     for its lease to expire, then try again."
                        .to_string(),
                );
                let details = Some(format!("Resource: {resource}"));
                (suggestion, details)
            }
            LeaseError::LockNotOwned { resource } => {
                let suggestion = Some(
                    "The lease ran out or the lock was already released. Acquire the lock again \
                     before renewing or releasing it."
                        .to_string(),
                );
                let details = if resource.is_empty() {
                    None
                } else {
                    Some(format!("Resource: {resource}"))
                };
                (suggestion, details)
            }
            LeaseError::RequestCanceled => {
                let details = Some("The operation was interrupted before it finished.".to_string());
                (None, details)
            }
            LeaseError::TableNotFound(table) => {
                let suggestion = Some(format!(
                    "Create the table '{table}' or set LEASEHOLD_STORE__AUTO_CREATE_TABLES=true"
                ));
                (suggestion, None)
            }
            LeaseError::LeaderElectionFatal(inner) => {
                let suggestion = Some(
                    "Leader election cannot recover on its own. Check the store configuration."
                        .to_string(),
                );
                let details = Some(format!("Cause: {inner}"));
                (suggestion, details)
            }
            LeaseError::LeaderElectionTransient(inner) => {
                let suggestion = Some("The store may be briefly unavailable. Retry later.".to_string());
                let details = Some(format!("Cause: {inner}"));
                (suggestion, details)
            }
            LeaseError::StoreUnavailable(msg) => {
                let suggestion = Some(
                    "Check that the store directory is reachable and writable, then try again."
                        .to_string(),
                );
                let details = Some(format!("Store issue: {msg}"));
                (suggestion, details)
            }
            LeaseError::MaxElapsedTime { limit, elapsed, .. } => {
                let suggestion = Some(
                    "Increase lock.backoff.max_elapsed_time_ms or enable lock.backoff.blocking."
                        .to_string(),
                );
                let details = Some(format!(
                    "Gave up after {elapsed:?} (limit {limit:?})"
                ));
                (suggestion, details)
            }
            LeaseError::UnknownElectionType(kind) => {
                let suggestion = Some("Supported election types: store, static.".to_string());
                let details = Some(format!("Election type '{kind}' is not registered."));
                (suggestion, details)
            }
            LeaseError::InvalidConfig(_) | LeaseError::ConfigError(_) | LeaseError::Config(_) => {
                let suggestion = Some(
                    "Check leasehold.toml in your leasehold home and any LEASEHOLD_* environment \
                     variables."
                        .to_string(),
                );
                (suggestion, None)
            }
            LeaseError::Io(io_err) => {
                let suggestion = match io_err.kind() {
                    std::io::ErrorKind::PermissionDenied => {
                        if cfg!(unix) {
                            Some("Check the permissions of the store directory.".to_string())
                        } else {
                            Some("Run as Administrator or check file permissions.".to_string())
                        }
                    }
                    std::io::ErrorKind::NotFound => Some(
                        "Ensure the file or directory exists and the path is correct.".to_string(),
                    ),
                    _ => None,
                };
                let details = Some(format!("I/O error: {io_err}"));
                (suggestion, details)
            }
            _ => (None, None),
        };

        ErrorContext {
            error,
            suggestion,
            details,
        }
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }
}

/// Renders an error for the terminal: the error itself, the errors it wraps,
/// then details and a suggestion taken from the closest layer offering them.
pub fn format_error_chain(error: &LeaseError) -> String {
    let mut layers = vec![error];
    while let Some(inner) = layers.last().copied().and_then(LeaseError::inner) {
        layers.push(inner);
    }
    if let LeaseError::RenewAndRelease { renew, release } = error {
        layers.push(renew);
        layers.push(release);
    }

    let contexts: Vec<ErrorContext<'_>> = layers.iter().map(|err| ErrorContext::new(err)).collect();
    let mut output = format!("Error: {error}");

    if layers.len() > 1 {
        output.push_str("\n\nCaused by:");
        for (depth, cause) in layers[1..].iter().enumerate() {
            output.push_str(&format!("\n  {}: {cause}", depth + 1));
        }
    }
    if let Some(details) = contexts.iter().find_map(|ctx| ctx.details.as_deref()) {
        output.push_str(&format!("\n\nDetails: {details}"));
    }
    if let Some(suggestion) = contexts.iter().find_map(|ctx| ctx.suggestion.as_deref()) {
        output.push_str(&format!("\n\nSuggestion: {suggestion}"));
    }
    output
}

impl<'a> fmt::Display for ErrorContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\n\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}
