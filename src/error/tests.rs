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

use crate::error::*;
use std::time::Duration;

#[test]
fn test_error_context_lock_owned() {
    let error = LeaseError::lock_owned("billing-nightly");
    let context = ErrorContext::new(&error);

    assert!(context.suggestion.is_some());
    assert!(context.details.unwrap().contains("billing-nightly"));
}

#[test]
fn test_error_context_lock_not_owned_without_resource() {
    let error = LeaseError::lock_not_owned("");
    let context = ErrorContext::new(&error);

    assert!(context.suggestion.is_some());
    assert!(context.details.is_none());
}

#[test]
fn test_error_context_table_not_found() {
    let error = LeaseError::TableNotFound("locks".to_string());
    let context = ErrorContext::new(&error);

    let suggestion = context.suggestion.unwrap();
    assert!(suggestion.contains("locks"));
    assert!(suggestion.contains("LEASEHOLD_STORE__AUTO_CREATE_TABLES"));
}

#[test]
fn test_error_context_with_custom_suggestion() {
    let error = LeaseError::StoreUnavailable("disk full".to_string());
    let context =
        ErrorContext::new(&error).with_suggestion("Free up some space.".to_string());

    assert_eq!(context.suggestion, Some("Free up some space.".to_string()));
}

#[test]
fn test_error_context_display() {
    let error = LeaseError::StoreUnavailable("disk full".to_string());
    let output = ErrorContext::new(&error).to_string();

    assert!(output.contains("Error:"));
    assert!(output.contains("Details:"));
    assert!(output.contains("Suggestion:"));
}

#[test]
fn test_exit_codes() {
    assert_eq!(get_exit_code(&LeaseError::InvalidConfig("x".to_string())), 2);
    assert_eq!(
        get_exit_code(&LeaseError::UnknownElectionType("raft".to_string())),
        2
    );
    assert_eq!(get_exit_code(&LeaseError::lock_owned("a")), 3);
    assert_eq!(get_exit_code(&LeaseError::lock_not_owned("a")), 4);
    assert_eq!(
        get_exit_code(&LeaseError::LeaderElectionFatal(Box::new(
            LeaseError::TableNotFound("t".to_string())
        ))),
        5
    );
    assert_eq!(get_exit_code(&LeaseError::AlreadyPoisoned), 6);
    assert_eq!(
        get_exit_code(&LeaseError::StoreUnavailable("x".to_string())),
        20
    );
    assert_eq!(get_exit_code(&LeaseError::RequestCanceled), 130);
    assert_eq!(
        get_exit_code(&LeaseError::InvalidRecord {
            table: "t".to_string(),
            details: "x".to_string()
        }),
        1
    );
}

#[test]
fn test_exit_code_of_max_elapsed_follows_cause() {
    let error = LeaseError::MaxElapsedTime {
        limit: Duration::from_secs(1),
        elapsed: Duration::from_secs(2),
        source: Box::new(LeaseError::lock_owned("a")),
    };
    assert_eq!(get_exit_code(&error), 3);
}

#[test]
fn test_classification_walks_wrappers() {
    let error = LeaseError::LeaderElectionTransient(Box::new(LeaseError::MaxElapsedTime {
        limit: Duration::from_secs(1),
        elapsed: Duration::from_secs(1),
        source: Box::new(LeaseError::RequestCanceled),
    }));

    assert!(error.is_request_canceled());
    assert!(!error.is_lock_owned());
    assert!(!error.is_leader_election_fatal());
}

#[test]
fn test_fatal_is_not_detected_through_other_wrappers() {
    let fatal = LeaseError::LeaderElectionFatal(Box::new(LeaseError::TableNotFound(
        "elections".to_string(),
    )));
    assert!(fatal.is_leader_election_fatal());
    assert!(fatal.is_table_not_found());

    let plain = LeaseError::TableNotFound("elections".to_string());
    assert!(!plain.is_leader_election_fatal());
}

#[test]
fn test_renew_and_release_display_mentions_both() {
    let error = LeaseError::RenewAndRelease {
        renew: Box::new(LeaseError::StoreUnavailable("timeout".to_string())),
        release: Box::new(LeaseError::lock_not_owned("a")),
    };
    let message = error.to_string();
    assert!(message.contains("failed to renew lock"));
    assert!(message.contains("failed to release lock"));
}

#[test]
fn test_format_error_chain() {
    let error = LeaseError::InvalidConfig("lock.default_lock_time_ms must be > 0".to_string());
    let formatted = format_error_chain(&error);

    assert!(formatted.contains("Error:"));
    assert!(formatted.contains("Invalid configuration"));
}

#[test]
fn test_format_error_chain_lists_wrapped_causes() {
    let error = LeaseError::MaxElapsedTime {
        limit: Duration::from_secs(1),
        elapsed: Duration::from_secs(2),
        source: Box::new(LeaseError::StoreUnavailable("disk full".to_string())),
    };
    let formatted = format_error_chain(&error);

    assert!(formatted.starts_with("Error: crossed max elapsed time"));
    assert!(formatted.contains("Caused by:\n  1: store unavailable: disk full"));
    assert!(formatted.contains("Suggestion: Increase lock.backoff.max_elapsed_time_ms"));
}

#[test]
fn test_format_error_chain_takes_details_from_inner_layer() {
    let error = LeaseError::RenewAndRelease {
        renew: Box::new(LeaseError::lock_not_owned("billing-nightly")),
        release: Box::new(LeaseError::StoreUnavailable("offline".to_string())),
    };
    let formatted = format_error_chain(&error);

    assert!(formatted.contains("  1: the lock on 'billing-nightly'"));
    assert!(formatted.contains("  2: store unavailable: offline"));
    assert!(formatted.contains("Details: Resource: billing-nightly"));
    assert!(!formatted.contains("\x1b["));
}
