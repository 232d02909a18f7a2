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
//! Wall-clock access used for lease arithmetic.

use crate::error::{LeaseError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Longest lease or grace period accepted from configuration.
pub const MAX_LEASE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct FakeClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FakeClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Starts at a fixed, whole-second instant so millisecond round trips are exact.
    pub fn at_epoch_secs(secs: i64) -> Self {
        Self::new(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now
            .checked_add_signed(to_time_delta(by))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn to_time_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

/// `instant + duration`, failing with `InvalidConfig` when out of range.
pub fn checked_after(instant: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| instant.checked_add_signed(delta))
        .ok_or_else(|| out_of_range(duration))
}

/// `instant - duration`, failing with `InvalidConfig` when out of range.
pub fn checked_before(instant: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| instant.checked_sub_signed(delta))
        .ok_or_else(|| out_of_range(duration))
}

fn out_of_range(duration: Duration) -> LeaseError {
    LeaseError::InvalidConfig(format!("duration {duration:?} is out of range"))
}

pub fn to_millis(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

pub fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// Time left from `now` until `deadline`, zero when it already passed.
pub fn until(now: DateTime<Utc>, deadline: DateTime<Utc>) -> Duration {
    (deadline - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_clones_share_time() {
        let clock = FakeClock::at_epoch_secs(1_000);
        let other = clock.clone();
        clock.advance(Duration::from_secs(5));
        assert_eq!(other.now().timestamp(), 1_005);
    }

    #[test]
    fn until_is_zero_for_past_deadlines() {
        let clock = FakeClock::at_epoch_secs(1_000);
        let past = clock.now() - TimeDelta::seconds(3);
        assert_eq!(until(clock.now(), past), Duration::ZERO);
        let future = clock.now() + TimeDelta::milliseconds(1_500);
        assert_eq!(until(clock.now(), future), Duration::from_millis(1_500));
    }

    #[test]
    fn checked_arithmetic_rejects_huge_durations() {
        let now = FakeClock::at_epoch_secs(1_000).now();
        assert_eq!(
            checked_after(now, Duration::from_secs(2)).unwrap().timestamp(),
            1_002
        );
        assert_eq!(
            checked_before(now, Duration::from_secs(2)).unwrap().timestamp(),
            998
        );

        let huge = Duration::from_secs(u64::MAX / 4);
        assert!(matches!(
            checked_after(now, huge),
            Err(LeaseError::InvalidConfig(_))
        ));
        assert!(checked_before(now, huge).is_err());
        assert!(checked_after(now, MAX_LEASE).is_ok());
    }

    #[test]
    fn advancing_past_the_range_saturates() {
        let clock = FakeClock::at_epoch_secs(1_000);
        clock.advance(Duration::from_secs(u64::MAX / 4));
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn millis_round_trip_preserves_instant() {
        let clock = FakeClock::at_epoch_secs(1_700_000_000);
        clock.advance(Duration::from_millis(250));
        assert_eq!(from_millis(to_millis(clock.now())), clock.now());
    }
}
