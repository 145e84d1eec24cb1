use std::ops::{Add, AddAssign, Sub};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Milliseconds since the unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign<Duration> for Timestamp {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 = self.0.saturating_add(rhs.0)
    }
}

impl Timestamp {
    pub const EPOCH: Self = Self(0);

    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(&self) -> i64 {
        self.0
    }
}

/// Signed span in milliseconds. Differences between timestamps can be negative
/// when a provider delivers a clock that went backwards.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Duration(i64);

impl From<i64> for Duration {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Duration {
    pub const ZERO: Self = Self(0);

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn from_seconds(secs: i64) -> Self {
        Self(secs * 1000)
    }

    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn to_std(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.0.max(0) as u64)
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

#[test]
fn elapsed_between_timestamps() {
    let earlier = Timestamp::from_millis(1_000);
    let later = Timestamp::from_millis(31_500);
    assert_eq!((later - earlier).as_millis(), 30_500);
    assert_eq!((earlier - later).as_millis(), -30_500);
}

#[test]
fn timestamp_advances_by_duration() {
    let mut time = Timestamp::from_millis(5_000);
    time += Duration::from_seconds(5);
    assert_eq!(time, Timestamp::from_millis(10_000));
}

#[test]
fn duration_to_std_clamps_negative() {
    assert_eq!(Duration::from_millis(-5).to_std(), std::time::Duration::ZERO);
    assert_eq!(
        Duration::from_seconds(2).to_std(),
        std::time::Duration::from_secs(2)
    );
}
