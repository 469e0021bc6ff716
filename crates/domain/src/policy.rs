//! Eligibility policy: which entries are old enough, and young enough, to mirror

use time::{Duration, OffsetDateTime};

/// Open age window `(min_age, max_age)` measured from an entry's publication time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeWindow {
    min_age: Duration,
    max_age: Duration,
}

impl AgeWindow {
    pub fn new(min_age: Duration, max_age: Duration) -> Self {
        Self { min_age, max_age }
    }

    /// Window from whole-day bounds, as given on the command line
    pub fn from_days(min_days: i64, max_days: i64) -> Result<Self, DayRangeError> {
        Ok(Self::new(days(min_days)?, days(max_days)?))
    }

    /// Whether an age falls strictly inside the window. Both bounds are exclusive.
    pub fn contains(&self, age: Duration) -> bool {
        age > self.min_age && age < self.max_age
    }

    /// Whether an entry published at `published` is eligible at `now`
    pub fn admits(&self, published: OffsetDateTime, now: OffsetDateTime) -> bool {
        self.contains(now - published)
    }

    /// An empty window never admits anything; worth a warning at startup
    pub fn is_empty(&self) -> bool {
        self.max_age <= self.min_age
    }
}

/// A day count too large to express as a duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} days is out of range")]
pub struct DayRangeError(pub i64);

fn days(count: i64) -> Result<Duration, DayRangeError> {
    count
        .checked_mul(86_400)
        .map(Duration::seconds)
        .ok_or(DayRangeError(count))
}
