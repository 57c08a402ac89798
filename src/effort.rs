use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;

/// An amount of work measured in whole seconds. Never negative.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EffortDuration(u64);

impl EffortDuration {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn seconds(seconds: u64) -> Self {
        Self(seconds)
    }

    pub const fn minutes(minutes: u64) -> Self {
        Self(minutes * SECONDS_PER_MINUTE)
    }

    pub const fn hours(hours: u64) -> Self {
        Self(hours * SECONDS_PER_HOUR)
    }

    pub const fn hours_and_minutes(hours: u64, minutes: u64) -> Self {
        Self(hours * SECONDS_PER_HOUR + minutes * SECONDS_PER_MINUTE)
    }

    pub const fn as_seconds(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn plus(self, other: EffortDuration) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// `None` when `other` is larger than `self`.
    pub fn checked_minus(self, other: EffortDuration) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_minus(self, other: EffortDuration) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn multiply_by(self, factor: u64) -> Self {
        Self(self.0.saturating_mul(factor))
    }

    /// Integer division; dividing by zero yields zero.
    pub fn divide_by(self, divisor: u64) -> Self {
        Self(self.0.checked_div(divisor).unwrap_or(0))
    }

    /// Whole hours, rounding half an hour up.
    pub fn round_to_hours(self) -> u64 {
        (self.0 + SECONDS_PER_HOUR / 2) / SECONDS_PER_HOUR
    }

    pub fn to_hours_f64(self) -> f64 {
        self.0 as f64 / SECONDS_PER_HOUR as f64
    }

    pub fn sum<'a, I>(durations: I) -> Self
    where
        I: IntoIterator<Item = &'a EffortDuration>,
    {
        durations.into_iter().copied().sum()
    }
}

impl Add for EffortDuration {
    type Output = EffortDuration;

    fn add(self, rhs: Self) -> Self::Output {
        self.plus(rhs)
    }
}

impl AddAssign for EffortDuration {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.plus(rhs);
    }
}

impl Sum for EffortDuration {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(EffortDuration::zero(), EffortDuration::plus)
    }
}

impl<'a> Sum<&'a EffortDuration> for EffortDuration {
    fn sum<I: Iterator<Item = &'a EffortDuration>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for EffortDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "0s");
        }
        let hours = self.0 / SECONDS_PER_HOUR;
        let minutes = (self.0 % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
        let seconds = self.0 % SECONDS_PER_MINUTE;

        let mut parts = Vec::new();
        if hours > 0 {
            parts.push(format!("{hours}h"));
        }
        if minutes > 0 {
            parts.push(format!("{minutes}m"));
        }
        if seconds > 0 {
            parts.push(format!("{seconds}s"));
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// A point inside a day: the date plus the effort already elapsed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntraDayDate {
    date: NaiveDate,
    effort: EffortDuration,
}

impl IntraDayDate {
    pub fn new(date: NaiveDate, effort: EffortDuration) -> Self {
        Self { date, effort }
    }

    pub fn start_of_day(date: NaiveDate) -> Self {
        Self::new(date, EffortDuration::zero())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn effort(&self) -> EffortDuration {
        self.effort
    }

    pub fn is_start_of_day(&self) -> bool {
        self.effort.is_zero()
    }

    /// The first date not touched by this point.
    pub fn as_exclusive_end(&self) -> NaiveDate {
        if self.is_start_of_day() {
            self.date
        } else {
            self.date + Duration::days(1)
        }
    }

    pub fn next_day_at_start(&self) -> Self {
        Self::start_of_day(self.date + Duration::days(1))
    }
}

impl fmt::Display for IntraDayDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_start_of_day() {
            write!(f, "{}", self.date)
        } else {
            write!(f, "{} +{}", self.date, self.effort)
        }
    }
}
