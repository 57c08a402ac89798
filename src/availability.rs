use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open range of days `[start, end)`. `None` leaves that side unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(Some(start), Some(end))
    }

    pub fn starting(start: NaiveDate) -> Self {
        Self::new(Some(start), None)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start.is_none_or(|start| start <= day) && self.end.is_none_or(|end| day < end)
    }

    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start >= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(start) => write!(f, "[{start}, ")?,
            None => write!(f, "(-inf, ")?,
        }
        match self.end {
            Some(end) => write!(f, "{end})"),
            None => write!(f, "+inf)"),
        }
    }
}

/// Marks every day of an unbounded axis as valid or invalid.
///
/// Stored as the validity before the first change plus the sorted dates at
/// which validity flips. A flip date belongs to the new state. Every stored
/// flip is a real change, so the segments are always coalesced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AvailabilityTimeline {
    valid_at_start: bool,
    changes: Vec<NaiveDate>,
}

impl AvailabilityTimeline {
    pub fn all_valid() -> Self {
        Self {
            valid_at_start: true,
            changes: Vec::new(),
        }
    }

    pub fn create_all_invalid() -> Self {
        Self {
            valid_at_start: false,
            changes: Vec::new(),
        }
    }

    /// Valid only inside `range`.
    pub fn valid_only(range: DateRange) -> Self {
        if range.is_empty() {
            return Self::create_all_invalid();
        }
        let mut result = Self::all_valid();
        if let Some(start) = range.start {
            result.invalid_until(start);
        }
        if let Some(end) = range.end {
            result.invalid_from(end);
        }
        result
    }

    pub fn is_valid(&self, day: NaiveDate) -> bool {
        let flips = self.changes.partition_point(|change| *change <= day);
        self.valid_at_start ^ (flips % 2 == 1)
    }

    pub fn is_all_valid(&self) -> bool {
        self.valid_at_start && self.changes.is_empty()
    }

    pub fn is_all_invalid(&self) -> bool {
        !self.valid_at_start && self.changes.is_empty()
    }

    /// Validity after the last change, which extends forever.
    pub fn is_valid_at_end(&self) -> bool {
        self.valid_at_start ^ (self.changes.len() % 2 == 1)
    }

    pub fn last_change(&self) -> Option<NaiveDate> {
        self.changes.last().copied()
    }

    /// Marks every day before `date` invalid.
    pub fn invalid_until(&mut self, date: NaiveDate) {
        let mask = Self {
            valid_at_start: false,
            changes: vec![date],
        };
        *self = self.and(&mask);
    }

    /// Marks `date` and every later day invalid.
    pub fn invalid_from(&mut self, date: NaiveDate) {
        let mask = Self {
            valid_at_start: true,
            changes: vec![date],
        };
        *self = self.and(&mask);
    }

    /// Marks `[start, end)` invalid.
    pub fn invalid_at(&mut self, start: NaiveDate, end: NaiveDate) {
        if start >= end {
            return;
        }
        let mask = Self {
            valid_at_start: true,
            changes: vec![start, end],
        };
        *self = self.and(&mask);
    }

    pub fn and(&self, other: &AvailabilityTimeline) -> AvailabilityTimeline {
        self.combine(other, |a, b| a && b)
    }

    pub fn or(&self, other: &AvailabilityTimeline) -> AvailabilityTimeline {
        self.combine(other, |a, b| a || b)
    }

    fn combine(
        &self,
        other: &AvailabilityTimeline,
        op: impl Fn(bool, bool) -> bool,
    ) -> AvailabilityTimeline {
        let mut points: Vec<NaiveDate> = self
            .changes
            .iter()
            .chain(other.changes.iter())
            .copied()
            .collect();
        points.sort_unstable();
        points.dedup();

        let valid_at_start = op(self.valid_at_start, other.valid_at_start);
        let mut current = valid_at_start;
        let mut changes = Vec::new();
        for point in points {
            let validity = op(self.is_valid(point), other.is_valid(point));
            if validity != current {
                changes.push(point);
                current = validity;
            }
        }
        AvailabilityTimeline {
            valid_at_start,
            changes,
        }
    }

    pub fn valid_periods(&self) -> Vec<DateRange> {
        self.periods_with(true)
    }

    pub fn invalid_periods(&self) -> Vec<DateRange> {
        self.periods_with(false)
    }

    fn periods_with(&self, validity: bool) -> Vec<DateRange> {
        let mut result = Vec::new();
        let mut state = self.valid_at_start;
        let mut open: Option<Option<NaiveDate>> = (state == validity).then_some(None);
        for &change in &self.changes {
            state = !state;
            if state == validity {
                open = Some(Some(change));
            } else if let Some(start) = open.take() {
                result.push(DateRange::new(start, Some(change)));
            }
        }
        if let Some(start) = open {
            result.push(DateRange::new(start, None));
        }
        result
    }

    pub fn first_valid_on_or_after(&self, day: NaiveDate) -> Option<NaiveDate> {
        if self.is_valid(day) {
            return Some(day);
        }
        let next = self.changes.partition_point(|change| *change <= day);
        self.changes[next..]
            .iter()
            .copied()
            .find(|change| self.is_valid(*change))
    }
}

impl Default for AvailabilityTimeline {
    fn default() -> Self {
        Self::all_valid()
    }
}
