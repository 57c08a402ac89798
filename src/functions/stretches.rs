use super::interpolation::MonotoneCubic;
use crate::allocation::ResourceAllocation;
use crate::allocation::allocators::{days_between, seconds_distribution};
use crate::calendar::CapacityCalendar;
use crate::day_assignment::{self, DayAssignment};
use crate::effort::EffortDuration;
use crate::error::{AllocationError, StretchesError};
use crate::task::Task;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

const ONE_HUNDRED: u32 = 100;

fn to_hundredths(fraction: f64) -> u32 {
    (fraction * ONE_HUNDRED as f64).round().max(0.0) as u32
}

/// A point of a work profile: by `date`, `length_percentage` of the task
/// has elapsed and `amount_work_percentage` of the work is done. Both are
/// fractions in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stretch {
    pub date: NaiveDate,
    pub length_percentage: f64,
    pub amount_work_percentage: f64,
    #[serde(default)]
    pub read_only: bool,
}

impl Stretch {
    pub fn new(date: NaiveDate, length_percentage: f64, amount_work_percentage: f64) -> Self {
        Self {
            date,
            length_percentage,
            amount_work_percentage,
            read_only: false,
        }
    }

    /// Dated `length_percentage` of the way through `task`.
    pub fn at_length(task: &Task, length_percentage: f64, amount_work_percentage: f64) -> Self {
        let days = (task.duration_days() as f64 * length_percentage).round() as i64;
        Self::new(
            task.start + Duration::days(days),
            length_percentage,
            amount_work_percentage,
        )
    }

    fn is_within_range(&self) -> bool {
        let in_range = |value: f64| value.is_finite() && (0.0..=1.0).contains(&value);
        in_range(self.length_percentage) && in_range(self.amount_work_percentage)
    }
}

/// The stretch a task's consolidation point stands for: read only, dated on
/// the first non-consolidated day.
pub fn consolidated_stretch(allocation: &ResourceAllocation) -> Option<Stretch> {
    let task = allocation.task();
    task.consolidated_until?;
    let date = task.first_day_not_consolidated();
    let length = if task.duration_days() == 0 {
        1.0
    } else {
        ((date - task.start).num_days() as f64 / task.duration_days() as f64).clamp(0.0, 1.0)
    };
    let work = match task.consolidated_progress {
        Some(progress) => f64::from(progress.min(ONE_HUNDRED)) / ONE_HUNDRED as f64,
        None => {
            let total = allocation.original_total_assignment().as_seconds();
            if total == 0 {
                0.0
            } else {
                (allocation.consolidated_effort().as_seconds() as f64 / total as f64).min(1.0)
            }
        }
    };
    Some(Stretch {
        date,
        length_percentage: length,
        amount_work_percentage: work,
        read_only: true,
    })
}

/// A stretch-to-stretch slice of the profile. `start` is `None` for the
/// first one, which begins where the allocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: Option<NaiveDate>,
    pub end: NaiveDate,
    /// Share of the work, in hundredths.
    pub load: u32,
    pub read_only: bool,
}

impl Interval {
    pub fn start_for(&self, allocation_start: NaiveDate) -> NaiveDate {
        self.start.unwrap_or(allocation_start)
    }

    /// Rounded down to the second.
    pub fn effort_for(&self, total: EffortDuration) -> EffortDuration {
        EffortDuration::seconds(total.as_seconds() * u64::from(self.load) / u64::from(ONE_HUNDRED))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StretchesFunctionType {
    /// Each interval is filled evenly.
    #[default]
    Stretches,
    /// A smooth curve through the stretch points, starting from the
    /// consolidation point.
    Interpolated,
}

/// A work profile made of stretches, kept ordered by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StretchesFunction {
    stretches: Vec<Stretch>,
    #[serde(default)]
    function_type: StretchesFunctionType,
}

impl StretchesFunction {
    pub fn new(function_type: StretchesFunctionType) -> Self {
        Self {
            stretches: Vec::new(),
            function_type,
        }
    }

    pub fn with_stretch(mut self, stretch: Stretch) -> Self {
        self.add_stretch(stretch);
        self
    }

    pub fn add_stretch(&mut self, stretch: Stretch) {
        self.stretches.push(stretch);
        self.stretches.sort_by_key(|each| each.date);
    }

    pub fn remove_stretch(&mut self, stretch: &Stretch) {
        self.stretches.retain(|each| each != stretch);
    }

    pub fn remove_all_stretches(&mut self) {
        self.stretches.clear();
    }

    pub fn stretches(&self) -> &[Stretch] {
        &self.stretches
    }

    pub fn function_type(&self) -> StretchesFunctionType {
        self.function_type
    }

    pub fn change_type_to(&mut self, function_type: StretchesFunctionType) {
        self.function_type = function_type;
    }

    pub fn is_interpolated(&self) -> bool {
        self.function_type == StretchesFunctionType::Interpolated
    }

    pub fn stretches_plus_consolidated(&self, allocation: &ResourceAllocation) -> Vec<Stretch> {
        let mut result = self.stretches.clone();
        result.extend(consolidated_stretch(allocation));
        result.sort_by_key(|each| each.date);
        result
    }

    /// Rejects empty, out of range, unordered or incomplete profiles.
    pub fn validate(&self, allocation: &ResourceAllocation) -> Result<(), StretchesError> {
        let Some(last) = self.stretches.last() else {
            return Err(StretchesError::Empty);
        };
        if let Some(index) = self.stretches.iter().position(|each| !each.is_within_range()) {
            return Err(StretchesError::PercentageOutOfRange { index });
        }
        if to_hundredths(last.length_percentage) != ONE_HUNDRED
            || to_hundredths(last.amount_work_percentage) != ONE_HUNDRED
        {
            return Err(StretchesError::LastNotComplete);
        }
        let all = self.stretches_plus_consolidated(allocation);
        for (index, pair) in all.windows(2).enumerate() {
            let (previous, current) = (pair[0], pair[1]);
            if current.date <= previous.date
                || current.length_percentage <= previous.length_percentage
                || current.amount_work_percentage <= previous.amount_work_percentage
            {
                return Err(StretchesError::NotIncreasing { index: index + 1 });
            }
        }
        Ok(())
    }

    /// Each stretch closes an interval carrying the work added since the
    /// previous one. Negative loads count as zero.
    pub fn intervals_for(stretches: &[Stretch]) -> Vec<Interval> {
        let mut result = Vec::with_capacity(stretches.len());
        let mut previous_date = None;
        let mut accumulated = 0;
        for stretch in stretches {
            let cumulative = to_hundredths(stretch.amount_work_percentage);
            result.push(Interval {
                start: previous_date,
                end: stretch.date,
                load: cumulative.saturating_sub(accumulated),
                read_only: stretch.read_only,
            });
            accumulated = cumulative;
            previous_date = Some(stretch.date);
        }
        result
    }

    /// Validates and returns the intervals the profile's type works with.
    pub fn intervals(&self, allocation: &ResourceAllocation) -> Result<Vec<Interval>, StretchesError> {
        self.validate(allocation)?;
        let stretches = match self.function_type {
            StretchesFunctionType::Stretches => self.stretches.clone(),
            StretchesFunctionType::Interpolated => self.stretches_plus_consolidated(allocation),
        };
        let intervals = Self::intervals_for(&stretches);
        let total: u32 = intervals.iter().map(|each| each.load).sum();
        if total != ONE_HUNDRED {
            return Err(StretchesError::DoesNotSumOneHundred);
        }
        Ok(intervals)
    }

    /// Effort per interval. The rounding remainder goes to the first one so
    /// the parts add up to `total`.
    pub fn efforts_per_interval(intervals: &[Interval], total: EffortDuration) -> Vec<EffortDuration> {
        let mut efforts: Vec<EffortDuration> =
            intervals.iter().map(|each| each.effort_for(total)).collect();
        let distributed = EffortDuration::sum(&efforts);
        if let Some(first) = efforts.first_mut() {
            *first += total.saturating_minus(distributed);
        }
        efforts
    }

    pub fn apply_to(&self, allocation: &mut ResourceAllocation) -> Result<(), AllocationError> {
        let intervals = self.intervals(allocation)?;
        if !allocation.has_assignments() || allocation.non_consolidated_assignments().is_empty() {
            return Ok(());
        }
        let total = allocation.non_consolidated_effort();
        match self.function_type {
            StretchesFunctionType::Stretches => apply_stretches(allocation, &intervals, total),
            StretchesFunctionType::Interpolated => {
                let stretches = self.stretches_plus_consolidated(allocation);
                apply_interpolated(allocation, &stretches, total)
            }
        }
        debug!(
            allocation = %allocation.id(),
            function = ?self.function_type,
            effort = %total,
            "applied stretches function"
        );
        Ok(())
    }
}

/// Fills each interval evenly with its share. Effort an interval cannot
/// take, e.g. because it lies before the first allocatable day, moves on to
/// the next one.
fn apply_stretches(allocation: &mut ResourceAllocation, intervals: &[Interval], total: EffortDuration) {
    let start = allocation.task().first_allocatable_day();
    let efforts = StretchesFunction::efforts_per_interval(intervals, total);
    let mut assignments = Vec::new();
    let mut carried = EffortDuration::zero();
    for (interval, effort) in intervals.iter().zip(efforts) {
        let from = interval.start_for(start).max(start);
        let days: Vec<NaiveDate> = days_between(from, interval.end).collect();
        let wanted = effort + carried;
        let produced: Vec<DayAssignment> = seconds_distribution(allocation, &days, wanted)
            .into_iter()
            .flat_map(|(day, effort)| allocation.distribute_for_day(day, effort))
            .collect();
        carried = wanted.saturating_minus(day_assignment::sum(&produced));
        assignments.extend(produced);
    }
    allocation.reset_assignments_to(assignments);
    allocation.record_shortfall(carried);
}

/// Follows a monotone curve through the cumulative stretch points, renormalised
/// to the non-consolidated window. Effort falling on days that cannot be
/// worked moves to the next workable day.
fn apply_interpolated(allocation: &mut ResourceAllocation, stretches: &[Stretch], total: EffortDuration) {
    let task = allocation.task().clone();
    let start = task.first_allocatable_day();
    let end = stretches
        .iter()
        .map(|each| each.date)
        .fold(task.end, NaiveDate::max);
    let days: Vec<NaiveDate> = days_between(start, end).collect();
    let offset = |day: NaiveDate| (day - task.start).num_days() as f64;

    let mut xs = vec![0.0];
    let mut ys = vec![0.0];
    for stretch in stretches {
        let x = offset(stretch.date);
        if x > xs[xs.len() - 1] {
            xs.push(x);
            ys.push(stretch.amount_work_percentage);
        }
    }

    let per_day = match MonotoneCubic::new(xs, ys) {
        Some(curve) => {
            let base = curve.value(offset(start));
            let span = curve.value(offset(end)) - base;
            if span > 0.0 {
                cumulative_rounding(&days, total, |day| {
                    (curve.value(offset(day) + 1.0) - base) / span
                })
            } else {
                Vec::new()
            }
        }
        None => Vec::new(),
    };
    let per_day = if per_day.is_empty() {
        seconds_distribution(allocation, &days, total)
    } else {
        push_to_workable_days(allocation, per_day)
    };

    let assignments: Vec<DayAssignment> = per_day
        .into_iter()
        .flat_map(|(day, effort)| allocation.distribute_for_day(day, effort))
        .collect();
    let placed = day_assignment::sum(&assignments);
    allocation.reset_assignments_to(assignments);
    allocation.record_shortfall(total.saturating_minus(placed));
}

/// Per-day effort from a cumulative fraction reached at the end of each day.
/// Rounding the cumulative values keeps the sum at exactly `total`.
fn cumulative_rounding(
    days: &[NaiveDate],
    total: EffortDuration,
    cumulative_at_end_of: impl Fn(NaiveDate) -> f64,
) -> Vec<(NaiveDate, EffortDuration)> {
    let seconds = total.as_seconds();
    let mut previous = 0;
    let mut result = Vec::with_capacity(days.len());
    for (position, day) in days.iter().enumerate() {
        let cumulative = if position + 1 == days.len() {
            seconds
        } else {
            let fraction = cumulative_at_end_of(*day).clamp(0.0, 1.0);
            ((seconds as f64 * fraction).round() as u64).clamp(previous, seconds)
        };
        result.push((*day, EffortDuration::seconds(cumulative - previous)));
        previous = cumulative;
    }
    result
}

fn push_to_workable_days(
    allocation: &ResourceAllocation,
    per_day: Vec<(NaiveDate, EffortDuration)>,
) -> Vec<(NaiveDate, EffortDuration)> {
    let availability = allocation.availability();
    let calendar = allocation.allocation_calendar();
    let mut result: Vec<(NaiveDate, EffortDuration)> = Vec::new();
    let mut carried = EffortDuration::zero();
    for (day, effort) in per_day {
        if availability.is_valid(day) && !calendar.capacity_on(day).is_zero() {
            result.push((day, effort + carried));
            carried = EffortDuration::zero();
        } else {
            carried += effort;
        }
    }
    if let Some(last) = result.last_mut() {
        last.1 += carried;
    }
    result.retain(|(_, effort)| !effort.is_zero());
    result
}
