use crate::availability::{AvailabilityTimeline, DateRange};
use crate::effort::EffortDuration;
use crate::resources_per_day::ResourcesPerDay;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEFAULT_WORKING_DAY_HOURS: u64 = 8;

/// Capacity queries the allocation engine runs against a calendar.
pub trait CapacityCalendar: Send + Sync {
    /// Effort one resource unit can deliver on `day`.
    fn capacity_on(&self, day: NaiveDate) -> EffortDuration;

    fn availability(&self) -> AvailabilityTimeline;

    /// Date from which the calendar repeats its weekly pattern forever.
    /// `None` when it has always been periodic.
    fn periodic_after(&self) -> Option<NaiveDate>;

    fn as_duration_on(&self, day: NaiveDate, resources_per_day: ResourcesPerDay) -> EffortDuration {
        resources_per_day.as_duration_given_working_day_of(self.capacity_on(day))
    }

    /// Whether `target` fits in the days valid for both `availability` and
    /// this calendar. Unbounded windows are decided one week past the
    /// point where the calendar becomes periodic.
    fn there_are_capacity_for(
        &self,
        availability: &AvailabilityTimeline,
        resources_per_day: ResourcesPerDay,
        target: EffortDuration,
    ) -> bool {
        if target.is_zero() {
            return true;
        }
        if resources_per_day.is_zero() {
            return false;
        }
        let horizon = self.periodic_after();
        let effective = availability.and(&self.availability());
        let mut accumulated = EffortDuration::zero();
        for period in effective.valid_periods() {
            let start = match (period.start, period.end) {
                (Some(start), _) => start,
                (None, Some(end)) => horizon.map_or(end, |h| h.min(end)) - Duration::days(7),
                (None, None) => horizon.unwrap_or(NaiveDate::MIN + Duration::days(7)),
            };
            let periodic_from = horizon.map_or(start, |h| h.max(start));
            let limit = period
                .end
                .unwrap_or(periodic_from + Duration::days(7));
            let mut day = start;
            while day < limit {
                let effort = self.as_duration_on(day, resources_per_day);
                accumulated += effort;
                if accumulated >= target {
                    return true;
                }
                if period.end.is_none() && day >= periodic_from && !effort.is_zero() {
                    return true;
                }
                day = day + Duration::days(1);
            }
        }
        false
    }
}

pub type CalendarRef = Arc<dyn CapacityCalendar>;

/// The default eight hours every single day, weekends included.
pub fn default_working_day() -> CalendarRef {
    Arc::new(UniformCalendar::default())
}

/// A working calendar: capacity per weekday, dated exceptions that override
/// it, optional activation periods outside which nothing can be worked, and a
/// capacity multiplier for resources that stand for several people.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkCalendar {
    weekly: [EffortDuration; 7],
    exceptions: BTreeMap<NaiveDate, EffortDuration>,
    activation_periods: Vec<DateRange>,
    capacity_units: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayCapacity {
    pub weekday: Weekday,
    pub effort: EffortDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityException {
    pub date: NaiveDate,
    pub effort: EffortDuration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    weekly_capacity: Vec<WeekdayCapacity>,
    #[serde(default)]
    holidays: Vec<NaiveDate>,
    #[serde(default)]
    exceptions: Vec<CapacityException>,
    #[serde(default)]
    activation_periods: Vec<DateRange>,
    #[serde(default = "default_capacity_units")]
    capacity_units: u32,
}

fn default_capacity_units() -> u32 {
    1
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::custom(
            [
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            [],
        )
    }
}

impl WorkCalendar {
    const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Eight hours on each of `working_days`, nothing on `holidays`.
    pub fn custom<I, J>(working_days: I, holidays: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let config = WorkCalendarConfig::new(working_days, holidays);
        Self::from_config(&config)
    }

    /// Every day of the week at `hours`.
    pub fn every_day(hours: EffortDuration) -> Self {
        Self {
            weekly: [hours; 7],
            exceptions: BTreeMap::new(),
            activation_periods: Vec::new(),
            capacity_units: 1,
        }
    }

    pub fn from_config(config: &WorkCalendarConfig) -> Self {
        let mut weekly = [EffortDuration::zero(); 7];
        for entry in &config.weekly_capacity {
            weekly[entry.weekday.num_days_from_monday() as usize] = entry.effort;
        }

        let mut exceptions = BTreeMap::new();
        for holiday in &config.holidays {
            exceptions.insert(*holiday, EffortDuration::zero());
        }
        for exception in &config.exceptions {
            exceptions.insert(exception.date, exception.effort);
        }

        Self {
            weekly,
            exceptions,
            activation_periods: config.activation_periods.clone(),
            capacity_units: config.capacity_units.max(1),
        }
    }

    pub fn to_config(&self) -> WorkCalendarConfig {
        WorkCalendarConfig::from(self)
    }

    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.exceptions.insert(date, EffortDuration::zero());
    }

    pub fn add_holidays(&mut self, dates: &[NaiveDate]) {
        for date in dates {
            self.add_holiday(*date);
        }
    }

    /// Example: Dec 24 for 2025-2030
    pub fn add_recurring_holiday(&mut self, month: u32, day: u32, start_year: i32, end_year: i32) {
        for year in start_year..=end_year {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                self.add_holiday(date);
            }
        }
    }

    /// Overrides the weekly capacity on a single date.
    pub fn add_exception(&mut self, date: NaiveDate, effort: EffortDuration) {
        self.exceptions.insert(date, effort);
    }

    pub fn set_capacity(&mut self, weekday: Weekday, effort: EffortDuration) {
        self.weekly[weekday.num_days_from_monday() as usize] = effort;
    }

    /// Working days keep their current capacity, or get the default eight
    /// hours if they had none. The rest drop to zero.
    pub fn set_working_days(&mut self, days: Vec<Weekday>) {
        for day in Self::ALL_WEEKDAYS {
            let slot = &mut self.weekly[day.num_days_from_monday() as usize];
            if !days.contains(&day) {
                *slot = EffortDuration::zero();
            } else if slot.is_zero() {
                *slot = EffortDuration::hours(DEFAULT_WORKING_DAY_HOURS);
            }
        }
    }

    /// Restricts the calendar to `[start, end)`; several periods may be added.
    pub fn add_activation_period(&mut self, start: NaiveDate, end: Option<NaiveDate>) {
        self.activation_periods.push(DateRange::new(Some(start), end));
    }

    pub fn set_capacity_units(&mut self, units: u32) {
        self.capacity_units = units.max(1);
    }

    pub fn capacity_units(&self) -> u32 {
        self.capacity_units
    }

    pub fn is_active(&self, date: NaiveDate) -> bool {
        self.activation_periods.is_empty()
            || self
                .activation_periods
                .iter()
                .any(|period| period.contains(date))
    }

    pub fn is_available(&self, date: NaiveDate) -> bool {
        !self.capacity_on(date).is_zero()
    }
}

impl CapacityCalendar for WorkCalendar {
    fn capacity_on(&self, day: NaiveDate) -> EffortDuration {
        if !self.is_active(day) {
            return EffortDuration::zero();
        }
        let base = self
            .exceptions
            .get(&day)
            .copied()
            .unwrap_or(self.weekly[day.weekday().num_days_from_monday() as usize]);
        base.multiply_by(self.capacity_units as u64)
    }

    fn availability(&self) -> AvailabilityTimeline {
        if self.activation_periods.is_empty() {
            return AvailabilityTimeline::all_valid();
        }
        self.activation_periods
            .iter()
            .fold(AvailabilityTimeline::create_all_invalid(), |acc, period| {
                acc.or(&AvailabilityTimeline::valid_only(*period))
            })
    }

    fn periodic_after(&self) -> Option<NaiveDate> {
        let last_exception = self
            .exceptions
            .keys()
            .next_back()
            .map(|date| *date + Duration::days(1));
        let last_boundary = self
            .activation_periods
            .iter()
            .flat_map(|period| [period.start, period.end])
            .flatten()
            .max();
        last_exception.max(last_boundary)
    }
}

/// The same capacity on every day, with no holidays and no activation limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformCalendar {
    hours: EffortDuration,
}

impl UniformCalendar {
    pub fn new(hours: EffortDuration) -> Self {
        Self { hours }
    }

    pub fn hours(&self) -> EffortDuration {
        self.hours
    }
}

impl Default for UniformCalendar {
    fn default() -> Self {
        Self::new(EffortDuration::hours(DEFAULT_WORKING_DAY_HOURS))
    }
}

impl CapacityCalendar for UniformCalendar {
    fn capacity_on(&self, _day: NaiveDate) -> EffortDuration {
        self.hours
    }

    fn availability(&self) -> AvailabilityTimeline {
        AvailabilityTimeline::all_valid()
    }

    fn periodic_after(&self) -> Option<NaiveDate> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combination {
    Min,
    Max,
}

/// Day-by-day minimum or maximum of several calendars.
pub struct CombinedWorkHours {
    calendars: Vec<CalendarRef>,
    combination: Combination,
}

impl CombinedWorkHours {
    /// Neither side gets promised more than the other can give.
    pub fn min_of(a: CalendarRef, b: CalendarRef) -> CalendarRef {
        Arc::new(Self {
            calendars: vec![a, b],
            combination: Combination::Min,
        })
    }

    /// The best of several calendars; the default working day when empty.
    pub fn max_of<I>(calendars: I) -> CalendarRef
    where
        I: IntoIterator<Item = CalendarRef>,
    {
        let calendars: Vec<CalendarRef> = calendars.into_iter().collect();
        if calendars.is_empty() {
            return default_working_day();
        }
        Arc::new(Self {
            calendars,
            combination: Combination::Max,
        })
    }
}

impl CapacityCalendar for CombinedWorkHours {
    fn capacity_on(&self, day: NaiveDate) -> EffortDuration {
        let capacities = self.calendars.iter().map(|calendar| calendar.capacity_on(day));
        let combined = match self.combination {
            Combination::Min => capacities.min(),
            Combination::Max => capacities.max(),
        };
        combined.unwrap_or_default()
    }

    fn availability(&self) -> AvailabilityTimeline {
        let mut timelines = self.calendars.iter().map(|calendar| calendar.availability());
        let Some(first) = timelines.next() else {
            return AvailabilityTimeline::all_valid();
        };
        timelines.fold(first, |acc, each| match self.combination {
            Combination::Min => acc.and(&each),
            Combination::Max => acc.or(&each),
        })
    }

    fn periodic_after(&self) -> Option<NaiveDate> {
        self.calendars
            .iter()
            .filter_map(|calendar| calendar.periodic_after())
            .max()
    }
}

impl WorkCalendarConfig {
    pub fn new<I, J>(working_days: I, holidays: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let mut working: Vec<Weekday> = working_days.into_iter().collect();
        working.sort_by_key(|wd| wd.num_days_from_monday());
        working.dedup_by(|a, b| a.num_days_from_monday() == b.num_days_from_monday());

        let mut holidays: Vec<NaiveDate> = holidays.into_iter().collect();
        holidays.sort();
        holidays.dedup();

        Self {
            weekly_capacity: working
                .into_iter()
                .map(|weekday| WeekdayCapacity {
                    weekday,
                    effort: EffortDuration::hours(DEFAULT_WORKING_DAY_HOURS),
                })
                .collect(),
            holidays,
            exceptions: Vec::new(),
            activation_periods: Vec::new(),
            capacity_units: 1,
        }
    }

    pub fn weekly_capacity(&self) -> &[WeekdayCapacity] {
        &self.weekly_capacity
    }

    pub fn holidays(&self) -> &[NaiveDate] {
        &self.holidays
    }

    pub fn exceptions(&self) -> &[CapacityException] {
        &self.exceptions
    }

    pub fn activation_periods(&self) -> &[DateRange] {
        &self.activation_periods
    }

    pub fn capacity_units(&self) -> u32 {
        self.capacity_units
    }
}

impl Default for WorkCalendarConfig {
    fn default() -> Self {
        WorkCalendarConfig::from(&WorkCalendar::default())
    }
}

impl From<&WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: &WorkCalendar) -> Self {
        let weekly_capacity = WorkCalendar::ALL_WEEKDAYS
            .iter()
            .filter_map(|weekday| {
                let effort = calendar.weekly[weekday.num_days_from_monday() as usize];
                (!effort.is_zero()).then_some(WeekdayCapacity {
                    weekday: *weekday,
                    effort,
                })
            })
            .collect();

        let mut holidays = Vec::new();
        let mut exceptions = Vec::new();
        for (date, effort) in &calendar.exceptions {
            if effort.is_zero() {
                holidays.push(*date);
            } else {
                exceptions.push(CapacityException {
                    date: *date,
                    effort: *effort,
                });
            }
        }

        Self {
            weekly_capacity,
            holidays,
            exceptions,
            activation_periods: calendar.activation_periods.clone(),
            capacity_units: calendar.capacity_units,
        }
    }
}
