use crate::calendar::{CalendarRef, WorkCalendar};
use crate::effort::EffortDuration;
use crate::resource::Criterion;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Which quantity gets recomputed when a task is edited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculatedValue {
    #[default]
    EndDate,
    NumberOfHours,
    ResourcesPerDay,
}

/// The task data allocations read. The end date is exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub effort: EffortDuration,
    pub calculated_value: CalculatedValue,
    pub calendar: Option<Arc<WorkCalendar>>,
    pub criteria: BTreeSet<Criterion>,
    /// Last day whose work is locked in.
    pub consolidated_until: Option<NaiveDate>,
    /// Percentage (0-100) of the task's work reported as done.
    pub consolidated_progress: Option<u32>,
}

impl Task {
    pub fn new(id: TaskId, name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id,
            name: name.into(),
            start,
            end,
            effort: EffortDuration::zero(),
            calculated_value: CalculatedValue::default(),
            calendar: None,
            criteria: BTreeSet::new(),
            consolidated_until: None,
            consolidated_progress: None,
        }
    }

    pub fn with_effort(mut self, effort: EffortDuration) -> Self {
        self.effort = effort;
        self
    }

    pub fn with_calendar(mut self, calendar: WorkCalendar) -> Self {
        self.calendar = Some(Arc::new(calendar));
        self
    }

    pub fn with_calculated_value(mut self, calculated_value: CalculatedValue) -> Self {
        self.calculated_value = calculated_value;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criteria.insert(criterion);
        self
    }

    pub fn with_end(&self, end: NaiveDate) -> Self {
        Self {
            end,
            ..self.clone()
        }
    }

    pub fn consolidated(mut self, until: NaiveDate, progress: u32) -> Self {
        self.consolidated_until = Some(until);
        self.consolidated_progress = Some(progress.min(100));
        self
    }

    pub fn first_day_not_consolidated(&self) -> NaiveDate {
        match self.consolidated_until {
            Some(until) => until + Duration::days(1),
            None => self.start,
        }
    }

    /// Where any reallocation starts: never before the task, never on
    /// consolidated days.
    pub fn first_allocatable_day(&self) -> NaiveDate {
        self.first_day_not_consolidated().max(self.start)
    }

    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }

    pub fn calendar_ref(&self) -> CalendarRef {
        match &self.calendar {
            Some(calendar) => {
                let calendar: CalendarRef = calendar.clone();
                calendar
            }
            None => crate::calendar::default_working_day(),
        }
    }
}
