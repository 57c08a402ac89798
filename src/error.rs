use crate::allocation::AllocationId;
use crate::resource::ResourceId;
use crate::scenario::ScenarioId;
use crate::task::TaskId;
use chrono::NaiveDate;
use thiserror::Error;

/// Rejections raised by the allocation API before any assignment is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationError {
    #[error("at least one allocation must be supplied")]
    NoAllocations,

    #[error("allocation {0} requests zero resources per day")]
    ZeroResourcesPerDay(AllocationId),

    #[error("all allocations must belong to task {expected}, but allocation {allocation} belongs to {found}")]
    MixedTasks {
        allocation: AllocationId,
        expected: TaskId,
        found: TaskId,
    },

    #[error("generic allocation {0} has no candidate resources")]
    NoCandidateResources(AllocationId),

    #[error("the end {end} must be equal or posterior to the start {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Stretches(#[from] StretchesError),
}

/// Malformed stretch profiles.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StretchesError {
    #[error("at least one stretch must be specified")]
    Empty,

    #[error("stretch {index} has a percentage outside 0..=100%")]
    PercentageOutOfRange { index: usize },

    #[error("stretch {index} must be after the previous one in date, length and work")]
    NotIncreasing { index: usize },

    #[error("last stretch should have one hundred percent length and work")]
    LastNotComplete,

    #[error("Stretches must sum 100%")]
    DoesNotSumOneHundred,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResourcesPerDayError {
    #[error("resources per day can't be negative: {0}")]
    Negative(f64),

    #[error("resources per day must be a finite number: {0}")]
    NotFinite(f64),

    #[error("invalid resources per day amount: {0:?}")]
    Unparsable(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScenarioError {
    #[error("unknown scenario {0}")]
    Unknown(ScenarioId),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("project start date {start} must be on or before project end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    #[error("task {0} is already registered")]
    DuplicateTask(TaskId),

    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),

    #[error("resource {0} is already registered")]
    DuplicateResource(ResourceId),

    #[error("unknown allocation {0}")]
    UnknownAllocation(AllocationId),

    #[error("allocation {0} is not a trial copy of an allocation in this schedule")]
    NotACopy(AllocationId),

    #[error("task {0} has no allocations")]
    NoAllocationsForTask(TaskId),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),
}
