pub mod allocation;
pub mod availability;
pub mod calendar;
pub mod day_assignment;
pub mod distribution;
pub mod effort;
pub mod error;
pub mod functions;
pub mod metadata;
pub mod persistence;
pub mod report;
pub mod resource;
pub mod resources_per_day;
pub mod scenario;
pub mod schedule;
pub mod task;

pub use allocation::{
    AllocationId, AllocationKind, AssignmentContainer, AssignmentsState, ResourceAllocation,
    ResourceLoadIndex, ResourcesPerDayModification, HoursModification, allocating,
    allocating_hours,
};
pub use availability::{AvailabilityTimeline, DateRange};
pub use calendar::{CapacityCalendar, CombinedWorkHours, UniformCalendar, WorkCalendar, WorkCalendarConfig};
pub use day_assignment::{AssignmentOrigin, DayAssignment};
pub use distribution::{EffortDistributor, ProportionalDistributor, Share, ShareDivision};
pub use effort::{EffortDuration, IntraDayDate};
pub use error::{AllocationError, ResourcesPerDayError, ScenarioError, ScheduleError, StretchesError};
pub use functions::{AssignmentFunction, NoneFunction, Stretch, StretchesFunction, StretchesFunctionType};
pub use metadata::ScheduleMetadata;
pub use persistence::{AllocationSnapshot, AllocationStore, InMemoryAllocationStore, PersistenceError};
pub use resource::{AvailabilityCalculator, Criterion, CriterionSatisfaction, Resource, ResourceId};
pub use resources_per_day::ResourcesPerDay;
pub use scenario::{Scenario, ScenarioId, ScenarioRegistry};
pub use schedule::{ReallocationSummary, Schedule};
pub use task::{CalculatedValue, Task, TaskId};
