use super::{AllocationKind, ResourceAllocation};
use crate::availability::AvailabilityTimeline;
use crate::calendar::{CalendarRef, CapacityCalendar, CombinedWorkHours};
use crate::day_assignment::{self, DayAssignment};
use crate::distribution::{ProportionalDistributor, Share, ShareDivision};
use crate::effort::{EffortDuration, IntraDayDate};
use crate::error::AllocationError;
use crate::resource::Resource;
use crate::resources_per_day::ResourcesPerDay;
use crate::task::TaskId;
use chrono::{Duration, NaiveDate};
use std::sync::Arc;
use tracing::{debug, warn};

const DAYS_IN_WEEK: u32 = 7;

pub(crate) fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day < end)
}

/// Splits `effort` over `days` in proportion to the allocation calendar,
/// fuller days first, one second at a time. Unavailable days get nothing.
pub(crate) fn seconds_distribution(
    allocation: &ResourceAllocation,
    days: &[NaiveDate],
    effort: EffortDuration,
) -> Vec<(NaiveDate, EffortDuration)> {
    let availability = allocation.availability();
    let calendar = allocation.allocation_calendar();
    let shares: Vec<Share> = days
        .iter()
        .map(|day| {
            let capacity = calendar.capacity_on(*day);
            if availability.is_valid(*day) && !capacity.is_zero() {
                Share::new(-(capacity.as_seconds() as i64))
            } else {
                Share::unavailable()
            }
        })
        .collect();
    let division = ShareDivision::create(shares);
    let seconds = division.to(&division.plus(effort.as_seconds()));
    days.iter()
        .copied()
        .zip(seconds)
        .filter(|(_, seconds)| *seconds > 0)
        .map(|(day, seconds)| (day, EffortDuration::seconds(seconds)))
        .collect()
}

/// A request to run `allocation` at `goal` resources per day.
pub struct ResourcesPerDayModification<'a> {
    allocation: &'a mut ResourceAllocation,
    goal: ResourcesPerDay,
    resources: Option<Vec<Arc<Resource>>>,
}

impl<'a> ResourcesPerDayModification<'a> {
    pub fn create(allocation: &'a mut ResourceAllocation, goal: ResourcesPerDay) -> Self {
        Self {
            allocation,
            goal,
            resources: None,
        }
    }

    /// A generic allocation drawing from `resources` instead of its current
    /// candidates.
    pub fn create_generic(
        allocation: &'a mut ResourceAllocation,
        goal: ResourcesPerDay,
        resources: Vec<Arc<Resource>>,
    ) -> Self {
        Self {
            allocation,
            goal,
            resources: Some(resources),
        }
    }

    pub fn goal(&self) -> ResourcesPerDay {
        self.goal
    }

    pub fn allocation(&self) -> &ResourceAllocation {
        &*self.allocation
    }

    pub fn resources(&self) -> Vec<Arc<Resource>> {
        match &self.resources {
            Some(resources) => resources.clone(),
            None => self.allocation.resources(),
        }
    }

    /// Capacity of one resource unit per day. A pool can work whenever the
    /// task can and at least one member can.
    fn calendar(&self) -> CalendarRef {
        match self.allocation.kind() {
            AllocationKind::Specific(_) => self.allocation.allocation_calendar(),
            AllocationKind::Generic { .. } => CombinedWorkHours::min_of(
                self.allocation.task().calendar_ref(),
                CombinedWorkHours::max_of(self.resources().iter().map(|each| each.calendar_ref())),
            ),
        }
    }

    fn availability_from(&self, start: NaiveDate) -> AvailabilityTimeline {
        let mut availability = self.allocation.availability();
        availability.invalid_until(start);
        availability
    }
}

/// Checks that `modifications` can be allocated together: at least one,
/// all on the same task, none asking for zero resources per day and no
/// pool without candidates.
pub fn allocating(
    mut modifications: Vec<ResourcesPerDayModification<'_>>,
) -> Result<AllocationRequest<'_>, AllocationError> {
    let Some(first) = modifications.first() else {
        return Err(AllocationError::NoAllocations);
    };
    let expected = first.allocation.task().id;
    let start = first.allocation.task().first_allocatable_day();
    for modification in &modifications {
        let allocation = modification.allocation();
        check_same_task(allocation, expected)?;
        if modification.goal.is_zero() {
            return Err(AllocationError::ZeroResourcesPerDay(allocation.id()));
        }
        if allocation.is_generic() && modification.resources().is_empty() {
            return Err(AllocationError::NoCandidateResources(allocation.id()));
        }
    }
    for modification in &mut modifications {
        if let Some(resources) = &modification.resources {
            modification.allocation.set_candidates(resources.clone());
        }
    }
    Ok(AllocationRequest {
        modifications,
        start,
    })
}

fn check_same_task(allocation: &ResourceAllocation, expected: TaskId) -> Result<(), AllocationError> {
    let found = allocation.task().id;
    if found == expected {
        Ok(())
    } else {
        Err(AllocationError::MixedTasks {
            allocation: allocation.id(),
            expected,
            found,
        })
    }
}

/// What one modification gathered while growing the task.
struct Plan {
    calendar: CalendarRef,
    availability: AvailabilityTimeline,
    goal: ResourcesPerDay,
    feasible: bool,
    assignments: Vec<DayAssignment>,
    /// Day, effort placed on it, effort it could have taken.
    last_day: Option<(NaiveDate, EffortDuration, EffortDuration)>,
}

impl Plan {
    fn new(modification: &ResourcesPerDayModification<'_>, start: NaiveDate) -> Self {
        let calendar = modification.calendar();
        let availability = modification.availability_from(start);
        let feasible = calendar.there_are_capacity_for(
            &availability,
            modification.goal,
            EffortDuration::seconds(1),
        );
        Self {
            calendar,
            availability,
            goal: modification.goal,
            feasible,
            assignments: Vec::new(),
            last_day: None,
        }
    }

    /// From here on nothing changes week to week.
    fn horizon(&self, start: NaiveDate) -> NaiveDate {
        let effective = self.availability.and(&self.calendar.availability());
        [self.calendar.periodic_after(), effective.last_change()]
            .into_iter()
            .flatten()
            .fold(start, NaiveDate::max)
    }

    fn intra_day_end(&self) -> Option<IntraDayDate> {
        self.last_day.map(|(day, placed, capacity)| {
            if placed < capacity {
                IntraDayDate::new(day, placed)
            } else {
                IntraDayDate::start_of_day(day + Duration::days(1))
            }
        })
    }
}

/// Validated modifications, ready to be run.
pub struct AllocationRequest<'a> {
    modifications: Vec<ResourcesPerDayModification<'a>>,
    start: NaiveDate,
}

impl<'a> AllocationRequest<'a> {
    /// Grows the task day by day from its first allocatable day until
    /// `effort` is placed, and returns the exclusive end.
    ///
    /// When capacity runs out first, the partial result stays in place and
    /// every allocation records the missing effort as a shortfall.
    pub fn until_allocating(self, effort: EffortDuration) -> NaiveDate {
        let AllocationRequest {
            modifications,
            start,
        } = self;
        let mut plans: Vec<Plan> = modifications
            .iter()
            .map(|modification| Plan::new(modification, start))
            .collect();
        for (plan, modification) in plans.iter().zip(&modifications) {
            if !plan.feasible {
                warn!(
                    allocation = %modification.allocation.id(),
                    from = %start,
                    "no capacity left for the allocation, skipping it"
                );
            }
        }
        let horizon = plans
            .iter()
            .filter(|plan| plan.feasible)
            .map(|plan| plan.horizon(start))
            .max()
            .unwrap_or(start);

        let mut remaining = effort;
        let mut day = start;
        let mut idle_days = 0;
        while !remaining.is_zero() && !(day >= horizon && idle_days >= DAYS_IN_WEEK) {
            let mut placed_today = EffortDuration::zero();
            for (plan, modification) in plans.iter_mut().zip(&modifications) {
                if remaining.is_zero() {
                    break;
                }
                if !plan.feasible || !plan.availability.is_valid(day) {
                    continue;
                }
                let capacity = plan.calendar.as_duration_on(day, plan.goal);
                let limit = capacity.min(remaining);
                if limit.is_zero() {
                    continue;
                }
                let produced = modification.allocation.distribute_for_day(day, limit);
                let placed = day_assignment::sum(&produced);
                if placed.is_zero() {
                    continue;
                }
                remaining = remaining.saturating_minus(placed);
                placed_today += placed;
                plan.last_day = Some((day, placed, capacity));
                plan.assignments.extend(produced);
            }
            if !placed_today.is_zero() {
                idle_days = 0;
            } else if day >= horizon {
                idle_days += 1;
            }
            day = day + Duration::days(1);
        }

        let mut end: Option<NaiveDate> = None;
        for (plan, modification) in plans.into_iter().zip(modifications) {
            let intra_day_end = plan.intra_day_end();
            let allocation = modification.allocation;
            allocation.reset_assignments_with_end(plan.assignments, intra_day_end);
            allocation.set_intended_resources_per_day(modification.goal);
            allocation.record_shortfall(remaining);
            if let Some(intra_day_end) = intra_day_end {
                end = end.max(Some(intra_day_end.as_exclusive_end()));
            }
        }
        debug!(
            from = %start,
            requested = %effort,
            missing = %remaining,
            "allocated until filling the effort"
        );
        end.unwrap_or(start)
    }

    pub fn until_allocating_hours(self, hours: u64) -> NaiveDate {
        self.until_allocating(EffortDuration::hours(hours))
    }

    /// Fills the task's own window at each goal. Falling short of the
    /// task's effort is recorded on every allocation.
    pub fn allocate_on_task_length(self) {
        let end = self
            .modifications
            .first()
            .map_or(self.start, |modification| modification.allocation.task().end);
        self.allocate_on_window(end, true);
    }

    /// Fills `[start, end)` at each goal.
    pub fn allocate_until(self, end: NaiveDate) {
        self.allocate_on_window(end, false);
    }

    fn allocate_on_window(self, end: NaiveDate, check_task_effort: bool) {
        let AllocationRequest {
            modifications,
            start,
        } = self;
        let mut placed = EffortDuration::zero();
        let mut consolidated = EffortDuration::zero();
        let mut results = Vec::with_capacity(modifications.len());
        for modification in &modifications {
            let allocation = modification.allocation();
            let availability = modification.availability_from(start);
            let calendar = modification.calendar();
            let assignments: Vec<DayAssignment> = days_between(start, end)
                .filter(|day| availability.is_valid(*day))
                .flat_map(|day| {
                    allocation.distribute_for_day(day, calendar.as_duration_on(day, modification.goal))
                })
                .collect();
            placed += day_assignment::sum(&assignments);
            consolidated += allocation.consolidated_effort();
            results.push(assignments);
        }

        let missing = match modifications.first() {
            Some(modification) if check_task_effort => modification
                .allocation
                .task()
                .effort
                .saturating_minus(consolidated)
                .saturating_minus(placed),
            _ => EffortDuration::zero(),
        };
        for (modification, assignments) in modifications.into_iter().zip(results) {
            let allocation = modification.allocation;
            allocation.reset_assignments_to(assignments);
            allocation.set_intended_resources_per_day(modification.goal);
            allocation.record_shortfall(missing);
        }
        debug!(from = %start, until = %end, placed = %placed, "allocated on window");
    }
}

/// Fixed effort for one allocation, spread over a window.
pub struct HoursModification<'a> {
    allocation: &'a mut ResourceAllocation,
    effort: EffortDuration,
}

impl<'a> HoursModification<'a> {
    pub fn create(allocation: &'a mut ResourceAllocation, effort: EffortDuration) -> Self {
        Self { allocation, effort }
    }

    pub fn hours(allocation: &'a mut ResourceAllocation, hours: u64) -> Self {
        Self::create(allocation, EffortDuration::hours(hours))
    }

    pub fn effort(&self) -> EffortDuration {
        self.effort
    }

    pub fn allocation(&self) -> &ResourceAllocation {
        &*self.allocation
    }
}

pub fn allocating_hours(
    modifications: Vec<HoursModification<'_>>,
) -> Result<HoursAllocationRequest<'_>, AllocationError> {
    let Some(first) = modifications.first() else {
        return Err(AllocationError::NoAllocations);
    };
    let expected = first.allocation.task().id;
    let start = first.allocation.task().first_allocatable_day();
    for modification in &modifications {
        check_same_task(modification.allocation(), expected)?;
    }
    Ok(HoursAllocationRequest {
        modifications,
        start,
    })
}

pub struct HoursAllocationRequest<'a> {
    modifications: Vec<HoursModification<'a>>,
    start: NaiveDate,
}

impl<'a> HoursAllocationRequest<'a> {
    /// Over the task's window.
    pub fn allocate(self) {
        let end = self
            .modifications
            .first()
            .map_or(self.start, |modification| modification.allocation.task().end);
        self.allocate_until(end);
    }

    pub fn allocate_until(self, end: NaiveDate) {
        let days: Vec<NaiveDate> = days_between(self.start, end).collect();
        for modification in self.modifications {
            let allocation = modification.allocation;
            let assignments: Vec<DayAssignment> =
                seconds_distribution(allocation, &days, modification.effort)
                    .into_iter()
                    .flat_map(|(day, effort)| allocation.distribute_for_day(day, effort))
                    .collect();
            let placed = day_assignment::sum(&assignments);
            allocation.reset_assignments_to(assignments);
            allocation.record_shortfall(modification.effort.saturating_minus(placed));
        }
    }
}

/// Reallocation of a single allocation up to an exclusive end.
pub struct UntilAllocator<'a> {
    allocation: &'a mut ResourceAllocation,
    end: NaiveDate,
}

impl UntilAllocator<'_> {
    /// Every valid day from the first allocatable one gets `goal`'s worth.
    pub fn allocate(self, goal: ResourcesPerDay) {
        let allocation = self.allocation;
        let start = allocation.task().first_allocatable_day();
        let availability = allocation.availability();
        let calendar = allocation.allocation_calendar();
        let assignments: Vec<DayAssignment> = days_between(start, self.end)
            .filter(|day| availability.is_valid(*day))
            .flat_map(|day| allocation.distribute_for_day(day, calendar.as_duration_on(day, goal)))
            .collect();
        allocation.reset_assignments_to(assignments);
        allocation.set_intended_resources_per_day(goal);
    }
}

/// Rebuilds only `[start, end)`; everything outside, and every
/// consolidated assignment, stays as it is.
pub struct IntervalAllocator<'a> {
    allocation: &'a mut ResourceAllocation,
    start: NaiveDate,
    end: NaiveDate,
}

impl IntervalAllocator<'_> {
    pub fn allocate_hours(self, hours: u64) {
        self.allocate(EffortDuration::hours(hours));
    }

    pub fn allocate(self, effort: EffortDuration) {
        let allocation = self.allocation;
        let start = self.start.max(allocation.task().first_allocatable_day());
        let days: Vec<NaiveDate> = days_between(start, self.end).collect();
        let assignments: Vec<DayAssignment> = seconds_distribution(allocation, &days, effort)
            .into_iter()
            .flat_map(|(day, effort)| allocation.distribute_for_day(day, effort))
            .collect();
        let placed = day_assignment::sum(&assignments);
        allocation.reset_assignments_between(start, self.end.max(start), assignments);
        allocation.record_shortfall(effort.saturating_minus(placed));
    }
}

impl ResourceAllocation {
    pub fn allocating(
        modifications: Vec<ResourcesPerDayModification<'_>>,
    ) -> Result<AllocationRequest<'_>, AllocationError> {
        allocating(modifications)
    }

    /// Fills the task window at `goal` resources per day.
    pub fn allocate(&mut self, goal: ResourcesPerDay) {
        let end = self.task().end;
        self.until(end).allocate(goal);
    }

    pub fn until(&mut self, end: NaiveDate) -> UntilAllocator<'_> {
        UntilAllocator {
            allocation: self,
            end,
        }
    }

    pub fn on_interval(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<IntervalAllocator<'_>, AllocationError> {
        if end < start {
            return Err(AllocationError::EndBeforeStart { start, end });
        }
        Ok(IntervalAllocator {
            allocation: self,
            start,
            end,
        })
    }

    /// From the task start up to `end`.
    pub fn from_start_until(&mut self, end: NaiveDate) -> IntervalAllocator<'_> {
        let start = self.task().start;
        IntervalAllocator {
            allocation: self,
            start,
            end: end.max(start),
        }
    }

    /// Gives `[start, end)` a new total while keeping the relative size of
    /// the assignments already there. Without any to follow, the interval
    /// is filled like [`IntervalAllocator::allocate`] does.
    pub fn allocate_keeping_proportions(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        effort: EffortDuration,
    ) -> Result<(), AllocationError> {
        if end < start {
            return Err(AllocationError::EndBeforeStart { start, end });
        }
        let start = start.max(self.task().first_allocatable_day());
        let existing: Vec<DayAssignment> = self
            .non_consolidated_assignments()
            .into_iter()
            .filter(|each| each.is_between(start, end))
            .cloned()
            .collect();
        let weights: Vec<u64> = existing.iter().map(|each| each.duration().as_seconds()).collect();
        if weights.iter().all(|weight| *weight == 0) {
            self.on_interval(start, end.max(start))?.allocate(effort);
            return Ok(());
        }

        let seconds = ProportionalDistributor::create(&weights).distribute(effort.as_seconds());
        let rescaled: Vec<DayAssignment> = existing
            .iter()
            .zip(seconds)
            .filter(|(_, seconds)| *seconds > 0)
            .map(|(each, seconds)| {
                let duration = EffortDuration::seconds(seconds);
                match each.criteria() {
                    Some(criteria) => {
                        DayAssignment::generic(each.day(), duration, each.resource(), criteria.clone())
                    }
                    None => DayAssignment::specific(each.day(), duration, each.resource()),
                }
            })
            .collect();
        self.reset_assignments_between(start, end, rescaled);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceId;
    use crate::task::Task;
    use tracing_test::traced_test;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn allocation(effort_hours: u64) -> ResourceAllocation {
        let task = Task::new(TaskId(1), "dig", d(2024, 1, 1), d(2024, 1, 3))
            .with_effort(EffortDuration::hours(effort_hours));
        ResourceAllocation::specific(
            Arc::new(task),
            Arc::new(Resource::worker(ResourceId(1), "Ada")),
        )
    }

    #[test]
    fn days_between_is_half_open() {
        let days: Vec<NaiveDate> = days_between(d(2024, 1, 1), d(2024, 1, 4)).collect();
        assert_eq!(days, vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 3)]);
        assert_eq!(days_between(d(2024, 1, 4), d(2024, 1, 1)).count(), 0);
    }

    #[test]
    fn seconds_follow_the_calendar_capacity() {
        let allocation = allocation(0);
        let days = [d(2024, 1, 1), d(2024, 1, 2)];
        let split = seconds_distribution(&allocation, &days, EffortDuration::seconds(7));
        assert_eq!(
            split,
            vec![
                (d(2024, 1, 1), EffortDuration::seconds(3)),
                (d(2024, 1, 2), EffortDuration::seconds(4)),
            ]
        );
    }

    #[traced_test]
    #[test]
    fn shortfalls_are_logged() {
        let mut allocation = allocation(100);
        allocating(vec![ResourcesPerDayModification::create(
            &mut allocation,
            ResourcesPerDay::amount(1),
        )])
        .unwrap()
        .allocate_on_task_length();
        assert_eq!(allocation.shortfall(), Some(EffortDuration::hours(84)));
        assert!(logs_contain("not enough capacity to place the requested effort"));
    }
}
