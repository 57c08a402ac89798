use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use schedule_allocation::allocation::{AssignmentsState, ResourcesPerDayModification, allocating};
use schedule_allocation::{
    AllocationError, DayAssignment, EffortDuration, HoursModification, IntraDayDate, Resource,
    ResourceAllocation, ResourceId, ResourcesPerDay, ScenarioId, Task, TaskId, WorkCalendar,
    allocating_hours,
};
use std::sync::Arc;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn five_day_task(effort_hours: u64) -> Arc<Task> {
    Arc::new(
        Task::new(TaskId(1), "build", d(2024, 1, 1), d(2024, 1, 6))
            .with_effort(EffortDuration::hours(effort_hours)),
    )
}

fn worker(id: u32) -> Arc<Resource> {
    Arc::new(Resource::worker(ResourceId(id), format!("worker {id}")))
}

fn one() -> ResourcesPerDay {
    ResourcesPerDay::amount(1)
}

#[test]
fn forty_hours_fill_a_five_day_window() {
    let task = five_day_task(40);
    let mut allocation = ResourceAllocation::specific(task.clone(), worker(1));
    allocating(vec![ResourcesPerDayModification::create(&mut allocation, one())])
        .unwrap()
        .allocate_on_task_length();

    let assignments = allocation.assignments();
    assert_eq!(assignments.len(), 5);
    assert!(assignments.iter().all(|each| each.duration() == EffortDuration::hours(8)));
    assert_eq!(allocation.end_date(), Some(task.end));
    assert_eq!(allocation.task().end, d(2024, 1, 6));
    assert!(allocation.is_satisfied());
    assert_eq!(allocation.resources_per_day(), one());
    assert_eq!(allocation.assigned_hours(), 40);
}

#[test]
fn hundred_hours_in_forty_hours_of_capacity_is_a_shortfall_not_an_error() {
    let task = five_day_task(100);
    let mut allocation = ResourceAllocation::specific(task, worker(1));
    allocating(vec![ResourcesPerDayModification::create(&mut allocation, one())])
        .unwrap()
        .allocate_on_task_length();

    assert!(allocation.assigned_effort() <= EffortDuration::hours(40));
    assert!(allocation.is_unsatisfied());
    assert_eq!(allocation.shortfall(), Some(EffortDuration::hours(60)));
    assert!(allocation.has_assignments());
}

#[test]
fn allocate_on_task_length_twice_gives_the_same_assignments() {
    let task = five_day_task(40);
    let mut allocation = ResourceAllocation::specific(task, worker(1));
    allocating(vec![ResourcesPerDayModification::create(&mut allocation, one())])
        .unwrap()
        .allocate_on_task_length();
    let first: Vec<DayAssignment> = allocation.assignments().to_vec();

    allocating(vec![ResourcesPerDayModification::create(&mut allocation, one())])
        .unwrap()
        .allocate_on_task_length();
    assert_eq!(allocation.assignments(), first.as_slice());
}

#[test]
fn until_allocating_returns_an_exclusive_end_inside_the_last_day() {
    let task = five_day_task(0);
    let mut allocation = ResourceAllocation::specific(task, worker(1));
    let end = allocating(vec![ResourcesPerDayModification::create(&mut allocation, one())])
        .unwrap()
        .until_allocating(EffortDuration::hours(30));

    assert_eq!(end, d(2024, 1, 5));
    assert_eq!(allocation.assigned_effort(), EffortDuration::hours(30));
    assert_eq!(
        allocation.intra_day_end(),
        Some(IntraDayDate::new(d(2024, 1, 4), EffortDuration::hours(6)))
    );
    assert_eq!(allocation.end_date(), Some(d(2024, 1, 5)));
    assert_eq!(allocation.intended_resources_per_day(), Some(one()));
}

#[test]
fn until_allocating_on_a_full_last_day_ends_at_the_next_day() {
    let mut allocation = ResourceAllocation::specific(five_day_task(0), worker(1));
    let end = allocating(vec![ResourcesPerDayModification::create(&mut allocation, one())])
        .unwrap()
        .until_allocating_hours(24);
    assert_eq!(end, d(2024, 1, 4));
    assert!(allocation.is_satisfied());
}

#[test]
fn until_allocating_skips_weekends_of_the_resource_calendar() {
    let resource = Arc::new(Resource::worker(ResourceId(1), "weekday").with_calendar(WorkCalendar::default()));
    let mut allocation = ResourceAllocation::specific(five_day_task(0), resource);
    // 2024-01-05 is a Friday
    let end = allocating(vec![ResourcesPerDayModification::create(&mut allocation, one())])
        .unwrap()
        .until_allocating(EffortDuration::hours(48));
    assert_eq!(end, d(2024, 1, 9));
    assert!(allocation.assignments_between(d(2024, 1, 6), d(2024, 1, 8)).is_empty());
}

#[test]
fn until_allocating_stops_when_the_resource_runs_out() {
    let mut calendar = WorkCalendar::every_day(EffortDuration::hours(8));
    calendar.add_activation_period(d(2024, 1, 1), Some(d(2024, 1, 3)));
    let resource = Arc::new(Resource::worker(ResourceId(1), "leaving").with_calendar(calendar));
    let mut allocation = ResourceAllocation::specific(five_day_task(0), resource);
    allocating(vec![ResourcesPerDayModification::create(&mut allocation, one())])
        .unwrap()
        .until_allocating(EffortDuration::hours(40));

    assert_eq!(allocation.assigned_effort(), EffortDuration::hours(16));
    assert_eq!(allocation.shortfall(), Some(EffortDuration::hours(24)));
    assert!(allocation.is_unsatisfied());
}

#[test]
fn half_a_resource_per_day_doubles_the_duration() {
    let mut allocation = ResourceAllocation::specific(five_day_task(0), worker(1));
    let end = allocating(vec![ResourcesPerDayModification::create(
        &mut allocation,
        ResourcesPerDay::from_hundredths(50),
    )])
    .unwrap()
    .until_allocating(EffortDuration::hours(16));
    assert_eq!(end, d(2024, 1, 5));
    assert_eq!(allocation.resources_per_day(), ResourcesPerDay::from_hundredths(50));
}

#[test]
fn two_allocations_share_the_growth_of_one_task() {
    let task = five_day_task(0);
    let mut first = ResourceAllocation::specific(task.clone(), worker(1));
    let mut second = ResourceAllocation::specific(task, worker(2));
    let end = allocating(vec![
        ResourcesPerDayModification::create(&mut first, one()),
        ResourcesPerDayModification::create(&mut second, one()),
    ])
    .unwrap()
    .until_allocating(EffortDuration::hours(32));

    assert_eq!(end, d(2024, 1, 3));
    assert_eq!(first.assigned_effort() + second.assigned_effort(), EffortDuration::hours(32));
}

#[test]
fn validation_rejects_bad_requests_before_touching_anything() {
    let other_task = Arc::new(Task::new(TaskId(2), "other", d(2024, 1, 1), d(2024, 1, 6)));
    let mut first = ResourceAllocation::specific(five_day_task(40), worker(1));
    let mut second = ResourceAllocation::specific(other_task, worker(2));

    assert!(matches!(allocating(Vec::new()), Err(AllocationError::NoAllocations)));
    assert!(matches!(
        allocating(vec![ResourcesPerDayModification::create(&mut first, ResourcesPerDay::amount(0))]),
        Err(AllocationError::ZeroResourcesPerDay(_))
    ));
    assert!(matches!(
        allocating(vec![
            ResourcesPerDayModification::create(&mut first, one()),
            ResourcesPerDayModification::create(&mut second, one()),
        ]),
        Err(AllocationError::MixedTasks { .. })
    ));
    assert!(!first.has_assignments());
    assert!(!second.has_assignments());
    assert!(matches!(
        first.on_interval(d(2024, 1, 5), d(2024, 1, 2)),
        Err(AllocationError::EndBeforeStart { .. })
    ));
}

#[test]
fn consolidated_assignments_survive_every_reallocation() {
    let task = five_day_task(40);
    let mut allocation = ResourceAllocation::specific(task.clone(), worker(1));
    allocation.allocate(one());
    allocation.set_task(Arc::new((*task).clone().consolidated(d(2024, 1, 2), 40)));
    allocation.consolidate_until(d(2024, 1, 2));
    let locked: Vec<DayAssignment> = allocation
        .consolidated_assignments()
        .into_iter()
        .cloned()
        .collect();
    assert_eq!(locked.len(), 2);

    allocation.reset_assignments_to(vec![DayAssignment::specific(
        d(2024, 1, 4),
        EffortDuration::hours(2),
        ResourceId(1),
    )]);
    for each in &locked {
        assert!(allocation.assignments().contains(each));
    }

    allocating(vec![ResourcesPerDayModification::create(&mut allocation, one())])
        .unwrap()
        .allocate_on_task_length();
    for each in &locked {
        assert!(allocation.assignments().contains(each));
    }
    assert!(allocation.assignments_between(d(2024, 1, 1), d(2024, 1, 3)).iter().all(|each| each.is_consolidated()));
    assert_eq!(allocation.consolidated_effort(), EffortDuration::hours(16));
    assert_eq!(allocation.non_consolidated_effort(), EffortDuration::hours(24));
    assert!(allocation.is_satisfied());
}

#[test]
fn original_total_follows_the_consolidated_progress() {
    let task = five_day_task(40);
    let mut allocation = ResourceAllocation::specific(task.clone(), worker(1));
    allocation.allocate(one());
    allocation.set_task(Arc::new((*task).clone().consolidated(d(2024, 1, 2), 50)));
    allocation.consolidate_until(d(2024, 1, 2));
    // 24h left stand for the remaining 50%
    assert_eq!(allocation.original_total_assignment(), EffortDuration::hours(48));
}

#[test]
fn interval_allocation_keeps_the_outside_untouched() {
    let mut allocation = ResourceAllocation::specific(five_day_task(40), worker(1));
    allocation.allocate(one());
    allocation
        .on_interval(d(2024, 1, 2), d(2024, 1, 4))
        .unwrap()
        .allocate_hours(4);

    let by_day: Vec<(NaiveDate, EffortDuration)> = allocation
        .assignments()
        .iter()
        .map(|each| (each.day(), each.duration()))
        .collect();
    assert_eq!(
        by_day,
        vec![
            (d(2024, 1, 1), EffortDuration::hours(8)),
            (d(2024, 1, 2), EffortDuration::hours(2)),
            (d(2024, 1, 3), EffortDuration::hours(2)),
            (d(2024, 1, 4), EffortDuration::hours(8)),
            (d(2024, 1, 5), EffortDuration::hours(8)),
        ]
    );
}

#[test]
fn interval_allocation_leaves_unavailable_days_out() {
    let resource = Arc::new(Resource::worker(ResourceId(1), "weekday").with_calendar(WorkCalendar::default()));
    let task = Arc::new(Task::new(TaskId(1), "week", d(2024, 1, 1), d(2024, 1, 15)));
    let mut allocation = ResourceAllocation::specific(task, resource);
    allocation
        .from_start_until(d(2024, 1, 8))
        .allocate(EffortDuration::hours(10));
    assert_eq!(allocation.assignments().len(), 5);
    assert!(allocation.assignments().iter().all(|each| each.day() < d(2024, 1, 6)));
    assert_eq!(allocation.assigned_effort(), EffortDuration::hours(10));
}

#[test]
fn resources_per_day_is_zero_when_no_assigned_day_is_workable() {
    let resource = Arc::new(Resource::worker(ResourceId(1), "weekday").with_calendar(WorkCalendar::default()));
    let task = Arc::new(Task::new(TaskId(1), "weekend", d(2024, 1, 1), d(2024, 1, 8)));
    let mut allocation = ResourceAllocation::specific(task, resource);
    // 2024-01-06 and 2024-01-07 are a Saturday and a Sunday
    allocation.reset_assignments_to(vec![
        DayAssignment::specific(d(2024, 1, 6), EffortDuration::hours(4), ResourceId(1)),
        DayAssignment::specific(d(2024, 1, 7), EffortDuration::hours(2), ResourceId(1)),
    ]);
    assert_eq!(allocation.resources_per_day(), ResourcesPerDay::amount(0));
    assert_eq!(allocation.assigned_effort(), EffortDuration::hours(6));
}

#[test]
fn copies_share_assignments_until_their_first_write() {
    let mut original = ResourceAllocation::specific(five_day_task(40), worker(1));
    original.switch_to_scenario(ScenarioId(0));
    original.allocate(one());

    let mut copy = original.copy(ScenarioId(0));
    assert_ne!(copy.id(), original.id());
    assert_eq!(copy.state(), AssignmentsState::Transient);
    assert!(
        copy.scenario_assignments()
            .current()
            .shares_history_with(original.scenario_assignments().current())
    );
    assert!(std::ptr::eq(copy.assignments().as_ptr(), original.assignments().as_ptr()));

    allocating(vec![ResourcesPerDayModification::create(&mut copy, one())])
        .unwrap()
        .until_allocating_hours(16);

    assert!(
        !copy
            .scenario_assignments()
            .current()
            .shares_history_with(original.scenario_assignments().current())
    );
    assert_eq!(copy.assignments().len(), 2);
    assert_eq!(original.assignments().len(), 5);
    assert_eq!(original.assigned_effort(), EffortDuration::hours(40));
}

#[test]
fn keeping_proportions_rescales_the_existing_shape() {
    let mut allocation = ResourceAllocation::specific(five_day_task(0), worker(1));
    allocation.reset_assignments_to(vec![
        DayAssignment::specific(d(2024, 1, 1), EffortDuration::hours(2), ResourceId(1)),
        DayAssignment::specific(d(2024, 1, 2), EffortDuration::hours(6), ResourceId(1)),
    ]);
    allocation
        .allocate_keeping_proportions(d(2024, 1, 1), d(2024, 1, 3), EffortDuration::hours(4))
        .unwrap();
    let durations: Vec<EffortDuration> = allocation.assignments().iter().map(|each| each.duration()).collect();
    assert_eq!(durations, vec![EffortDuration::hours(1), EffortDuration::hours(3)]);
}

#[test]
fn hours_modifications_spread_fixed_hours_over_the_window() {
    let task = five_day_task(0);
    let mut first = ResourceAllocation::specific(task.clone(), worker(1));
    let mut second = ResourceAllocation::specific(task, worker(2));
    allocating_hours(vec![
        HoursModification::hours(&mut first, 10),
        HoursModification::hours(&mut second, 20),
    ])
    .unwrap()
    .allocate();
    assert_eq!(first.assigned_effort(), EffortDuration::hours(10));
    assert_eq!(second.assigned_effort(), EffortDuration::hours(20));
    assert_eq!(first.assignments().len(), 5);
    assert_eq!(second.resources_per_day(), ResourcesPerDay::from_hundredths(50));
}

#[test]
fn queries_group_and_filter_assignments() {
    let mut allocation = ResourceAllocation::specific(five_day_task(40), worker(7));
    allocation.allocate(one());
    assert_eq!(allocation.associated_resources(), vec![ResourceId(7)]);
    assert_eq!(allocation.assignments_for(ResourceId(7)).len(), 5);
    assert!(allocation.assignments_for(ResourceId(8)).is_empty());
    assert_eq!(allocation.assignments_between(d(2024, 1, 2), d(2024, 1, 4)).len(), 2);
    assert_eq!(allocation.start_date(), Some(d(2024, 1, 1)));
    assert!(allocation.is_already_finished_by(d(2024, 1, 6)));
    assert!(!allocation.is_already_finished_by(d(2024, 1, 5)));
    assert_eq!(allocation.state(), AssignmentsState::Transient);
}

#[test]
#[should_panic(expected = "modifications to assignments can't be done if the scenario on which to work on is not explicitly specified")]
fn mutating_a_read_only_view_panics() {
    let mut allocation = ResourceAllocation::specific(five_day_task(40), worker(1));
    allocation.switch_to_scenario(ScenarioId(0));
    allocation.allocate(one());
    allocation.view_read_only(ScenarioId(0));
    assert_eq!(allocation.assignments().len(), 5);
    allocation.reset_assignments_to(Vec::new());
}

proptest! {
    #[test]
    fn until_allocating_places_exactly_what_was_asked(seconds in 1u64..(400 * 3600), half in any::<bool>()) {
        let mut allocation = ResourceAllocation::specific(five_day_task(0), worker(1));
        let goal = if half { ResourcesPerDay::from_hundredths(50) } else { one() };
        let end = allocating(vec![ResourcesPerDayModification::create(&mut allocation, goal)])
            .unwrap()
            .until_allocating(EffortDuration::seconds(seconds));
        prop_assert_eq!(allocation.assigned_effort(), EffortDuration::seconds(seconds));
        prop_assert!(allocation.is_satisfied());
        prop_assert!(end > d(2024, 1, 1));
        prop_assert!(end <= d(2024, 1, 1) + Duration::days(400));
    }
}
