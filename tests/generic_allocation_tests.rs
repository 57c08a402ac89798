use chrono::NaiveDate;
use schedule_allocation::allocation::{
    ResourcesPerDayModification, WorkerFinder, allocating,
};
use schedule_allocation::resource::{ConfigurationUnitId, MachineConfigurationUnit};
use schedule_allocation::{
    AllocationError, Criterion, EffortDuration, Resource, ResourceAllocation, ResourceId,
    ResourceLoadIndex, ResourcesPerDay, ScenarioId, Task, TaskId, WorkCalendar,
};
use std::collections::BTreeSet;
use std::sync::Arc;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn welding() -> Criterion {
    Criterion::new("welding")
}

fn criteria() -> BTreeSet<Criterion> {
    BTreeSet::from([welding()])
}

fn task() -> Arc<Task> {
    Arc::new(
        Task::new(TaskId(1), "weld", d(2024, 1, 1), d(2024, 1, 6))
            .with_effort(EffortDuration::hours(40)),
    )
}

fn welder(id: u32, since: NaiveDate) -> Arc<Resource> {
    Arc::new(Resource::worker(ResourceId(id), format!("welder {id}")).with_satisfaction(welding(), since, None))
}

fn effort_of(allocation: &ResourceAllocation, resource: u32, day: NaiveDate) -> EffortDuration {
    allocation
        .assignments_for(ResourceId(resource))
        .into_iter()
        .filter(|each| each.day() == day)
        .map(|each| each.duration())
        .sum()
}

#[test]
fn an_idle_pool_splits_each_day_evenly() {
    let pool = vec![welder(1, d(2024, 1, 1)), welder(2, d(2024, 1, 1))];
    let mut allocation = ResourceAllocation::generic(task(), criteria(), pool);
    allocating(vec![ResourcesPerDayModification::create(&mut allocation, ResourcesPerDay::amount(1))])
        .unwrap()
        .allocate_on_task_length();

    assert_eq!(allocation.assignments().len(), 10);
    assert!(allocation.assignments().iter().all(|each| each.duration() == EffortDuration::hours(4)));
    assert!(allocation.assignments().iter().all(|each| each.is_generic()));
    assert_eq!(allocation.assignments()[0].criteria(), Some(&criteria()));
    assert_eq!(allocation.associated_resources(), vec![ResourceId(1), ResourceId(2)]);
    assert!(allocation.is_satisfied());
}

#[test]
fn members_only_take_work_while_they_satisfy_the_criteria() {
    let pool = vec![welder(1, d(2024, 1, 1)), welder(2, d(2024, 1, 3))];
    let mut allocation = ResourceAllocation::generic(task(), criteria(), pool);
    allocation.allocate(ResourcesPerDay::amount(1));

    assert_eq!(effort_of(&allocation, 1, d(2024, 1, 1)), EffortDuration::hours(8));
    assert_eq!(effort_of(&allocation, 2, d(2024, 1, 2)), EffortDuration::zero());
    assert_eq!(effort_of(&allocation, 1, d(2024, 1, 3)), EffortDuration::hours(4));
    assert_eq!(effort_of(&allocation, 2, d(2024, 1, 3)), EffortDuration::hours(4));
}

#[test]
fn members_off_work_that_day_receive_nothing() {
    // 2024-01-06 is a Saturday
    let saturday = Arc::new(
        Task::new(TaskId(1), "weld", d(2024, 1, 6), d(2024, 1, 7))
            .with_effort(EffortDuration::hours(16)),
    );
    let weekdays = Arc::new(
        Resource::worker(ResourceId(1), "weekdays")
            .with_calendar(WorkCalendar::default())
            .with_satisfaction(welding(), d(2024, 1, 1), None),
    );
    let pool = vec![weekdays, welder(2, d(2024, 1, 1))];
    let mut allocation = ResourceAllocation::generic(saturday, criteria(), pool);
    allocating(vec![ResourcesPerDayModification::create(&mut allocation, ResourcesPerDay::amount(2))])
        .unwrap()
        .allocate_on_task_length();

    assert!(allocation.assignments_for(ResourceId(1)).is_empty());
    assert_eq!(effort_of(&allocation, 2, d(2024, 1, 6)), EffortDuration::hours(16));
}

#[test]
fn load_from_other_allocations_pushes_work_to_free_members() {
    let index = Arc::new(ResourceLoadIndex::new());
    let a = welder(1, d(2024, 1, 1));
    let b = welder(2, d(2024, 1, 1));

    let mut busy = ResourceAllocation::specific(task(), a.clone()).with_load_index(index.clone());
    busy.switch_to_scenario(ScenarioId(0));
    busy.allocate(ResourcesPerDay::amount(1));
    assert_eq!(index.assigned_effort(ResourceId(1), d(2024, 1, 2)), EffortDuration::hours(8));

    let mut pool = ResourceAllocation::generic(task(), criteria(), vec![a, b]).with_load_index(index);
    allocating(vec![ResourcesPerDayModification::create(&mut pool, ResourcesPerDay::amount(1))])
        .unwrap()
        .allocate_on_task_length();

    assert!(pool.assignments_for(ResourceId(1)).is_empty());
    assert_eq!(pool.assignments_for(ResourceId(2)).len(), 5);
    assert_eq!(pool.assigned_effort(), EffortDuration::hours(40));
}

#[test]
fn a_copy_does_not_count_its_original_twice() {
    let index = Arc::new(ResourceLoadIndex::new());
    let a = welder(1, d(2024, 1, 1));
    let b = welder(2, d(2024, 1, 1));
    let master = ScenarioId(0);

    let mut half_busy = ResourceAllocation::specific(task(), a.clone()).with_load_index(index.clone());
    half_busy.switch_to_scenario(master);
    half_busy.allocate(ResourcesPerDay::from_hundredths(50));

    let mut original = ResourceAllocation::generic(task(), criteria(), vec![a, b]).with_load_index(index.clone());
    original.switch_to_scenario(master);
    original.allocate(ResourcesPerDay::amount(1));
    assert_eq!(effort_of(&original, 1, d(2024, 1, 1)), EffortDuration::hours(2));
    assert_eq!(effort_of(&original, 2, d(2024, 1, 1)), EffortDuration::hours(6));

    let mut copy = original.copy(master);
    assert_eq!(copy.copied_from(), Some(original.id()));
    assert_eq!(copy.assignments(), original.assignments());
    copy.allocate(ResourcesPerDay::amount(1));

    assert_eq!(effort_of(&copy, 1, d(2024, 1, 1)), EffortDuration::hours(2));
    assert_eq!(effort_of(&copy, 2, d(2024, 1, 1)), EffortDuration::hours(6));
    // the transient copy never reports to the shared index
    assert_eq!(index.assigned_effort(ResourceId(2), d(2024, 1, 1)), EffortDuration::hours(6));
}

#[test]
fn a_pool_without_candidates_is_rejected() {
    let mut allocation = ResourceAllocation::generic(task(), criteria(), vec![welder(1, d(2024, 1, 1))]);
    let result = allocating(vec![ResourcesPerDayModification::create_generic(
        &mut allocation,
        ResourcesPerDay::amount(1),
        Vec::new(),
    )]);
    assert!(matches!(result, Err(AllocationError::NoCandidateResources(_))));
}

#[test]
fn the_pool_can_be_replaced_by_the_modification() {
    let mut allocation = ResourceAllocation::generic(task(), criteria(), vec![welder(1, d(2024, 1, 1))]);
    allocating(vec![ResourcesPerDayModification::create_generic(
        &mut allocation,
        ResourcesPerDay::amount(1),
        vec![welder(3, d(2024, 1, 1))],
    )])
    .unwrap()
    .allocate_on_task_length();
    assert_eq!(allocation.associated_resources(), vec![ResourceId(3)]);
    assert_eq!(allocation.resources().len(), 1);
}

struct Operators;

impl WorkerFinder for Operators {
    fn find_workers(&self, _criteria: &BTreeSet<Criterion>) -> Vec<ResourceId> {
        vec![ResourceId(11)]
    }
}

#[test]
fn machine_work_derives_worker_effort() {
    let unit = MachineConfigurationUnit {
        id: ConfigurationUnitId(1),
        name: "press crew".to_string(),
        alpha: ResourcesPerDay::from_hundredths(50),
        workers: vec![ResourceId(10)],
        required_criteria: criteria(),
    };
    let machine = Arc::new(Resource::machine(ResourceId(20), "press", vec![unit]));
    let mut allocation = ResourceAllocation::specific(task(), machine);
    allocation.create_derived(&Operators);
    allocation.allocate(ResourcesPerDay::amount(1));

    let derived = &allocation.derived_allocations()[0];
    assert_eq!(derived.workers(), &[ResourceId(10), ResourceId(11)]);
    assert_eq!(derived.assignments().len(), 10);
    assert!(derived.assignments().iter().all(|each| each.duration() == EffortDuration::hours(2)));
}

#[test]
fn merging_a_machine_copy_replaces_the_derived_worker_effort() {
    let unit = MachineConfigurationUnit {
        id: ConfigurationUnitId(1),
        name: "press crew".to_string(),
        alpha: ResourcesPerDay::from_hundredths(50),
        workers: vec![ResourceId(10)],
        required_criteria: criteria(),
    };
    let machine = Arc::new(Resource::machine(ResourceId(20), "press", vec![unit]));
    let mut allocation = ResourceAllocation::specific(task(), machine);
    allocation.switch_to_scenario(ScenarioId(0));
    allocation.create_derived(&Operators);
    allocation.allocate(ResourcesPerDay::amount(1));

    let mut trial = allocation.copy(ScenarioId(0));
    trial.allocate(ResourcesPerDay::from_hundredths(50));
    assert!(
        trial.derived_allocations()[0]
            .assignments()
            .iter()
            .all(|each| each.duration() == EffortDuration::hours(1))
    );
    assert!(
        allocation.derived_allocations()[0]
            .assignments()
            .iter()
            .all(|each| each.duration() == EffortDuration::hours(2))
    );

    allocation.merge_assignments_and_resources_per_day(ScenarioId(0), &trial);

    assert_eq!(allocation.resources_per_day(), ResourcesPerDay::from_hundredths(50));
    assert_eq!(allocation.assigned_effort(), EffortDuration::hours(20));
    let derived = &allocation.derived_allocations()[0];
    assert_eq!(derived.assignments().len(), 10);
    assert!(derived.assignments().iter().all(|each| each.duration() == EffortDuration::hours(1)));
    assert!(
        derived
            .container()
            .shares_history_with(trial.derived_allocations()[0].container())
    );
}
