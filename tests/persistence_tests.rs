use chrono::NaiveDate;
use schedule_allocation::persistence::{
    AllocationKindSnapshot, load_assignments_from_csv, load_calendar_config,
    load_snapshots_from_json, save_assignments_to_csv, save_calendar_config, save_snapshots_to_json,
};
use schedule_allocation::{
    AllocationId, AllocationSnapshot, AllocationStore, AssignmentsState, CapacityCalendar, Criterion,
    DayAssignment, EffortDuration, InMemoryAllocationStore, PersistenceError, Resource, ResourceId,
    ResourcesPerDay, Schedule, Stretch, StretchesFunction, StretchesFunctionType, Task, TaskId,
    WorkCalendar,
};
use std::collections::BTreeSet;
use std::fs;
use tempfile::tempdir;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn welding() -> BTreeSet<Criterion> {
    BTreeSet::from([Criterion::new("welding")])
}

fn registered_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule
        .add_resource(Resource::worker(ResourceId(1), "Ada"))
        .unwrap();
    schedule
        .add_resource(
            Resource::worker(ResourceId(2), "Grace")
                .with_satisfaction(Criterion::new("welding"), d(2024, 1, 1), None),
        )
        .unwrap();
    schedule
        .add_task(
            Task::new(TaskId(1), "dig", d(2024, 1, 1), d(2024, 1, 11))
                .with_effort(EffortDuration::hours(40)),
        )
        .unwrap();
    schedule
}

/// A specific allocation shaped by stretches plus a generic one.
fn populated_schedule() -> (Schedule, AllocationId, AllocationId) {
    let mut schedule = registered_schedule();
    let task = schedule.task(TaskId(1)).unwrap().clone();
    let specific = schedule.add_specific_allocation(TaskId(1), ResourceId(1)).unwrap();
    let generic = schedule.add_generic_allocation(TaskId(1), welding()).unwrap();
    schedule
        .allocation_mut(specific)
        .unwrap()
        .allocate(ResourcesPerDay::from_hundredths(50));
    schedule
        .allocation_mut(generic)
        .unwrap()
        .allocate(ResourcesPerDay::from_hundredths(25));
    let function = StretchesFunction::new(StretchesFunctionType::Stretches)
        .with_stretch(Stretch::at_length(&task, 0.5, 0.3))
        .with_stretch(Stretch::at_length(&task, 1.0, 1.0));
    schedule.set_assignment_function(specific, function.into()).unwrap();
    schedule.consolidate(TaskId(1), d(2024, 1, 2), 10).unwrap();
    (schedule, specific, generic)
}

#[test]
fn snapshots_carry_kind_containers_and_function() {
    let (schedule, specific, generic) = populated_schedule();
    let snapshots = schedule.snapshots();
    assert_eq!(snapshots.len(), 2);

    let specific = snapshots.iter().find(|each| each.id == specific).unwrap();
    assert_eq!(specific.kind, AllocationKindSnapshot::Specific { resource: ResourceId(1) });
    assert_eq!(specific.containers.len(), 1);
    assert_eq!(specific.containers[0].scenario, schedule.current_scenario());
    assert_eq!(specific.containers[0].assignments.len(), 10);
    assert!(specific.assignment_function.is_some());

    let generic = snapshots.iter().find(|each| each.id == generic).unwrap();
    assert_eq!(
        generic.kind,
        AllocationKindSnapshot::Generic { criteria: welding(), candidates: vec![ResourceId(2)] }
    );
}

#[test]
fn restoring_gives_a_read_only_view_until_a_scenario_is_entered() {
    let (schedule, specific, _) = populated_schedule();
    let original = schedule.allocation(specific).unwrap();
    let snapshot = AllocationSnapshot::from(original);
    let task = schedule.task(TaskId(1)).unwrap().clone();
    let scenario = schedule.current_scenario();

    let mut restored = snapshot.restore(task, schedule.resources(), scenario).unwrap();
    assert_eq!(restored.id(), specific);
    assert_eq!(restored.state(), AssignmentsState::ReadOnly(scenario));
    assert_eq!(restored.assignments(), original.assignments());
    assert_eq!(restored.consolidated_effort(), original.consolidated_effort());
    assert_eq!(restored.assignment_function(), original.assignment_function());
    assert_eq!(restored.resources_per_day(), original.resources_per_day());

    restored.switch_to_scenario(scenario);
    assert_eq!(restored.state(), AssignmentsState::Bound(scenario));
    restored.reset_assignments_to(Vec::new());
    assert_eq!(restored.assignments().len(), 2);
}

#[test]
fn restoring_checks_task_and_resources() {
    let (schedule, specific, _) = populated_schedule();
    let snapshot = AllocationSnapshot::from(schedule.allocation(specific).unwrap());
    let scenario = schedule.current_scenario();

    let other = std::sync::Arc::new(Task::new(TaskId(2), "other", d(2024, 1, 1), d(2024, 1, 2)));
    assert!(matches!(
        snapshot.clone().restore(other, schedule.resources(), scenario),
        Err(PersistenceError::InvalidData(_))
    ));
    let task = schedule.task(TaskId(1)).unwrap().clone();
    assert!(matches!(
        snapshot.restore(task, &Default::default(), scenario),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn duplicate_containers_and_empty_pools_are_invalid() {
    let (schedule, specific, generic) = populated_schedule();
    let mut doubled = AllocationSnapshot::from(schedule.allocation(specific).unwrap());
    let container = doubled.containers[0].clone();
    doubled.containers.push(container);
    assert!(doubled.validate().is_err());

    let mut empty_pool = AllocationSnapshot::from(schedule.allocation(generic).unwrap());
    empty_pool.kind = AllocationKindSnapshot::Generic { criteria: welding(), candidates: Vec::new() };
    let store = InMemoryAllocationStore::new();
    assert!(store.save_allocation(&empty_pool).is_err());
    assert!(store.allocation_ids().unwrap().is_empty());
}

#[test]
fn a_schedule_round_trips_through_the_in_memory_store() {
    let (schedule, specific, generic) = populated_schedule();
    let store = InMemoryAllocationStore::new();
    assert_eq!(schedule.save_allocations(&store).unwrap(), 2);
    assert_eq!(store.allocation_ids().unwrap().len(), 2);

    let mut reloaded = registered_schedule();
    assert_eq!(reloaded.load_allocations(&store).unwrap(), 2);
    for id in [specific, generic] {
        let before = schedule.allocation(id).unwrap();
        let after = reloaded.allocation(id).unwrap();
        assert_eq!(after.assignments(), before.assignments());
        assert_eq!(after.state(), AssignmentsState::Bound(reloaded.current_scenario()));
    }
    assert_eq!(
        reloaded.load_index().assigned_effort(ResourceId(1), d(2024, 1, 9)),
        schedule.load_index().assigned_effort(ResourceId(1), d(2024, 1, 9))
    );

    let fresh = reloaded.add_specific_allocation(TaskId(1), ResourceId(1)).unwrap();
    assert!(fresh > generic && fresh > specific);
}

#[test]
fn loading_needs_the_tasks_registered() {
    let (schedule, _, _) = populated_schedule();
    let store = InMemoryAllocationStore::new();
    schedule.save_allocations(&store).unwrap();

    let mut empty = Schedule::default();
    assert!(matches!(
        empty.load_allocations(&store),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn snapshots_round_trip_through_json_files() {
    let (schedule, _, _) = populated_schedule();
    let dir = tempdir().unwrap();
    let path = dir.path().join("allocations.json");

    let snapshots = schedule.snapshots();
    save_snapshots_to_json(&snapshots, &path).unwrap();
    assert_eq!(load_snapshots_from_json(&path).unwrap(), snapshots);

    let doubled = vec![snapshots[0].clone(), snapshots[0].clone()];
    save_snapshots_to_json(&doubled, &path).unwrap();
    assert!(matches!(
        load_snapshots_from_json(&path),
        Err(PersistenceError::InvalidData(_))
    ));
    assert!(matches!(
        load_snapshots_from_json(dir.path().join("missing.json")),
        Err(PersistenceError::Io(_))
    ));
}

#[test]
fn assignments_round_trip_through_csv() {
    let (schedule, specific, generic) = populated_schedule();
    let mut assignments: Vec<DayAssignment> = schedule.allocation(specific).unwrap().assignments().to_vec();
    assignments.extend_from_slice(schedule.allocation(generic).unwrap().assignments());
    assert!(assignments.iter().any(DayAssignment::is_consolidated));
    assert!(assignments.iter().any(DayAssignment::is_generic));

    let dir = tempdir().unwrap();
    let path = dir.path().join("assignments.csv");
    save_assignments_to_csv(&assignments, &path).unwrap();
    let header = fs::read_to_string(&path).unwrap();
    assert!(header.starts_with("day,resource_id,seconds,consolidated,origin,criteria"));
    assert_eq!(load_assignments_from_csv(&path).unwrap(), assignments);
}

#[test]
fn csv_rows_with_unknown_origins_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("assignments.csv");
    fs::write(
        &path,
        "day,resource_id,seconds,consolidated,origin,criteria\n2024-01-01,1,3600,false,borrowed,\n",
    )
    .unwrap();
    assert!(matches!(
        load_assignments_from_csv(&path),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn calendars_round_trip_through_config_files() {
    let mut calendar = WorkCalendar::default();
    calendar.add_holiday(d(2024, 12, 25));
    calendar.set_capacity_units(2);

    let dir = tempdir().unwrap();
    let path = dir.path().join("calendar.json");
    save_calendar_config(&calendar, &path).unwrap();
    let loaded = load_calendar_config(&path).unwrap();
    assert_eq!(loaded.capacity_on(d(2024, 12, 25)), EffortDuration::zero());
    assert_eq!(loaded.capacity_on(d(2024, 12, 24)), calendar.capacity_on(d(2024, 12, 24)));
    assert_eq!(loaded.capacity_units(), 2);
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use schedule_allocation::persistence::sqlite::SqliteAllocationStore;

    #[test]
    fn a_schedule_round_trips_through_sqlite() {
        let (schedule, specific, generic) = populated_schedule();
        let dir = tempdir().unwrap();
        let path = dir.path().join("allocations.db");
        {
            let store = SqliteAllocationStore::new(&path).unwrap();
            assert_eq!(schedule.save_allocations(&store).unwrap(), 2);
        }

        let store = SqliteAllocationStore::new(&path).unwrap();
        let mut ids = vec![specific, generic];
        ids.sort();
        assert_eq!(store.allocation_ids().unwrap(), ids);
        assert_eq!(store.allocations_of_task(1).unwrap().len(), 2);

        let mut reloaded = registered_schedule();
        reloaded.load_allocations(&store).unwrap();
        assert_eq!(
            reloaded.allocation(specific).unwrap().assignments(),
            schedule.allocation(specific).unwrap().assignments()
        );
    }

    #[test]
    fn saving_twice_replaces_the_row() {
        let (schedule, specific, _) = populated_schedule();
        let store = SqliteAllocationStore::in_memory().unwrap();
        let mut snapshot = AllocationSnapshot::from(schedule.allocation(specific).unwrap());
        store.save_allocation(&snapshot).unwrap();
        snapshot.resources_per_day = ResourcesPerDay::amount(3);
        store.save_allocation(&snapshot).unwrap();

        assert_eq!(store.allocation_ids().unwrap(), vec![specific]);
        assert_eq!(store.load_allocation(specific).unwrap(), Some(snapshot));
        assert!(store.delete_allocation(specific).unwrap());
        assert!(!store.delete_allocation(specific).unwrap());
        assert_eq!(store.load_allocation(specific).unwrap(), None);
    }
}
