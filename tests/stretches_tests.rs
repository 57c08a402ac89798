use chrono::NaiveDate;
use schedule_allocation::functions::Interval;
use schedule_allocation::{
    AllocationError, AssignmentFunction, EffortDuration, NoneFunction, Resource, ResourceAllocation,
    ResourceId, ResourcesPerDay, Stretch, StretchesError, StretchesFunction, StretchesFunctionType,
    Task, TaskId,
};
use std::sync::Arc;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ten_day_task() -> Arc<Task> {
    Arc::new(
        Task::new(TaskId(1), "paint", d(2024, 1, 1), d(2024, 1, 11))
            .with_effort(EffortDuration::hours(40)),
    )
}

/// 4h on each of the ten days.
fn half_time_allocation() -> ResourceAllocation {
    let mut allocation = ResourceAllocation::specific(
        ten_day_task(),
        Arc::new(Resource::worker(ResourceId(1), "painter")),
    );
    allocation.allocate(ResourcesPerDay::from_hundredths(50));
    allocation
}

fn effort_between(allocation: &ResourceAllocation, start: NaiveDate, end: NaiveDate) -> EffortDuration {
    allocation
        .assignments_between(start, end)
        .into_iter()
        .map(|each| each.duration())
        .sum()
}

fn thirty_then_seventy(function_type: StretchesFunctionType) -> StretchesFunction {
    let task = ten_day_task();
    StretchesFunction::new(function_type)
        .with_stretch(Stretch::at_length(&task, 0.5, 0.3))
        .with_stretch(Stretch::at_length(&task, 1.0, 1.0))
}

#[test]
fn stretches_fill_each_interval_with_its_share() {
    let mut allocation = half_time_allocation();
    assert_eq!(allocation.assigned_effort(), EffortDuration::hours(40));

    let function = thirty_then_seventy(StretchesFunctionType::Stretches);
    assert_eq!(function.stretches()[0].date, d(2024, 1, 6));
    allocation
        .set_assignment_function_and_apply(function.into())
        .unwrap();

    assert_eq!(effort_between(&allocation, d(2024, 1, 1), d(2024, 1, 6)), EffortDuration::hours(12));
    assert_eq!(effort_between(&allocation, d(2024, 1, 6), d(2024, 1, 11)), EffortDuration::hours(28));
    assert_eq!(allocation.assignments()[0].duration(), EffortDuration::hours_and_minutes(2, 24));
    assert_eq!(allocation.assignments()[9].duration(), EffortDuration::hours_and_minutes(5, 36));
    assert!(allocation.is_satisfied());
    assert_eq!(allocation.assignment_function().map(AssignmentFunction::name), Some("stretches"));
}

#[test]
fn the_rounding_remainder_goes_to_the_first_interval() {
    let task = ten_day_task();
    let stretches = [
        Stretch::at_length(&task, 0.3, 0.33),
        Stretch::at_length(&task, 0.6, 0.66),
        Stretch::at_length(&task, 1.0, 1.0),
    ];
    let intervals = StretchesFunction::intervals_for(&stretches);
    let loads: Vec<u32> = intervals.iter().map(|each| each.load).collect();
    assert_eq!(loads, vec![33, 33, 34]);

    let efforts = StretchesFunction::efforts_per_interval(&intervals, EffortDuration::seconds(10));
    assert_eq!(
        efforts,
        vec![EffortDuration::seconds(4), EffortDuration::seconds(3), EffortDuration::seconds(3)]
    );
}

#[test]
fn intervals_chain_from_stretch_to_stretch() {
    let task = ten_day_task();
    let intervals = StretchesFunction::intervals_for(&[
        Stretch::at_length(&task, 0.5, 0.3),
        Stretch::at_length(&task, 1.0, 1.0),
    ]);
    assert_eq!(
        intervals,
        vec![
            Interval { start: None, end: d(2024, 1, 6), load: 30, read_only: false },
            Interval { start: Some(d(2024, 1, 6)), end: d(2024, 1, 11), load: 70, read_only: false },
        ]
    );
    assert_eq!(intervals[0].start_for(d(2024, 1, 1)), d(2024, 1, 1));
}

#[test]
fn invalid_profiles_are_rejected_and_leave_assignments_alone() {
    let task = ten_day_task();
    let cases = vec![
        (StretchesFunction::default(), StretchesError::Empty),
        (
            StretchesFunction::default()
                .with_stretch(Stretch::at_length(&task, 0.5, 1.5))
                .with_stretch(Stretch::at_length(&task, 1.0, 1.0)),
            StretchesError::PercentageOutOfRange { index: 0 },
        ),
        (
            StretchesFunction::default()
                .with_stretch(Stretch::at_length(&task, 0.5, 0.3))
                .with_stretch(Stretch::at_length(&task, 1.0, 0.9)),
            StretchesError::LastNotComplete,
        ),
        (
            StretchesFunction::default()
                .with_stretch(Stretch::at_length(&task, 0.5, 0.6))
                .with_stretch(Stretch::at_length(&task, 0.7, 0.5))
                .with_stretch(Stretch::at_length(&task, 1.0, 1.0)),
            StretchesError::NotIncreasing { index: 1 },
        ),
    ];

    for (function, expected) in cases {
        let mut allocation = half_time_allocation();
        let before = allocation.assignments().to_vec();
        let result = allocation.set_assignment_function_and_apply(function.into());
        match result {
            Err(AllocationError::Stretches(error)) => assert_eq!(error, expected),
            other => panic!("expected {expected:?}, got {other:?}"),
        }
        assert_eq!(allocation.assignments(), before.as_slice());
        assert!(allocation.assignment_function().is_none());
    }
}

#[test]
fn an_empty_allocation_is_validated_but_left_empty() {
    let mut allocation = ResourceAllocation::specific(
        ten_day_task(),
        Arc::new(Resource::worker(ResourceId(1), "painter")),
    );
    allocation
        .set_assignment_function_and_apply(thirty_then_seventy(StretchesFunctionType::Stretches).into())
        .unwrap();
    assert!(!allocation.has_assignments());

    let result = allocation.set_assignment_function_and_apply(StretchesFunction::default().into());
    assert!(matches!(result, Err(AllocationError::Stretches(StretchesError::Empty))));
}

#[test]
fn interpolation_keeps_the_total_and_follows_the_curve() {
    let mut allocation = half_time_allocation();
    allocation
        .set_assignment_function_and_apply(thirty_then_seventy(StretchesFunctionType::Interpolated).into())
        .unwrap();

    assert_eq!(allocation.assigned_effort(), EffortDuration::hours(40));
    assert!(allocation.is_satisfied());
    let first_half = effort_between(&allocation, d(2024, 1, 1), d(2024, 1, 6));
    let difference = first_half.as_seconds().abs_diff(EffortDuration::hours(12).as_seconds());
    assert!(difference <= 60, "first half got {first_half}");
    let first = allocation.assignments().first().unwrap().duration();
    let last = allocation.assignments().last().unwrap().duration();
    assert!(first < last);
    assert_eq!(allocation.assignment_function().map(AssignmentFunction::name), Some("interpolation"));
}

#[test]
fn the_none_function_flattens_the_profile_again() {
    let mut allocation = half_time_allocation();
    allocation
        .set_assignment_function_and_apply(thirty_then_seventy(StretchesFunctionType::Stretches).into())
        .unwrap();
    allocation
        .set_assignment_function_and_apply(NoneFunction.into())
        .unwrap();

    assert_eq!(allocation.assignments().len(), 10);
    assert!(allocation.assignments().iter().all(|each| each.duration() == EffortDuration::hours(4)));
    assert_eq!(allocation.end_date(), Some(d(2024, 1, 11)));
    assert_eq!(allocation.assignment_function(), Some(&AssignmentFunction::none()));
}

#[test]
fn changing_the_type_keeps_the_stretches() {
    let mut function = thirty_then_seventy(StretchesFunctionType::Stretches);
    function.change_type_to(StretchesFunctionType::Interpolated);
    assert!(function.is_interpolated());
    assert_eq!(function.stretches().len(), 2);

    let last = function.stretches()[1];
    function.remove_stretch(&last);
    assert_eq!(function.stretches().len(), 1);
    function.remove_all_stretches();
    assert!(function.stretches().is_empty());
}

#[test]
fn assignment_functions_serialize_with_their_kind() {
    let function: AssignmentFunction = thirty_then_seventy(StretchesFunctionType::Interpolated).into();
    let json = serde_json::to_string(&function).unwrap();
    assert!(json.contains("\"kind\":\"stretches\""));
    assert!(json.contains("INTERPOLATED"));
    let back: AssignmentFunction = serde_json::from_str(&json).unwrap();
    assert_eq!(back, function);
}
