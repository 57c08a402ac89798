pub mod allocators;
pub mod derived;
pub mod load;
pub mod state;

pub use allocators::{
    AllocationRequest, HoursAllocationRequest, HoursModification, IntervalAllocator,
    ResourcesPerDayModification, UntilAllocator, allocating, allocating_hours,
};
pub use derived::{DerivedAllocation, WorkerFinder};
pub use load::{AssignedHoursDiscounting, DoNothing, OnDayAssignmentRemoval, ResourceLoadIndex};
pub use state::{AssignmentContainer, AssignmentsState, ScenarioAssignments};

use crate::availability::AvailabilityTimeline;
use crate::calendar::{CalendarRef, CapacityCalendar, CombinedWorkHours};
use crate::day_assignment::{self, DayAssignment};
use crate::distribution::{
    AssignedEffortForResource, EffortDistributor, NoAssignedEffort, ResourceSelector,
};
use crate::effort::{EffortDuration, IntraDayDate};
use crate::error::AllocationError;
use crate::functions::AssignmentFunction;
use crate::resource::{AvailabilityCalculator, Criterion, Resource, ResourceId};
use crate::resources_per_day::ResourcesPerDay;
use crate::scenario::{ScenarioId, ScenarioRegistry};
use crate::task::Task;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

static NEXT_ALLOCATION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationId(pub u64);

impl AllocationId {
    /// Process-wide unique.
    pub fn next() -> Self {
        Self(NEXT_ALLOCATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Keeps freshly generated ids clear of one read back from storage.
    pub(crate) fn observe(id: AllocationId) {
        NEXT_ALLOCATION_ID.fetch_max(id.0 + 1, Ordering::Relaxed);
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "allocation-{}", self.0)
    }
}

/// What the allocation draws from.
#[derive(Debug, Clone)]
pub enum AllocationKind {
    /// One named resource.
    Specific(Arc<Resource>),
    /// Any of `candidates` satisfying every criterion on the day.
    Generic {
        criteria: BTreeSet<Criterion>,
        candidates: Vec<Arc<Resource>>,
    },
}

impl AllocationKind {
    pub fn is_generic(&self) -> bool {
        matches!(self, AllocationKind::Generic { .. })
    }
}

/// Picks the candidates of a generic allocation that hold every criterion on
/// the day and whose own calendar lets them work.
struct SatisfyingCriteriaSelector<'a> {
    criteria: &'a BTreeSet<Criterion>,
}

impl ResourceSelector for SatisfyingCriteriaSelector<'_> {
    fn is_selectable(&self, resource: &Resource, day: NaiveDate) -> bool {
        resource.satisfies_all(self.criteria, day)
            && AvailabilityCalculator::calendar_availability(resource).is_valid(day)
    }
}

/// The work of one resource, or one resource pool, on one task, kept per
/// scenario.
pub struct ResourceAllocation {
    id: AllocationId,
    task: Arc<Task>,
    kind: AllocationKind,
    resources_per_day: ResourcesPerDay,
    intended_resources_per_day: Option<ResourcesPerDay>,
    original_total_assignment: EffortDuration,
    assignment_function: Option<AssignmentFunction>,
    assignments: ScenarioAssignments,
    derived: Vec<DerivedAllocation>,
    removal_hook: Arc<dyn OnDayAssignmentRemoval>,
    load_index: Option<Arc<ResourceLoadIndex>>,
    discounted: Vec<AllocationId>,
    copied_from: Option<AllocationId>,
}

impl fmt::Debug for ResourceAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceAllocation")
            .field("id", &self.id)
            .field("task", &self.task.id)
            .field("kind", &self.kind)
            .field("resources_per_day", &self.resources_per_day)
            .field("state", &self.assignments.state())
            .field("assignments", &self.assignments().len())
            .field("copied_from", &self.copied_from)
            .finish()
    }
}

impl ResourceAllocation {
    pub fn specific(task: Arc<Task>, resource: Arc<Resource>) -> Self {
        Self::with_kind(task, AllocationKind::Specific(resource))
    }

    pub fn generic(
        task: Arc<Task>,
        criteria: BTreeSet<Criterion>,
        candidates: Vec<Arc<Resource>>,
    ) -> Self {
        Self::with_kind(
            task,
            AllocationKind::Generic {
                criteria,
                candidates,
            },
        )
    }

    fn with_kind(task: Arc<Task>, kind: AllocationKind) -> Self {
        Self {
            id: AllocationId::next(),
            task,
            kind,
            resources_per_day: ResourcesPerDay::amount(0),
            intended_resources_per_day: None,
            original_total_assignment: EffortDuration::zero(),
            assignment_function: None,
            assignments: ScenarioAssignments::default(),
            derived: Vec::new(),
            removal_hook: Arc::new(DoNothing),
            load_index: None,
            discounted: Vec::new(),
            copied_from: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: AllocationId,
        task: Arc<Task>,
        kind: AllocationKind,
        resources_per_day: ResourcesPerDay,
        intended_resources_per_day: Option<ResourcesPerDay>,
        original_total_assignment: EffortDuration,
        assignment_function: Option<AssignmentFunction>,
        assignments: ScenarioAssignments,
    ) -> Self {
        AllocationId::observe(id);
        Self {
            id,
            resources_per_day,
            intended_resources_per_day,
            original_total_assignment,
            assignment_function,
            assignments,
            ..Self::with_kind(task, kind)
        }
    }

    pub fn with_removal_hook(mut self, hook: Arc<dyn OnDayAssignmentRemoval>) -> Self {
        self.removal_hook = hook;
        self
    }

    /// Load shared with the other allocations of a schedule. Bound
    /// allocations report to it; generic ones discount what others hold.
    pub fn with_load_index(mut self, index: Arc<ResourceLoadIndex>) -> Self {
        self.attach_load_index(index);
        self
    }

    pub fn attach_load_index(&mut self, index: Arc<ResourceLoadIndex>) {
        self.load_index = Some(index);
        self.update_load_index();
    }

    pub fn id(&self) -> AllocationId {
        self.id
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    /// Later allocation runs see the new task dates and calendar.
    pub fn set_task(&mut self, task: Arc<Task>) {
        self.task = task;
    }

    pub fn kind(&self) -> &AllocationKind {
        &self.kind
    }

    pub fn is_generic(&self) -> bool {
        self.kind.is_generic()
    }

    pub fn resource(&self) -> Option<&Arc<Resource>> {
        match &self.kind {
            AllocationKind::Specific(resource) => Some(resource),
            AllocationKind::Generic { .. } => None,
        }
    }

    pub fn criteria(&self) -> Option<&BTreeSet<Criterion>> {
        match &self.kind {
            AllocationKind::Generic { criteria, .. } => Some(criteria),
            AllocationKind::Specific(_) => None,
        }
    }

    /// The named resource, or every candidate of the pool.
    pub fn resources(&self) -> Vec<Arc<Resource>> {
        match &self.kind {
            AllocationKind::Specific(resource) => vec![resource.clone()],
            AllocationKind::Generic { candidates, .. } => candidates.clone(),
        }
    }

    pub(crate) fn set_candidates(&mut self, resources: Vec<Arc<Resource>>) {
        if let AllocationKind::Generic { candidates, .. } = &mut self.kind {
            *candidates = resources;
        }
    }

    pub fn copied_from(&self) -> Option<AllocationId> {
        self.copied_from
    }

    pub fn derived_allocations(&self) -> &[DerivedAllocation] {
        &self.derived
    }

    // Calendars and availability

    /// Specific: the day-by-day minimum of task and resource calendars.
    /// Generic: the task calendar.
    pub fn allocation_calendar(&self) -> CalendarRef {
        match &self.kind {
            AllocationKind::Specific(resource) => {
                CombinedWorkHours::min_of(self.task.calendar_ref(), resource.calendar_ref())
            }
            AllocationKind::Generic { .. } => self.task.calendar_ref(),
        }
    }

    /// Days on which the allocation may receive work at all.
    pub fn availability(&self) -> AvailabilityTimeline {
        let task_availability = self.task.calendar_ref().availability();
        match &self.kind {
            AllocationKind::Specific(resource) => {
                AvailabilityCalculator::calendar_availability(resource).and(&task_availability)
            }
            AllocationKind::Generic {
                criteria,
                candidates,
            } => AvailabilityCalculator::sum_of_availabilities_for(criteria, candidates)
                .and(&task_availability),
        }
    }

    /// Splits `effort` on `day` among the allocation's resources. A generic
    /// pool only uses selectable candidates and, when a load index is
    /// attached, accounts for what other allocations already put on them.
    pub fn distribute_for_day(&self, day: NaiveDate, effort: EffortDuration) -> Vec<DayAssignment> {
        if effort.is_zero() {
            return Vec::new();
        }
        match &self.kind {
            AllocationKind::Specific(resource) => {
                vec![DayAssignment::specific(day, effort, resource.id())]
            }
            AllocationKind::Generic {
                criteria,
                candidates,
            } => {
                let selector = SatisfyingCriteriaSelector { criteria };
                let assigned: Box<dyn AssignedEffortForResource> = match &self.load_index {
                    Some(index) => {
                        let mut excluded = self.discounted.clone();
                        excluded.push(self.id);
                        Box::new(AssignedHoursDiscounting::new(index.clone(), excluded))
                    }
                    None => Box::new(NoAssignedEffort),
                };
                EffortDistributor::new(candidates, assigned.as_ref(), &selector)
                    .distribute_for_day(day, effort)
                    .into_iter()
                    .map(|each| DayAssignment::generic(day, each.duration, each.resource, criteria.clone()))
                    .collect()
            }
        }
    }

    // Queries

    pub fn state(&self) -> AssignmentsState {
        self.assignments.state()
    }

    pub fn scenario_assignments(&self) -> &ScenarioAssignments {
        &self.assignments
    }

    /// Ordered by day.
    pub fn assignments(&self) -> &[DayAssignment] {
        self.assignments.current().assignments()
    }

    pub fn assignments_for(&self, resource: ResourceId) -> Vec<&DayAssignment> {
        self.assignments()
            .iter()
            .filter(|each| each.resource() == resource)
            .collect()
    }

    pub fn assignments_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<&DayAssignment> {
        day_assignment::between(self.assignments(), start, end)
    }

    pub fn assignments_by_resource(&self) -> BTreeMap<ResourceId, Vec<&DayAssignment>> {
        day_assignment::by_resource(self.assignments())
    }

    pub fn consolidated_assignments(&self) -> Vec<&DayAssignment> {
        day_assignment::consolidated(self.assignments())
    }

    pub fn non_consolidated_assignments(&self) -> Vec<&DayAssignment> {
        day_assignment::non_consolidated(self.assignments())
    }

    pub fn has_assignments(&self) -> bool {
        !self.assignments().is_empty()
    }

    pub fn assigned_effort(&self) -> EffortDuration {
        day_assignment::sum(self.assignments())
    }

    pub fn assigned_hours(&self) -> u64 {
        self.assigned_effort().round_to_hours()
    }

    pub fn consolidated_effort(&self) -> EffortDuration {
        day_assignment::sum(self.consolidated_assignments())
    }

    pub fn non_consolidated_effort(&self) -> EffortDuration {
        day_assignment::sum(self.non_consolidated_assignments())
    }

    pub fn associated_resources(&self) -> Vec<ResourceId> {
        day_assignment::resources(self.assignments())
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.assignments().first().map(DayAssignment::day)
    }

    /// Exclusive.
    pub fn end_date(&self) -> Option<NaiveDate> {
        match self.intra_day_end() {
            Some(end) => Some(end.as_exclusive_end()),
            None => self
                .assignments()
                .last()
                .map(|last| last.day() + chrono::Duration::days(1)),
        }
    }

    pub fn intra_day_end(&self) -> Option<IntraDayDate> {
        self.assignments.current().intra_day_end()
    }

    pub fn is_already_finished_by(&self, date: NaiveDate) -> bool {
        self.end_date().is_some_and(|end| end <= date)
    }

    pub fn resources_per_day(&self) -> ResourcesPerDay {
        self.resources_per_day
    }

    pub fn non_consolidated_resources_per_day(&self) -> ResourcesPerDay {
        self.resources_per_day_from(self.non_consolidated_assignments())
    }

    /// The amount asked for by the last allocation run, if it was one.
    pub fn intended_resources_per_day(&self) -> Option<ResourcesPerDay> {
        self.intended_resources_per_day
    }

    pub fn original_total_assignment(&self) -> EffortDuration {
        self.original_total_assignment
    }

    pub fn shortfall(&self) -> Option<EffortDuration> {
        self.assignments.current().shortfall()
    }

    pub fn is_satisfied(&self) -> bool {
        self.has_assignments() && self.shortfall().is_none()
    }

    pub fn is_unsatisfied(&self) -> bool {
        !self.is_satisfied()
    }

    pub fn assignment_function(&self) -> Option<&AssignmentFunction> {
        self.assignment_function.as_ref()
    }

    // Assignment functions

    pub fn set_assignment_function_without_applying(&mut self, function: Option<AssignmentFunction>) {
        self.assignment_function = function;
    }

    /// Stores `function` only once it applied cleanly.
    pub fn set_assignment_function_and_apply(
        &mut self,
        function: AssignmentFunction,
    ) -> Result<(), AllocationError> {
        function.apply_to(self)?;
        self.assignment_function = Some(function);
        Ok(())
    }

    /// Runs the stored function again, e.g. after the total changed.
    pub fn reapply_assignment_function(&mut self) -> Result<(), AllocationError> {
        match self.assignment_function.clone() {
            Some(function) => function.apply_to(self),
            None => Ok(()),
        }
    }

    /// Modification growing this allocation at the rate it currently runs.
    pub fn as_resources_per_day_modification(&mut self) -> ResourcesPerDayModification<'_> {
        let goal = self.goal_resources_per_day();
        ResourcesPerDayModification::create(self, goal)
    }

    pub(crate) fn goal_resources_per_day(&self) -> ResourcesPerDay {
        let current = self.non_consolidated_resources_per_day();
        if !current.is_zero() {
            return current;
        }
        self.intended_resources_per_day
            .filter(|rpd| !rpd.is_zero())
            .unwrap_or(ResourcesPerDay::amount(1))
    }

    // Mutation

    /// Drops every non-consolidated assignment and puts `assignments` in
    /// their place. Consolidated records survive untouched.
    ///
    /// # Panics
    ///
    /// When the allocation is in the read-only state.
    pub fn reset_assignments_to(&mut self, assignments: Vec<DayAssignment>) {
        self.apply_reset(None, assignments, None);
    }

    pub(crate) fn reset_assignments_with_end(
        &mut self,
        assignments: Vec<DayAssignment>,
        intra_day_end: Option<IntraDayDate>,
    ) {
        self.apply_reset(None, assignments, intra_day_end);
    }

    /// Replaces only the non-consolidated assignments in `[start, end)`.
    pub(crate) fn reset_assignments_between(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        assignments: Vec<DayAssignment>,
    ) {
        let assignments = assignments
            .into_iter()
            .filter(|each| each.is_between(start, end))
            .collect();
        self.apply_reset(Some((start, end)), assignments, None);
    }

    fn apply_reset(
        &mut self,
        window: Option<(NaiveDate, NaiveDate)>,
        incoming: Vec<DayAssignment>,
        intra_day_end: Option<IntraDayDate>,
    ) {
        let id = self.id;
        let container = self.assignments.current_mut();
        let (mut kept, removed): (Vec<DayAssignment>, Vec<DayAssignment>) =
            container.assignments().iter().cloned().partition(|each| {
                each.is_consolidated()
                    || window.is_some_and(|(start, end)| !each.is_between(start, end))
            });
        let added = incoming.len();
        kept.extend(incoming.into_iter().filter(|each| !each.is_consolidated()));
        container.replace(kept);
        container.set_intra_day_end(intra_day_end);
        container.set_shortfall(None);

        for assignment in &removed {
            self.removal_hook.on_removal(id, assignment);
        }
        self.after_assignments_changed();
        debug!(
            allocation = %id,
            removed = removed.len(),
            added,
            effort = %self.assigned_effort(),
            "reset day assignments"
        );
    }

    pub(crate) fn record_shortfall(&mut self, missing: EffortDuration) {
        if missing.is_zero() {
            return;
        }
        self.assignments.current_mut().set_shortfall(Some(missing));
        warn!(
            allocation = %self.id,
            task = %self.task.id,
            missing = %missing,
            "not enough capacity to place the requested effort"
        );
    }

    pub(crate) fn set_intended_resources_per_day(&mut self, goal: ResourcesPerDay) {
        self.intended_resources_per_day = Some(goal);
    }

    /// Locks in the work up to and including `day`. Consolidation cannot be
    /// undone.
    pub fn consolidate_until(&mut self, day: NaiveDate) {
        let container = self.assignments.current_mut();
        let assignments: Vec<DayAssignment> = container
            .assignments()
            .iter()
            .cloned()
            .map(|each| {
                if each.day() <= day && !each.is_consolidated() {
                    each.into_consolidated()
                } else {
                    each
                }
            })
            .collect();
        container.replace(assignments);
        self.after_assignments_changed();
        debug!(allocation = %self.id, until = %day, "consolidated day assignments");
    }

    fn after_assignments_changed(&mut self) {
        self.resources_per_day = self.resources_per_day_from(self.assignments());
        self.original_total_assignment = self.calculate_original_total();
        let parent = self.assignments.current().assignments();
        for derived in &mut self.derived {
            derived.regenerate(parent);
        }
        self.update_load_index();
    }

    fn update_load_index(&self) {
        if let (Some(index), AssignmentsState::Bound(_)) = (&self.load_index, self.state()) {
            index.register(self.id, self.assignments());
        }
    }

    /// Assigned effort over what one resource could work on the same days.
    fn resources_per_day_from<'a, I>(&self, assignments: I) -> ResourcesPerDay
    where
        I: IntoIterator<Item = &'a DayAssignment>,
    {
        let mut by_day: BTreeMap<NaiveDate, EffortDuration> = BTreeMap::new();
        for assignment in assignments {
            *by_day.entry(assignment.day()).or_default() += assignment.duration();
        }
        let calendar = self.allocation_calendar();
        let one = ResourcesPerDay::amount(1);
        let (effort, workable) = by_day.into_iter().fold(
            (EffortDuration::zero(), EffortDuration::zero()),
            |(effort, workable), (day, assigned)| {
                (effort + assigned, workable + calendar.as_duration_on(day, one))
            },
        );
        ResourcesPerDay::calculate_from(effort, workable)
    }

    fn calculate_original_total(&self) -> EffortDuration {
        let consolidated = self.consolidated_effort();
        let non_consolidated = self.non_consolidated_effort();
        match self.task.consolidated_progress {
            Some(progress) if progress > 0 => {
                let unconsolidated = 100 - u64::from(progress.min(100));
                if unconsolidated == 0 {
                    consolidated
                } else {
                    EffortDuration::seconds(non_consolidated.as_seconds() * 100 / unconsolidated)
                }
            }
            _ => consolidated + non_consolidated,
        }
    }

    // Derived allocations

    /// One derived allocation per configuration unit of a machine resource.
    /// Workers are the unit's fixed ones plus whatever `finder` supplies for
    /// its required criteria.
    pub fn create_derived(&mut self, finder: &dyn WorkerFinder) {
        let Some(machine) = self.resource().cloned() else {
            return;
        };
        let mut derived = Vec::new();
        for unit in machine.configuration_units() {
            let mut workers = unit.workers.clone();
            if !unit.required_criteria.is_empty() {
                for worker in finder.find_workers(&unit.required_criteria) {
                    if !workers.contains(&worker) {
                        workers.push(worker);
                    }
                }
            }
            let mut allocation = DerivedAllocation::new(machine.id(), unit, workers);
            if let AssignmentsState::Bound(scenario) | AssignmentsState::ReadOnly(scenario) =
                self.state()
            {
                allocation.switch_to(scenario);
            }
            allocation.regenerate(self.assignments());
            derived.push(allocation);
        }
        debug!(allocation = %self.id, derived = derived.len(), "created derived allocations");
        self.derived = derived;
    }

    // Scenarios

    /// Binds the allocation to `scenario`. Leaving the transient state moves
    /// its assignments into that scenario.
    pub fn switch_to_scenario(&mut self, scenario: ScenarioId) {
        self.assignments.switch_to(scenario);
        for derived in &mut self.derived {
            derived.switch_to(scenario);
        }
        self.resources_per_day = self.resources_per_day_from(self.assignments());
        self.original_total_assignment = self.calculate_original_total();
        self.update_load_index();
    }

    /// Shows `scenario` without allowing changes to it.
    pub fn view_read_only(&mut self, scenario: ScenarioId) {
        let containers = self.assignments.containers().clone();
        self.assignments = ScenarioAssignments::read_only(containers, scenario);
    }

    pub fn copy_assignments_from_one_scenario_to_another(&mut self, from: ScenarioId, to: ScenarioId) {
        self.assignments.copy_between(from, to);
        for derived in &mut self.derived {
            derived.copy_between(from, to);
        }
    }

    pub fn remove_containers_for(&mut self, scenario: ScenarioId) {
        self.assignments.remove(scenario);
        for derived in &mut self.derived {
            derived.remove(scenario);
        }
    }

    /// Drops the data kept for every ancestor of `scenario`.
    pub fn remove_predecessor_containers_for(&mut self, registry: &ScenarioRegistry, scenario: ScenarioId) {
        for predecessor in registry.predecessors(scenario) {
            self.remove_containers_for(predecessor);
        }
    }

    /// A transient trial copy for "edit, then keep or discard" workflows.
    ///
    /// | field | in the copy |
    /// |---|---|
    /// | id | fresh |
    /// | task, resources, criteria | shared reference |
    /// | day assignments of `scenario` | shared reference until either side writes |
    /// | intra-day end, shortfall | copied with the container |
    /// | containers of other scenarios | reset to empty |
    /// | resources per day, original total | copied |
    /// | assignment function | deep copied |
    /// | derived allocations | cloned, sharing history the same way |
    /// | load index | shared, read only while transient |
    /// | removal hook | reset to doing nothing |
    ///
    /// The copy discounts the original's load so generic pools do not count
    /// the same work twice.
    pub fn clone_sharing_history(&self, scenario: ScenarioId) -> ResourceAllocation {
        let container = match self.state() {
            AssignmentsState::Transient => self.assignments.current().clone(),
            AssignmentsState::Bound(_) | AssignmentsState::ReadOnly(_) => self
                .assignments
                .container_for(scenario)
                .cloned()
                .unwrap_or_default(),
        };
        let mut discounted = self.discounted.clone();
        discounted.push(self.id);
        let copy = ResourceAllocation {
            id: AllocationId::next(),
            task: self.task.clone(),
            kind: self.kind.clone(),
            resources_per_day: self.resources_per_day,
            intended_resources_per_day: self.intended_resources_per_day,
            original_total_assignment: self.original_total_assignment,
            assignment_function: self.assignment_function.clone(),
            assignments: ScenarioAssignments::transient(container),
            derived: self
                .derived
                .iter()
                .map(|derived| derived.clone_sharing_history(scenario))
                .collect(),
            removal_hook: Arc::new(DoNothing),
            load_index: self.load_index.clone(),
            discounted,
            copied_from: Some(self.id),
        };
        debug!(allocation = %self.id, copy = %copy.id, scenario = %scenario, "copied allocation");
        copy
    }

    /// Same as [`ResourceAllocation::clone_sharing_history`].
    pub fn copy(&self, scenario: ScenarioId) -> ResourceAllocation {
        self.clone_sharing_history(scenario)
    }

    /// Takes over the assignments and function of a trial `modification`,
    /// bound to `scenario`, and derives resources per day again from the
    /// merged assignments. The function is stored without being applied
    /// again. Derived allocations are merged per
    /// configuration unit.
    pub fn merge_assignments_and_resources_per_day(
        &mut self,
        scenario: ScenarioId,
        modification: &ResourceAllocation,
    ) {
        if modification.id == self.id {
            return;
        }
        self.switch_to_scenario(scenario);

        let incoming = modification.assignments.current().clone();
        let removed: Vec<DayAssignment> = self
            .assignments()
            .iter()
            .filter(|each| !incoming.assignments().contains(each))
            .cloned()
            .collect();
        self.assignments.set_container(scenario, incoming);
        for assignment in &removed {
            self.removal_hook.on_removal(self.id, assignment);
        }

        self.task = modification.task.clone();
        self.kind = modification.kind.clone();
        self.intended_resources_per_day = modification.intended_resources_per_day;
        self.assignment_function = modification.assignment_function.clone();
        self.resources_per_day = self.resources_per_day_from(self.assignments());
        self.original_total_assignment = self.calculate_original_total();

        self.merge_derived(scenario, &modification.derived);
        self.update_load_index();
        debug!(
            allocation = %self.id,
            modification = %modification.id,
            scenario = %scenario,
            "merged allocation"
        );
    }

    fn merge_derived(&mut self, scenario: ScenarioId, incoming: &[DerivedAllocation]) {
        self.derived
            .retain(|own| incoming.iter().any(|each| each.configuration_unit() == own.configuration_unit()));
        for modified in incoming {
            match self
                .derived
                .iter_mut()
                .find(|own| own.configuration_unit() == modified.configuration_unit())
            {
                Some(own) => own.merge(scenario, modified),
                None => {
                    let mut added = modified.clone_sharing_history(scenario);
                    added.switch_to(scenario);
                    self.derived.push(added);
                }
            }
        }
    }
}
