use crate::allocation::{
    AllocationId, HoursModification, ResourceAllocation, ResourceLoadIndex, WorkerFinder,
    allocating, allocating_hours,
};
use crate::calendar::WorkCalendar;
use crate::distribution::ProportionalDistributor;
use crate::effort::EffortDuration;
use crate::error::{ScenarioError, ScheduleError};
use crate::functions::AssignmentFunction;
use crate::metadata::ScheduleMetadata;
use crate::persistence::{AllocationSnapshot, AllocationStore, PersistenceError, PersistenceResult};
use crate::resource::{Criterion, Resource, ResourceId};
use crate::scenario::{ScenarioId, ScenarioRegistry};
use crate::task::{CalculatedValue, Task, TaskId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub const MASTER_SCENARIO: &str = "master";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReallocationSummary {
    pub task: TaskId,
    pub calculated_value: CalculatedValue,
    pub allocation_count: usize,
    pub end: NaiveDate,
    pub assigned: EffortDuration,
    pub unsatisfied: Vec<AllocationId>,
}

impl ReallocationSummary {
    pub fn is_satisfied(&self) -> bool {
        self.unsatisfied.is_empty()
    }
}

/// `task=.., allocations=.., end=.., assigned=..` plus the unsatisfied ids.
impl fmt::Display for ReallocationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "task={}, allocations={}, end={}, assigned={}",
            self.task, self.allocation_count, self.end, self.assigned
        )?;
        if !self.unsatisfied.is_empty() {
            let ids = self
                .unsatisfied
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            write!(f, ", unsatisfied={ids}")?;
        }
        Ok(())
    }
}

/// Workers that hold every criterion at some point of their history.
struct ResourcePool<'a> {
    resources: &'a HashMap<ResourceId, Arc<Resource>>,
}

impl WorkerFinder for ResourcePool<'_> {
    fn find_workers(&self, criteria: &BTreeSet<Criterion>) -> Vec<ResourceId> {
        let mut found: Vec<ResourceId> = self
            .resources
            .values()
            .filter(|resource| !resource.is_machine())
            .filter(|resource| {
                criteria.iter().all(|criterion| {
                    resource
                        .satisfactions()
                        .iter()
                        .any(|each| &each.criterion == criterion)
                })
            })
            .map(|resource| resource.id())
            .collect();
        found.sort();
        found
    }
}

/// In-memory repository of one project's tasks, resources, scenarios and
/// allocations. Every allocation it holds is bound to the current scenario
/// and reports to a shared load index.
pub struct Schedule {
    metadata: ScheduleMetadata,
    calendar: Option<Arc<WorkCalendar>>,
    scenarios: ScenarioRegistry,
    current_scenario: ScenarioId,
    tasks: BTreeMap<TaskId, Arc<Task>>,
    resources: HashMap<ResourceId, Arc<Resource>>,
    allocations: BTreeMap<AllocationId, ResourceAllocation>,
    load: Arc<ResourceLoadIndex>,
}

impl Default for Schedule {
    fn default() -> Self {
        let mut scenarios = ScenarioRegistry::new();
        let master = scenarios.create_root(MASTER_SCENARIO);
        Self {
            metadata: ScheduleMetadata::default(),
            calendar: None,
            scenarios,
            current_scenario: master,
            tasks: BTreeMap::new(),
            resources: HashMap::new(),
            allocations: BTreeMap::new(),
            load: Arc::new(ResourceLoadIndex::new()),
        }
    }
}

impl Schedule {
    pub fn new(metadata: ScheduleMetadata) -> Result<Self, ScheduleError> {
        metadata.validate()?;
        Ok(Self {
            metadata,
            ..Self::default()
        })
    }

    pub fn metadata(&self) -> &ScheduleMetadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: ScheduleMetadata) -> Result<(), ScheduleError> {
        metadata.validate()?;
        self.metadata = metadata;
        Ok(())
    }

    /// Given to tasks registered without a calendar of their own.
    pub fn set_calendar(&mut self, calendar: WorkCalendar) {
        self.calendar = Some(Arc::new(calendar));
    }

    pub fn calendar(&self) -> Option<&Arc<WorkCalendar>> {
        self.calendar.as_ref()
    }

    pub fn load_index(&self) -> &Arc<ResourceLoadIndex> {
        &self.load
    }

    // Tasks and resources

    pub fn add_task(&mut self, mut task: Task) -> Result<Arc<Task>, ScheduleError> {
        if self.tasks.contains_key(&task.id) {
            return Err(ScheduleError::DuplicateTask(task.id));
        }
        if task.end < task.start {
            return Err(ScheduleError::StartAfterEnd {
                start: task.start,
                end: task.end,
            });
        }
        if task.calendar.is_none() {
            task.calendar = self.calendar.clone();
        }
        let task = Arc::new(task);
        self.tasks.insert(task.id, task.clone());
        debug!(task = %task.id, name = %task.name, "registered task");
        Ok(task)
    }

    pub fn task(&self, id: TaskId) -> Result<&Arc<Task>, ScheduleError> {
        self.tasks.get(&id).ok_or(ScheduleError::UnknownTask(id))
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.tasks.values()
    }

    /// Replaces the task's data; its allocations see it on their next run.
    pub fn update_task(&mut self, task: Task) -> Result<Arc<Task>, ScheduleError> {
        if !self.tasks.contains_key(&task.id) {
            return Err(ScheduleError::UnknownTask(task.id));
        }
        let task = Arc::new(task);
        self.replace_task(task.clone());
        Ok(task)
    }

    fn replace_task(&mut self, task: Arc<Task>) {
        for allocation in self.allocations.values_mut() {
            if allocation.task().id == task.id {
                allocation.set_task(task.clone());
            }
        }
        self.tasks.insert(task.id, task);
    }

    pub fn add_resource(&mut self, resource: Resource) -> Result<Arc<Resource>, ScheduleError> {
        if self.resources.contains_key(&resource.id()) {
            return Err(ScheduleError::DuplicateResource(resource.id()));
        }
        let resource = Arc::new(resource);
        self.resources.insert(resource.id(), resource.clone());
        debug!(resource = %resource.id(), name = %resource.name(), "registered resource");
        Ok(resource)
    }

    pub fn resource(&self, id: ResourceId) -> Result<&Arc<Resource>, ScheduleError> {
        self.resources.get(&id).ok_or(ScheduleError::UnknownResource(id))
    }

    pub fn resources(&self) -> &HashMap<ResourceId, Arc<Resource>> {
        &self.resources
    }

    /// Candidates for a generic allocation, in id order.
    pub fn resources_satisfying(&self, criteria: &BTreeSet<Criterion>) -> Vec<Arc<Resource>> {
        let pool = ResourcePool {
            resources: &self.resources,
        };
        pool.find_workers(criteria)
            .into_iter()
            .filter_map(|id| self.resources.get(&id).cloned())
            .collect()
    }

    // Allocations

    pub fn add_specific_allocation(
        &mut self,
        task: TaskId,
        resource: ResourceId,
    ) -> Result<AllocationId, ScheduleError> {
        let task = self.task(task)?.clone();
        let resource = self.resource(resource)?.clone();
        let mut allocation = ResourceAllocation::specific(task, resource.clone());
        if resource.is_machine() {
            allocation.create_derived(&ResourcePool {
                resources: &self.resources,
            });
        }
        Ok(self.insert_allocation(allocation))
    }

    /// A pool over every registered worker satisfying `criteria`.
    pub fn add_generic_allocation(
        &mut self,
        task: TaskId,
        criteria: BTreeSet<Criterion>,
    ) -> Result<AllocationId, ScheduleError> {
        let task = self.task(task)?.clone();
        let candidates = self.resources_satisfying(&criteria);
        let allocation = ResourceAllocation::generic(task, criteria, candidates);
        Ok(self.insert_allocation(allocation))
    }

    fn insert_allocation(&mut self, mut allocation: ResourceAllocation) -> AllocationId {
        allocation.attach_load_index(self.load.clone());
        allocation.switch_to_scenario(self.current_scenario);
        let id = allocation.id();
        info!(
            allocation = %id,
            task = %allocation.task().id,
            generic = allocation.is_generic(),
            scenario = %self.current_scenario,
            "added allocation"
        );
        self.allocations.insert(id, allocation);
        id
    }

    pub fn allocation(&self, id: AllocationId) -> Result<&ResourceAllocation, ScheduleError> {
        self.allocations.get(&id).ok_or(ScheduleError::UnknownAllocation(id))
    }

    pub fn allocation_mut(&mut self, id: AllocationId) -> Result<&mut ResourceAllocation, ScheduleError> {
        self.allocations
            .get_mut(&id)
            .ok_or(ScheduleError::UnknownAllocation(id))
    }

    pub fn allocations(&self) -> impl Iterator<Item = &ResourceAllocation> {
        self.allocations.values()
    }

    pub fn allocations_of(&self, task: TaskId) -> Vec<&ResourceAllocation> {
        self.allocations
            .values()
            .filter(|allocation| allocation.task().id == task)
            .collect()
    }

    pub fn remove_allocation(&mut self, id: AllocationId) -> Result<ResourceAllocation, ScheduleError> {
        let allocation = self
            .allocations
            .remove(&id)
            .ok_or(ScheduleError::UnknownAllocation(id))?;
        self.load.unregister(id);
        info!(allocation = %id, "removed allocation");
        Ok(allocation)
    }

    pub fn set_assignment_function(
        &mut self,
        id: AllocationId,
        function: AssignmentFunction,
    ) -> Result<(), ScheduleError> {
        self.allocation_mut(id)?
            .set_assignment_function_and_apply(function)?;
        Ok(())
    }

    /// Recomputes every allocation of `task` together. Which of end date,
    /// hours or resources per day moves is the task's calculated value.
    pub fn reallocate(&mut self, task_id: TaskId) -> Result<ReallocationSummary, ScheduleError> {
        let task = self.task(task_id)?.clone();
        let mut allocations: Vec<&mut ResourceAllocation> = self
            .allocations
            .values_mut()
            .filter(|allocation| allocation.task().id == task_id)
            .collect();
        if allocations.is_empty() {
            return Err(ScheduleError::NoAllocationsForTask(task_id));
        }
        let consolidated: EffortDuration = allocations
            .iter()
            .map(|allocation| allocation.consolidated_effort())
            .sum();

        let updated = match task.calculated_value {
            CalculatedValue::EndDate => {
                let effort = task.effort.saturating_minus(consolidated);
                let modifications = allocations
                    .iter_mut()
                    .map(|allocation| allocation.as_resources_per_day_modification())
                    .collect();
                let end = allocating(modifications)?.until_allocating(effort);
                Arc::new(task.with_end(end.max(task.start)))
            }
            CalculatedValue::NumberOfHours => {
                let modifications = allocations
                    .iter_mut()
                    .map(|allocation| allocation.as_resources_per_day_modification())
                    .collect();
                allocating(modifications)?.allocate_until(task.end);
                let mut changed = (*task).clone();
                changed.effort = allocations
                    .iter()
                    .map(|allocation| allocation.assigned_effort())
                    .sum();
                Arc::new(changed)
            }
            CalculatedValue::ResourcesPerDay => {
                let effort = task.effort.saturating_minus(consolidated);
                let weights: Vec<u64> = allocations
                    .iter()
                    .map(|allocation| u64::from(allocation.goal_resources_per_day().hundredths()))
                    .collect();
                let shares = ProportionalDistributor::create(&weights).distribute(effort.as_seconds());
                let modifications = allocations
                    .iter_mut()
                    .zip(shares)
                    .map(|(allocation, seconds)| {
                        HoursModification::create(&mut **allocation, EffortDuration::seconds(seconds))
                    })
                    .collect();
                allocating_hours(modifications)?.allocate();
                task.clone()
            }
        };

        for allocation in allocations.iter_mut() {
            allocation.set_task(updated.clone());
            let shaped = matches!(
                allocation.assignment_function(),
                Some(AssignmentFunction::Stretches(_))
            );
            if shaped {
                allocation.reapply_assignment_function()?;
            }
        }
        let summary = ReallocationSummary {
            task: task_id,
            calculated_value: task.calculated_value,
            allocation_count: allocations.len(),
            end: updated.end,
            assigned: allocations
                .iter()
                .map(|allocation| allocation.assigned_effort())
                .sum(),
            unsatisfied: allocations
                .iter()
                .filter(|allocation| allocation.is_unsatisfied())
                .map(|allocation| allocation.id())
                .collect(),
        };
        self.tasks.insert(task_id, updated);
        info!(
            task = %task_id,
            end = %summary.end,
            assigned = %summary.assigned,
            unsatisfied = summary.unsatisfied.len(),
            "reallocated task"
        );
        Ok(summary)
    }

    /// Locks in the work of `task` up to `until` and records `progress`
    /// percent as done.
    pub fn consolidate(
        &mut self,
        task_id: TaskId,
        until: NaiveDate,
        progress: u32,
    ) -> Result<(), ScheduleError> {
        let task = (**self.task(task_id)?).clone().consolidated(until, progress.min(100));
        self.replace_task(Arc::new(task));
        for allocation in self.allocations.values_mut() {
            if allocation.task().id == task_id {
                allocation.consolidate_until(until);
            }
        }
        info!(task = %task_id, until = %until, progress, "consolidated task");
        Ok(())
    }

    // Trial copies

    /// A transient copy of `id` for edits that may be thrown away. It does
    /// not report to the load index until merged back.
    pub fn try_modification(&self, id: AllocationId) -> Result<ResourceAllocation, ScheduleError> {
        Ok(self.allocation(id)?.copy(self.current_scenario))
    }

    /// Keeps the edits made on a copy from [`Schedule::try_modification`].
    pub fn merge_modification(&mut self, modification: ResourceAllocation) -> Result<AllocationId, ScheduleError> {
        let original = modification
            .copied_from()
            .ok_or(ScheduleError::NotACopy(modification.id()))?;
        let scenario = self.current_scenario;
        let allocation = self
            .allocations
            .get_mut(&original)
            .ok_or(ScheduleError::NotACopy(modification.id()))?;
        allocation.merge_assignments_and_resources_per_day(scenario, &modification);
        self.load.unregister(modification.id());
        info!(allocation = %original, modification = %modification.id(), "merged modification");
        Ok(original)
    }

    // Scenarios

    pub fn scenarios(&self) -> &ScenarioRegistry {
        &self.scenarios
    }

    pub fn current_scenario(&self) -> ScenarioId {
        self.current_scenario
    }

    /// A new scenario starting from the assignments `from` holds.
    pub fn derive_scenario(
        &mut self,
        from: ScenarioId,
        name: Option<String>,
    ) -> Result<ScenarioId, ScheduleError> {
        let derived = self.scenarios.derive(from, name)?;
        for allocation in self.allocations.values_mut() {
            allocation.copy_assignments_from_one_scenario_to_another(from, derived);
        }
        info!(from = %from, scenario = %derived, "derived scenario");
        Ok(derived)
    }

    pub fn switch_scenario(&mut self, scenario: ScenarioId) -> Result<(), ScheduleError> {
        if !self.scenarios.contains(scenario) {
            return Err(ScenarioError::Unknown(scenario).into());
        }
        for allocation in self.allocations.values_mut() {
            allocation.switch_to_scenario(scenario);
        }
        self.current_scenario = scenario;
        info!(scenario = %scenario, "switched scenario");
        Ok(())
    }

    /// Drops the assignments every ancestor of `scenario` keeps.
    pub fn cleanup_predecessors(&mut self, scenario: ScenarioId) -> Result<(), ScheduleError> {
        if !self.scenarios.contains(scenario) {
            return Err(ScenarioError::Unknown(scenario).into());
        }
        for allocation in self.allocations.values_mut() {
            allocation.remove_predecessor_containers_for(&self.scenarios, scenario);
        }
        Ok(())
    }

    // Persistence

    pub fn snapshots(&self) -> Vec<AllocationSnapshot> {
        self.allocations.values().map(AllocationSnapshot::from).collect()
    }

    pub fn save_allocations(&self, store: &dyn AllocationStore) -> PersistenceResult<usize> {
        let snapshots = self.snapshots();
        for snapshot in &snapshots {
            store.save_allocation(snapshot)?;
        }
        info!(count = snapshots.len(), "saved allocations");
        Ok(snapshots.len())
    }

    /// Brings back every stored allocation whose task and resources are
    /// registered. Restored allocations are bound to the current scenario.
    pub fn load_allocations(&mut self, store: &dyn AllocationStore) -> PersistenceResult<usize> {
        let mut loaded = 0;
        for id in store.allocation_ids()? {
            let snapshot = store
                .load_allocation(id)?
                .ok_or(PersistenceError::NotFound(id))?;
            let task = self.tasks.get(&snapshot.task_id).cloned().ok_or_else(|| {
                PersistenceError::InvalidData(format!(
                    "allocation {id} refers to unknown {}",
                    snapshot.task_id
                ))
            })?;
            let mut allocation = snapshot.restore(task, &self.resources, self.current_scenario)?;
            allocation.attach_load_index(self.load.clone());
            allocation.switch_to_scenario(self.current_scenario);
            self.allocations.insert(id, allocation);
            loaded += 1;
        }
        info!(count = loaded, "loaded allocations");
        Ok(loaded)
    }
}
