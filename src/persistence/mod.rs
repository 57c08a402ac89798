use crate::allocation::{
    AllocationId, AllocationKind, AssignmentContainer, ResourceAllocation, ScenarioAssignments,
};
use crate::day_assignment::DayAssignment;
use crate::effort::{EffortDuration, IntraDayDate};
use crate::functions::AssignmentFunction;
use crate::resource::{Criterion, Resource, ResourceId};
use crate::resources_per_day::ResourcesPerDay;
use crate::scenario::ScenarioId;
use crate::task::{Task, TaskId};
use parking_lot::RwLock;
use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("dataframe conversion error: {0}")]
    DataFrame(#[from] PolarsError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("no allocation {0} stored")]
    NotFound(AllocationId),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// What an allocation draws from, by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AllocationKindSnapshot {
    Specific {
        resource: ResourceId,
    },
    Generic {
        criteria: BTreeSet<Criterion>,
        candidates: Vec<ResourceId>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub scenario: ScenarioId,
    pub assignments: Vec<DayAssignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intra_day_end: Option<IntraDayDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<EffortDuration>,
}

/// The persisted form of an allocation: one container per scenario it was
/// bound to. Transient assignments are not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSnapshot {
    pub id: AllocationId,
    pub task_id: TaskId,
    pub kind: AllocationKindSnapshot,
    pub resources_per_day: ResourcesPerDay,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intended_resources_per_day: Option<ResourcesPerDay>,
    pub original_total_assignment: EffortDuration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_function: Option<AssignmentFunction>,
    #[serde(default)]
    pub containers: Vec<ContainerSnapshot>,
}

impl From<&ResourceAllocation> for AllocationSnapshot {
    fn from(allocation: &ResourceAllocation) -> Self {
        let kind = match allocation.kind() {
            AllocationKind::Specific(resource) => AllocationKindSnapshot::Specific {
                resource: resource.id(),
            },
            AllocationKind::Generic {
                criteria,
                candidates,
            } => AllocationKindSnapshot::Generic {
                criteria: criteria.clone(),
                candidates: candidates.iter().map(|each| each.id()).collect(),
            },
        };
        let scenario_assignments = allocation.scenario_assignments();
        let containers = scenario_assignments
            .scenarios()
            .into_iter()
            .filter_map(|scenario| {
                scenario_assignments
                    .container_for(scenario)
                    .map(|container| ContainerSnapshot {
                        scenario,
                        assignments: container.assignments().to_vec(),
                        intra_day_end: container.intra_day_end(),
                        shortfall: container.shortfall(),
                    })
            })
            .collect();
        Self {
            id: allocation.id(),
            task_id: allocation.task().id,
            kind,
            resources_per_day: allocation.resources_per_day(),
            intended_resources_per_day: allocation.intended_resources_per_day(),
            original_total_assignment: allocation.original_total_assignment(),
            assignment_function: allocation.assignment_function().cloned(),
            containers,
        }
    }
}

impl AllocationSnapshot {
    pub fn validate(&self) -> PersistenceResult<()> {
        let mut scenarios = HashSet::with_capacity(self.containers.len());
        for container in &self.containers {
            if !scenarios.insert(container.scenario) {
                return Err(PersistenceError::InvalidData(format!(
                    "allocation {} has two containers for {}",
                    self.id, container.scenario
                )));
            }
        }
        if let AllocationKindSnapshot::Generic { candidates, .. } = &self.kind {
            if candidates.is_empty() {
                return Err(PersistenceError::InvalidData(format!(
                    "generic allocation {} has no candidates",
                    self.id
                )));
            }
        }
        Ok(())
    }

    /// Rebuilds the allocation showing `scenario` read only. Switching to a
    /// scenario explicitly makes it writable again.
    pub fn restore(
        self,
        task: Arc<Task>,
        resources: &HashMap<ResourceId, Arc<Resource>>,
        scenario: ScenarioId,
    ) -> PersistenceResult<ResourceAllocation> {
        self.validate()?;
        if task.id != self.task_id {
            return Err(PersistenceError::InvalidData(format!(
                "allocation {} belongs to {}, not {}",
                self.id, self.task_id, task.id
            )));
        }
        let resolve = |id: ResourceId| {
            resources.get(&id).cloned().ok_or_else(|| {
                PersistenceError::InvalidData(format!("allocation {} uses unknown {id}", self.id))
            })
        };
        let kind = match &self.kind {
            AllocationKindSnapshot::Specific { resource } => {
                AllocationKind::Specific(resolve(*resource)?)
            }
            AllocationKindSnapshot::Generic {
                criteria,
                candidates,
            } => AllocationKind::Generic {
                criteria: criteria.clone(),
                candidates: candidates
                    .iter()
                    .map(|id| resolve(*id))
                    .collect::<PersistenceResult<_>>()?,
            },
        };
        let containers = self
            .containers
            .into_iter()
            .map(|container| {
                (
                    container.scenario,
                    AssignmentContainer::from_parts(
                        container.assignments,
                        container.intra_day_end,
                        container.shortfall,
                    ),
                )
            })
            .collect();
        Ok(ResourceAllocation::from_parts(
            self.id,
            task,
            kind,
            self.resources_per_day,
            self.intended_resources_per_day,
            self.original_total_assignment,
            self.assignment_function,
            ScenarioAssignments::read_only(containers, scenario),
        ))
    }
}

pub trait AllocationStore {
    fn save_allocation(&self, snapshot: &AllocationSnapshot) -> PersistenceResult<()>;
    fn load_allocation(&self, id: AllocationId) -> PersistenceResult<Option<AllocationSnapshot>>;
    fn allocation_ids(&self) -> PersistenceResult<Vec<AllocationId>>;
}

/// Keeps snapshots in memory; stands in for a database in tests.
#[derive(Debug, Default)]
pub struct InMemoryAllocationStore {
    snapshots: RwLock<BTreeMap<AllocationId, AllocationSnapshot>>,
}

impl InMemoryAllocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AllocationStore for InMemoryAllocationStore {
    fn save_allocation(&self, snapshot: &AllocationSnapshot) -> PersistenceResult<()> {
        snapshot.validate()?;
        self.snapshots.write().insert(snapshot.id, snapshot.clone());
        Ok(())
    }

    fn load_allocation(&self, id: AllocationId) -> PersistenceResult<Option<AllocationSnapshot>> {
        Ok(self.snapshots.read().get(&id).cloned())
    }

    fn allocation_ids(&self) -> PersistenceResult<Vec<AllocationId>> {
        Ok(self.snapshots.read().keys().copied().collect())
    }
}

#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod file;

pub use file::{
    load_assignments_from_csv, load_calendar_config, load_snapshots_from_json,
    save_assignments_to_csv, save_calendar_config, save_snapshots_to_json,
};
