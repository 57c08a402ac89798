use super::state::{AssignmentContainer, ScenarioAssignments};
use crate::day_assignment::DayAssignment;
use crate::distribution::{Share, ShareDivision};
use crate::effort::EffortDuration;
use crate::resource::{ConfigurationUnitId, Criterion, MachineConfigurationUnit, ResourceId};
use crate::resources_per_day::ResourcesPerDay;
use crate::scenario::ScenarioId;
use std::collections::BTreeSet;

/// Supplies the workers able to run a machine configuration unit.
pub trait WorkerFinder {
    fn find_workers(&self, criteria: &BTreeSet<Criterion>) -> Vec<ResourceId>;
}

/// Worker effort implied by a machine allocation: every machine day
/// assignment scaled by the unit's alpha and split evenly among its workers.
#[derive(Debug, Clone)]
pub struct DerivedAllocation {
    configuration_unit: ConfigurationUnitId,
    machine: ResourceId,
    alpha: ResourcesPerDay,
    workers: Vec<ResourceId>,
    assignments: ScenarioAssignments,
}

impl DerivedAllocation {
    pub fn new(machine: ResourceId, unit: &MachineConfigurationUnit, workers: Vec<ResourceId>) -> Self {
        Self {
            configuration_unit: unit.id,
            machine,
            alpha: unit.alpha,
            workers,
            assignments: ScenarioAssignments::default(),
        }
    }

    pub fn configuration_unit(&self) -> ConfigurationUnitId {
        self.configuration_unit
    }

    pub fn machine(&self) -> ResourceId {
        self.machine
    }

    pub fn alpha(&self) -> ResourcesPerDay {
        self.alpha
    }

    pub fn workers(&self) -> &[ResourceId] {
        &self.workers
    }

    pub fn assignments(&self) -> &[DayAssignment] {
        self.assignments.current().assignments()
    }

    pub fn container(&self) -> &AssignmentContainer {
        self.assignments.current()
    }

    pub(crate) fn regenerate(&mut self, machine_assignments: &[DayAssignment]) {
        let derived = self.derive_from(machine_assignments);
        self.assignments.current_mut().replace(derived);
    }

    fn derive_from(&self, machine_assignments: &[DayAssignment]) -> Vec<DayAssignment> {
        if self.workers.is_empty() {
            return Vec::new();
        }
        let even = ShareDivision::create(vec![Share::new(0); self.workers.len()]);
        let mut result = Vec::new();
        for assignment in machine_assignments {
            let effort = self.alpha.as_duration_given_working_day_of(assignment.duration());
            if effort.is_zero() {
                continue;
            }
            let split = even.to(&even.plus(effort.as_seconds()));
            for (worker, seconds) in self.workers.iter().zip(split) {
                if seconds == 0 {
                    continue;
                }
                let derived = DayAssignment::specific(
                    assignment.day(),
                    EffortDuration::seconds(seconds),
                    *worker,
                );
                result.push(if assignment.is_consolidated() {
                    derived.into_consolidated()
                } else {
                    derived
                });
            }
        }
        result
    }

    pub(crate) fn switch_to(&mut self, scenario: ScenarioId) {
        self.assignments.switch_to(scenario);
    }

    pub(crate) fn copy_between(&mut self, from: ScenarioId, to: ScenarioId) {
        self.assignments.copy_between(from, to);
    }

    pub(crate) fn remove(&mut self, scenario: ScenarioId) {
        self.assignments.remove(scenario);
    }

    pub(crate) fn clone_sharing_history(&self, scenario: ScenarioId) -> Self {
        let container = self
            .assignments
            .container_for(scenario)
            .cloned()
            .unwrap_or_else(|| self.assignments.current().clone());
        Self {
            assignments: ScenarioAssignments::transient(container),
            workers: self.workers.clone(),
            ..*self
        }
    }

    pub(crate) fn merge(&mut self, scenario: ScenarioId, modification: &DerivedAllocation) {
        self.alpha = modification.alpha;
        self.workers = modification.workers.clone();
        self.assignments
            .set_container(scenario, modification.assignments.current().clone());
    }
}
