use crate::day_assignment::{self, DayAssignment};
use crate::effort::{EffortDuration, IntraDayDate};
use crate::scenario::ScenarioId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

pub(crate) const READ_ONLY_MUTATION: &str = "modifications to assignments can't be done if the scenario on which to work on is not explicitly specified";

static EMPTY_CONTAINER: LazyLock<AssignmentContainer> = LazyLock::new(AssignmentContainer::default);

/// The day assignments of one allocation in one scenario.
///
/// The list sits behind an `Arc` and is replaced wholesale on every write,
/// so clones share it until one of them is modified.
#[derive(Debug, Clone, Default)]
pub struct AssignmentContainer {
    assignments: Arc<Vec<DayAssignment>>,
    intra_day_end: Option<IntraDayDate>,
    shortfall: Option<EffortDuration>,
}

impl AssignmentContainer {
    pub(crate) fn from_parts(
        mut assignments: Vec<DayAssignment>,
        intra_day_end: Option<IntraDayDate>,
        shortfall: Option<EffortDuration>,
    ) -> Self {
        day_assignment::order_by_day(&mut assignments);
        Self {
            assignments: Arc::new(assignments),
            intra_day_end,
            shortfall,
        }
    }

    /// Ordered by day.
    pub fn assignments(&self) -> &[DayAssignment] {
        &self.assignments
    }

    pub fn intra_day_end(&self) -> Option<IntraDayDate> {
        self.intra_day_end
    }

    /// Effort that could not be placed by the last allocation run.
    pub fn shortfall(&self) -> Option<EffortDuration> {
        self.shortfall
    }

    pub fn shares_history_with(&self, other: &AssignmentContainer) -> bool {
        Arc::ptr_eq(&self.assignments, &other.assignments)
    }

    pub(crate) fn replace(&mut self, mut assignments: Vec<DayAssignment>) {
        day_assignment::order_by_day(&mut assignments);
        self.assignments = Arc::new(assignments);
    }

    pub(crate) fn set_intra_day_end(&mut self, end: Option<IntraDayDate>) {
        self.intra_day_end = end;
    }

    pub(crate) fn set_shortfall(&mut self, shortfall: Option<EffortDuration>) {
        self.shortfall = shortfall.filter(|missing| !missing.is_zero());
    }
}

/// Which container reads and writes go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentsState {
    /// Not tied to any scenario yet.
    Transient,
    /// Bound to a scenario; writable.
    Bound(ScenarioId),
    /// Shows a scenario that was never explicitly entered. Any write panics.
    ReadOnly(ScenarioId),
}

/// Per-scenario containers plus the state choosing the live one.
#[derive(Debug, Clone)]
pub struct ScenarioAssignments {
    containers: HashMap<ScenarioId, AssignmentContainer>,
    transient: AssignmentContainer,
    state: AssignmentsState,
}

impl Default for ScenarioAssignments {
    fn default() -> Self {
        Self::transient(AssignmentContainer::default())
    }
}

impl ScenarioAssignments {
    pub(crate) fn transient(container: AssignmentContainer) -> Self {
        Self {
            containers: HashMap::new(),
            transient: container,
            state: AssignmentsState::Transient,
        }
    }

    pub(crate) fn read_only(
        containers: HashMap<ScenarioId, AssignmentContainer>,
        scenario: ScenarioId,
    ) -> Self {
        Self {
            containers,
            transient: AssignmentContainer::default(),
            state: AssignmentsState::ReadOnly(scenario),
        }
    }

    pub fn state(&self) -> AssignmentsState {
        self.state
    }

    pub fn current(&self) -> &AssignmentContainer {
        match self.state {
            AssignmentsState::Transient => &self.transient,
            AssignmentsState::Bound(scenario) | AssignmentsState::ReadOnly(scenario) => self
                .containers
                .get(&scenario)
                .unwrap_or(&EMPTY_CONTAINER),
        }
    }

    /// # Panics
    ///
    /// In the read-only state.
    pub(crate) fn current_mut(&mut self) -> &mut AssignmentContainer {
        match self.state {
            AssignmentsState::Transient => &mut self.transient,
            AssignmentsState::Bound(scenario) => self.containers.entry(scenario).or_default(),
            AssignmentsState::ReadOnly(_) => panic!("{READ_ONLY_MUTATION}"),
        }
    }

    /// Leaving the transient state hands its assignments to `scenario`.
    pub(crate) fn switch_to(&mut self, scenario: ScenarioId) {
        match self.state {
            AssignmentsState::Transient => {
                let container = std::mem::take(&mut self.transient);
                self.containers.insert(scenario, container);
            }
            AssignmentsState::Bound(_) | AssignmentsState::ReadOnly(_) => {
                self.containers.entry(scenario).or_default();
            }
        }
        self.state = AssignmentsState::Bound(scenario);
    }

    pub fn container_for(&self, scenario: ScenarioId) -> Option<&AssignmentContainer> {
        self.containers.get(&scenario)
    }

    pub(crate) fn containers(&self) -> &HashMap<ScenarioId, AssignmentContainer> {
        &self.containers
    }

    pub(crate) fn set_container(&mut self, scenario: ScenarioId, container: AssignmentContainer) {
        self.containers.insert(scenario, container);
    }

    pub fn scenarios(&self) -> Vec<ScenarioId> {
        let mut scenarios: Vec<ScenarioId> = self.containers.keys().copied().collect();
        scenarios.sort();
        scenarios
    }

    pub(crate) fn copy_between(&mut self, from: ScenarioId, to: ScenarioId) {
        let container = self.containers.get(&from).cloned().unwrap_or_default();
        self.containers.insert(to, container);
    }

    pub(crate) fn remove(&mut self, scenario: ScenarioId) {
        self.containers.remove(&scenario);
    }
}
