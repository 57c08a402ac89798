use crate::availability::AvailabilityTimeline;
use crate::calendar::{CalendarRef, CapacityCalendar, DEFAULT_WORKING_DAY_HOURS, WorkCalendar};
use crate::effort::EffortDuration;
use crate::resources_per_day::ResourcesPerDay;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource-{}", self.0)
    }
}

/// A qualification a resource may hold over time, e.g. "welder".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Criterion(String);

impl Criterion {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `criterion` holds on `[start, end)`; an open end holds forever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionSatisfaction {
    pub criterion: Criterion,
    pub start: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl CriterionSatisfaction {
    pub fn new(criterion: Criterion, start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self {
            criterion,
            start,
            end,
        }
    }

    pub fn is_enforced_at(&self, day: NaiveDate) -> bool {
        self.start <= day && self.end.is_none_or(|end| day < end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationUnitId(pub u32);

/// Workers a machine needs while it runs. `alpha` is worker effort per unit
/// of machine effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfigurationUnit {
    pub id: ConfigurationUnitId,
    pub name: String,
    pub alpha: ResourcesPerDay,
    #[serde(default)]
    pub workers: Vec<ResourceId>,
    #[serde(default)]
    pub required_criteria: BTreeSet<Criterion>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceKind {
    Worker,
    Machine {
        configuration_units: Vec<MachineConfigurationUnit>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    id: ResourceId,
    name: String,
    calendar: Option<Arc<WorkCalendar>>,
    satisfactions: Vec<CriterionSatisfaction>,
    kind: ResourceKind,
}

impl Resource {
    pub fn worker(id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            calendar: None,
            satisfactions: Vec::new(),
            kind: ResourceKind::Worker,
        }
    }

    pub fn machine(
        id: ResourceId,
        name: impl Into<String>,
        configuration_units: Vec<MachineConfigurationUnit>,
    ) -> Self {
        Self {
            kind: ResourceKind::Machine {
                configuration_units,
            },
            ..Self::worker(id, name)
        }
    }

    pub fn with_calendar(mut self, calendar: WorkCalendar) -> Self {
        self.calendar = Some(Arc::new(calendar));
        self
    }

    pub fn with_satisfaction(
        mut self,
        criterion: Criterion,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Self {
        self.satisfactions
            .push(CriterionSatisfaction::new(criterion, start, end));
        self
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn calendar(&self) -> Option<&Arc<WorkCalendar>> {
        self.calendar.as_ref()
    }

    /// The resource calendar, or the default working day when it has none.
    pub fn calendar_ref(&self) -> CalendarRef {
        match &self.calendar {
            Some(calendar) => {
                let calendar: CalendarRef = calendar.clone();
                calendar
            }
            None => crate::calendar::default_working_day(),
        }
    }

    pub fn satisfactions(&self) -> &[CriterionSatisfaction] {
        &self.satisfactions
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn is_machine(&self) -> bool {
        matches!(self.kind, ResourceKind::Machine { .. })
    }

    pub fn configuration_units(&self) -> &[MachineConfigurationUnit] {
        match &self.kind {
            ResourceKind::Machine {
                configuration_units,
            } => configuration_units,
            ResourceKind::Worker => &[],
        }
    }

    pub fn capacity_on(&self, day: NaiveDate) -> EffortDuration {
        match &self.calendar {
            Some(calendar) => calendar.capacity_on(day),
            None => EffortDuration::hours(DEFAULT_WORKING_DAY_HOURS),
        }
    }

    pub fn satisfies(&self, criterion: &Criterion, day: NaiveDate) -> bool {
        self.satisfactions
            .iter()
            .any(|each| &each.criterion == criterion && each.is_enforced_at(day))
    }

    pub fn satisfies_all(&self, criteria: &BTreeSet<Criterion>, day: NaiveDate) -> bool {
        criteria.iter().all(|criterion| self.satisfies(criterion, day))
    }
}

/// Builds the availability timelines used to pick resources.
pub struct AvailabilityCalculator;

impl AvailabilityCalculator {
    /// All valid for resources without calendar.
    pub fn calendar_availability(resource: &Resource) -> AvailabilityTimeline {
        match resource.calendar() {
            Some(calendar) => calendar.availability(),
            None => AvailabilityTimeline::all_valid(),
        }
    }

    /// Days on which `resource` satisfies `criterion`. A resource that never
    /// satisfied it is invalid everywhere.
    pub fn criterion_availability(resource: &Resource, criterion: &Criterion) -> AvailabilityTimeline {
        let mut satisfactions: Vec<&CriterionSatisfaction> = resource
            .satisfactions()
            .iter()
            .filter(|each| &each.criterion == criterion)
            .collect();
        satisfactions.sort_by_key(|each| each.start);

        let Some((first, rest)) = satisfactions.split_first() else {
            return AvailabilityTimeline::create_all_invalid();
        };

        let mut result = AvailabilityTimeline::all_valid();
        result.invalid_until(first.start);
        let mut previous_end = first.end;
        for satisfaction in rest {
            let Some(end) = previous_end else {
                return result;
            };
            if end < satisfaction.start {
                result.invalid_at(end, satisfaction.start);
            }
            previous_end = match satisfaction.end {
                Some(next_end) => Some(next_end.max(end)),
                None => None,
            };
        }
        if let Some(end) = previous_end {
            result.invalid_from(end);
        }
        result
    }

    pub fn availability_for(criteria: &BTreeSet<Criterion>, resource: &Resource) -> AvailabilityTimeline {
        criteria.iter().fold(
            Self::calendar_availability(resource),
            |acc, criterion| acc.and(&Self::criterion_availability(resource, criterion)),
        )
    }

    /// Days on which at least one of `resources` can be picked.
    pub fn sum_of_availabilities_for(
        criteria: &BTreeSet<Criterion>,
        resources: &[Arc<Resource>],
    ) -> AvailabilityTimeline {
        resources
            .par_iter()
            .map(|resource| Self::availability_for(criteria, resource))
            .reduce(AvailabilityTimeline::create_all_invalid, |a, b| a.or(&b))
    }
}
