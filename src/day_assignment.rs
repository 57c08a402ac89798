use crate::effort::EffortDuration;
use crate::resource::{Criterion, ResourceId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Why a resource got the work: named directly, or picked for its criteria.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum AssignmentOrigin {
    Specific,
    Generic { criteria: BTreeSet<Criterion> },
}

/// Effort one resource puts into one allocation on one day.
///
/// Immutable apart from consolidation, which only goes one way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayAssignment {
    day: NaiveDate,
    duration: EffortDuration,
    resource: ResourceId,
    #[serde(default)]
    consolidated: bool,
    #[serde(flatten)]
    origin: AssignmentOrigin,
}

impl DayAssignment {
    pub fn specific(day: NaiveDate, duration: EffortDuration, resource: ResourceId) -> Self {
        Self {
            day,
            duration,
            resource,
            consolidated: false,
            origin: AssignmentOrigin::Specific,
        }
    }

    pub fn generic(
        day: NaiveDate,
        duration: EffortDuration,
        resource: ResourceId,
        criteria: BTreeSet<Criterion>,
    ) -> Self {
        Self {
            day,
            duration,
            resource,
            consolidated: false,
            origin: AssignmentOrigin::Generic { criteria },
        }
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn duration(&self) -> EffortDuration {
        self.duration
    }

    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    pub fn is_consolidated(&self) -> bool {
        self.consolidated
    }

    pub fn origin(&self) -> &AssignmentOrigin {
        &self.origin
    }

    pub fn is_generic(&self) -> bool {
        matches!(self.origin, AssignmentOrigin::Generic { .. })
    }

    pub fn criteria(&self) -> Option<&BTreeSet<Criterion>> {
        match &self.origin {
            AssignmentOrigin::Generic { criteria } => Some(criteria),
            AssignmentOrigin::Specific => None,
        }
    }

    pub fn is_between(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.day && self.day < end
    }

    pub(crate) fn into_consolidated(mut self) -> Self {
        self.consolidated = true;
        self
    }
}

pub fn sum<'a, I>(assignments: I) -> EffortDuration
where
    I: IntoIterator<Item = &'a DayAssignment>,
{
    assignments.into_iter().map(DayAssignment::duration).sum()
}

pub fn by_day(assignments: &[DayAssignment]) -> BTreeMap<NaiveDate, Vec<&DayAssignment>> {
    let mut result: BTreeMap<NaiveDate, Vec<&DayAssignment>> = BTreeMap::new();
    for assignment in assignments {
        result.entry(assignment.day).or_default().push(assignment);
    }
    result
}

/// Per resource, each list ordered by day.
pub fn by_resource(assignments: &[DayAssignment]) -> BTreeMap<ResourceId, Vec<&DayAssignment>> {
    let mut result: BTreeMap<ResourceId, Vec<&DayAssignment>> = BTreeMap::new();
    for assignment in assignments {
        result.entry(assignment.resource).or_default().push(assignment);
    }
    for list in result.values_mut() {
        list.sort_by_key(|each| each.day);
    }
    result
}

pub fn by_criteria(
    assignments: &[DayAssignment],
) -> BTreeMap<BTreeSet<Criterion>, Vec<&DayAssignment>> {
    let mut result: BTreeMap<BTreeSet<Criterion>, Vec<&DayAssignment>> = BTreeMap::new();
    for assignment in assignments {
        if let Some(criteria) = assignment.criteria() {
            result.entry(criteria.clone()).or_default().push(assignment);
        }
    }
    result
}

pub fn between(assignments: &[DayAssignment], start: NaiveDate, end: NaiveDate) -> Vec<&DayAssignment> {
    assignments
        .iter()
        .filter(|each| each.is_between(start, end))
        .collect()
}

pub fn consolidated(assignments: &[DayAssignment]) -> Vec<&DayAssignment> {
    assignments.iter().filter(|each| each.consolidated).collect()
}

pub fn non_consolidated(assignments: &[DayAssignment]) -> Vec<&DayAssignment> {
    assignments.iter().filter(|each| !each.consolidated).collect()
}

/// Distinct resources in order of first appearance.
pub fn resources(assignments: &[DayAssignment]) -> Vec<ResourceId> {
    let mut seen = BTreeSet::new();
    assignments
        .iter()
        .map(DayAssignment::resource)
        .filter(|resource| seen.insert(*resource))
        .collect()
}

/// Stable, so assignments of one day keep the order they were produced in.
pub fn order_by_day(assignments: &mut [DayAssignment]) {
    assignments.sort_by_key(|each| each.day);
}
