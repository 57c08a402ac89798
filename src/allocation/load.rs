use super::AllocationId;
use crate::day_assignment::DayAssignment;
use crate::distribution::AssignedEffortForResource;
use crate::effort::EffortDuration;
use crate::resource::ResourceId;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Called once for each day assignment an allocation drops.
pub trait OnDayAssignmentRemoval: Send + Sync {
    fn on_removal(&self, allocation: AllocationId, assignment: &DayAssignment);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DoNothing;

impl OnDayAssignmentRemoval for DoNothing {
    fn on_removal(&self, _allocation: AllocationId, _assignment: &DayAssignment) {}
}

type DayLoad = Vec<(AllocationId, EffortDuration)>;

/// Load per resource and day across every allocation that reported to it.
///
/// Shared by the allocations of a schedule: their removal hook detaches
/// dropped records and each reset adds the new ones.
#[derive(Debug, Default)]
pub struct ResourceLoadIndex {
    load: RwLock<HashMap<ResourceId, BTreeMap<NaiveDate, DayLoad>>>,
}

impl ResourceLoadIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces everything known about `allocation` with `assignments`.
    pub fn register(&self, allocation: AllocationId, assignments: &[DayAssignment]) {
        let mut load = self.load.write();
        Self::remove_allocation(&mut load, allocation);
        for assignment in assignments {
            Self::insert(&mut load, allocation, assignment);
        }
    }

    pub fn add(&self, allocation: AllocationId, assignments: &[DayAssignment]) {
        let mut load = self.load.write();
        for assignment in assignments {
            Self::insert(&mut load, allocation, assignment);
        }
    }

    /// Removes one record matching `assignment`.
    pub fn detach(&self, allocation: AllocationId, assignment: &DayAssignment) {
        let mut load = self.load.write();
        let Some(days) = load.get_mut(&assignment.resource()) else {
            return;
        };
        let Some(entries) = days.get_mut(&assignment.day()) else {
            return;
        };
        if let Some(position) = entries
            .iter()
            .position(|(owner, effort)| *owner == allocation && *effort == assignment.duration())
        {
            entries.remove(position);
        }
        if entries.is_empty() {
            days.remove(&assignment.day());
        }
    }

    pub fn unregister(&self, allocation: AllocationId) {
        let mut load = self.load.write();
        Self::remove_allocation(&mut load, allocation);
    }

    pub fn assigned_effort(&self, resource: ResourceId, day: NaiveDate) -> EffortDuration {
        self.assigned_effort_excluding(resource, day, &[])
    }

    /// Load on `resource` that day, ignoring the records of `excluded`.
    pub fn assigned_effort_excluding(
        &self,
        resource: ResourceId,
        day: NaiveDate,
        excluded: &[AllocationId],
    ) -> EffortDuration {
        let load = self.load.read();
        load.get(&resource)
            .and_then(|days| days.get(&day))
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(owner, _)| !excluded.contains(owner))
                    .map(|(_, effort)| *effort)
                    .sum()
            })
            .unwrap_or_default()
    }

    /// Total load per day on `resource`.
    pub fn load_of(&self, resource: ResourceId) -> BTreeMap<NaiveDate, EffortDuration> {
        let load = self.load.read();
        load.get(&resource)
            .map(|days| {
                days.iter()
                    .map(|(day, entries)| (*day, entries.iter().map(|(_, effort)| *effort).sum()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn insert(
        load: &mut HashMap<ResourceId, BTreeMap<NaiveDate, DayLoad>>,
        allocation: AllocationId,
        assignment: &DayAssignment,
    ) {
        load.entry(assignment.resource())
            .or_default()
            .entry(assignment.day())
            .or_default()
            .push((allocation, assignment.duration()));
    }

    fn remove_allocation(
        load: &mut HashMap<ResourceId, BTreeMap<NaiveDate, DayLoad>>,
        allocation: AllocationId,
    ) {
        for days in load.values_mut() {
            for entries in days.values_mut() {
                entries.retain(|(owner, _)| *owner != allocation);
            }
            days.retain(|_, entries| !entries.is_empty());
        }
    }
}

impl OnDayAssignmentRemoval for ResourceLoadIndex {
    fn on_removal(&self, allocation: AllocationId, assignment: &DayAssignment) {
        self.detach(allocation, assignment);
    }
}

impl AssignedEffortForResource for ResourceLoadIndex {
    fn assigned_effort_at(&self, resource: ResourceId, day: NaiveDate) -> EffortDuration {
        self.assigned_effort(resource, day)
    }
}

/// Load from other allocations, so a generic pool does not double-book
/// resource days already taken elsewhere. The allocation being computed and
/// the ones listed in `discounted` (e.g. the original of a trial copy) are
/// left out.
pub struct AssignedHoursDiscounting {
    index: Arc<ResourceLoadIndex>,
    discounted: Vec<AllocationId>,
}

impl AssignedHoursDiscounting {
    pub fn new(index: Arc<ResourceLoadIndex>, discounted: Vec<AllocationId>) -> Self {
        Self { index, discounted }
    }
}

impl AssignedEffortForResource for AssignedHoursDiscounting {
    fn assigned_effort_at(&self, resource: ResourceId, day: NaiveDate) -> EffortDuration {
        self.index
            .assigned_effort_excluding(resource, day, &self.discounted)
    }
}
