use crate::effort::EffortDuration;
use crate::resource::{Resource, ResourceId};
use chrono::NaiveDate;
use std::sync::Arc;

/// How full a member is: lower values get served first. Members that must
/// never receive anything carry the unavailable sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Share(i64);

impl Share {
    const UNAVAILABLE: i64 = i64::MAX;

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn unavailable() -> Self {
        Self(Self::UNAVAILABLE)
    }

    /// `assigned - capacity`, so a member with more room left has a lower share.
    pub fn from_remaining_capacity(capacity: EffortDuration, assigned: EffortDuration) -> Self {
        Self(assigned.as_seconds() as i64 - capacity.as_seconds() as i64)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_unavailable(self) -> bool {
        self.0 == Self::UNAVAILABLE
    }
}

/// A set of shares that can be grown one second at a time, always feeding
/// the member with the lowest share first. When units run out in the middle
/// of a tie, the last tied members absorb the remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareDivision {
    shares: Vec<Share>,
}

impl ShareDivision {
    pub fn create(shares: Vec<Share>) -> Self {
        Self { shares }
    }

    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    /// Awards `increment` units, resolved level by level instead of unit by
    /// unit. Leftover units of an uneven split go to the last tied members.
    pub fn plus(&self, increment: u64) -> ShareDivision {
        let mut values: Vec<i64> = self.shares.iter().map(|share| share.0).collect();
        let mut order: Vec<usize> = (0..values.len())
            .filter(|&idx| !self.shares[idx].is_unavailable())
            .collect();
        if order.is_empty() || increment == 0 {
            return self.clone();
        }
        order.sort_by_key(|&idx| (values[idx], idx));

        let mut remaining = increment as i128;
        let mut level = values[order[0]] as i128;
        let mut group = 1;
        while group < order.len() && values[order[group]] as i128 == level {
            group += 1;
        }

        while group < order.len() {
            let next_level = values[order[group]] as i128;
            let cost = (next_level - level) * group as i128;
            if cost > remaining {
                break;
            }
            remaining -= cost;
            level = next_level;
            while group < order.len() && values[order[group]] as i128 == level {
                group += 1;
            }
        }

        let per_member = remaining / group as i128;
        let extra = (remaining % group as i128) as usize;
        let mut members: Vec<usize> = order[..group].to_vec();
        members.sort_unstable();
        let first_with_bonus = members.len() - extra;
        for (position, idx) in members.into_iter().enumerate() {
            let bonus = if position >= first_with_bonus { 1 } else { 0 };
            let value = level + per_member + bonus;
            values[idx] = value.min((Share::UNAVAILABLE - 1) as i128) as i64;
        }

        ShareDivision {
            shares: values.into_iter().map(Share).collect(),
        }
    }

    /// Units each member gained going from `self` to `other`.
    pub fn to(&self, other: &ShareDivision) -> Vec<u64> {
        self.shares
            .iter()
            .zip(other.shares.iter())
            .map(|(before, after)| {
                if before.is_unavailable() {
                    0
                } else {
                    (after.0 - before.0).max(0) as u64
                }
            })
            .collect()
    }
}

/// Splits an integer total among weights with the largest remainder method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProportionalDistributor {
    weights: Vec<u64>,
}

impl ProportionalDistributor {
    pub fn create(weights: &[u64]) -> Self {
        Self {
            weights: weights.to_vec(),
        }
    }

    pub fn distribute(&self, total: u64) -> Vec<u64> {
        if self.weights.is_empty() {
            return Vec::new();
        }
        let weight_sum: u128 = self.weights.iter().map(|&w| w as u128).sum();
        if weight_sum == 0 {
            let even = ShareDivision::create(vec![Share::new(0); self.weights.len()]);
            return even.to(&even.plus(total));
        }

        let mut result = Vec::with_capacity(self.weights.len());
        let mut fractions = Vec::with_capacity(self.weights.len());
        for (idx, &weight) in self.weights.iter().enumerate() {
            let scaled = total as u128 * weight as u128;
            result.push((scaled / weight_sum) as u64);
            fractions.push((scaled % weight_sum, idx));
        }

        let assigned: u64 = result.iter().sum();
        let mut remainder = total - assigned;
        fractions.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        for (_, idx) in fractions {
            if remainder == 0 {
                break;
            }
            result[idx] += 1;
            remainder -= 1;
        }
        result
    }
}

/// Effort a resource already carries on a day, as seen by the distributor.
pub trait AssignedEffortForResource: Send + Sync {
    fn assigned_effort_at(&self, resource: ResourceId, day: NaiveDate) -> EffortDuration;
}

/// Treats every resource as free.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssignedEffort;

impl AssignedEffortForResource for NoAssignedEffort {
    fn assigned_effort_at(&self, _resource: ResourceId, _day: NaiveDate) -> EffortDuration {
        EffortDuration::zero()
    }
}

pub trait ResourceSelector {
    fn is_selectable(&self, resource: &Resource, day: NaiveDate) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllResources;

impl ResourceSelector for AllResources {
    fn is_selectable(&self, _resource: &Resource, _day: NaiveDate) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceWithAssignedDuration {
    pub resource: ResourceId,
    pub duration: EffortDuration,
}

/// Splits one day's effort among several resources, feeding the ones with
/// the most remaining capacity first.
pub struct EffortDistributor<'a> {
    resources: &'a [Arc<Resource>],
    assigned_effort: &'a dyn AssignedEffortForResource,
    selector: &'a dyn ResourceSelector,
}

impl<'a> EffortDistributor<'a> {
    pub fn new(
        resources: &'a [Arc<Resource>],
        assigned_effort: &'a dyn AssignedEffortForResource,
        selector: &'a dyn ResourceSelector,
    ) -> Self {
        Self {
            resources,
            assigned_effort,
            selector,
        }
    }

    /// Only resources that receive something are returned, in input order.
    pub fn distribute_for_day(
        &self,
        day: NaiveDate,
        total: EffortDuration,
    ) -> Vec<ResourceWithAssignedDuration> {
        if total.is_zero() || self.resources.is_empty() {
            return Vec::new();
        }
        let shares: Vec<Share> = self
            .resources
            .iter()
            .map(|resource| {
                let capacity = resource.capacity_on(day);
                if capacity.is_zero() || !self.selector.is_selectable(resource, day) {
                    Share::unavailable()
                } else {
                    Share::from_remaining_capacity(
                        capacity,
                        self.assigned_effort.assigned_effort_at(resource.id(), day),
                    )
                }
            })
            .collect();

        let original = ShareDivision::create(shares);
        let grown = original.plus(total.as_seconds());
        original
            .to(&grown)
            .into_iter()
            .zip(self.resources.iter())
            .filter(|(seconds, _)| *seconds > 0)
            .map(|(seconds, resource)| ResourceWithAssignedDuration {
                resource: resource.id(),
                duration: EffortDuration::seconds(seconds),
            })
            .collect()
    }
}
