use crate::allocation::{ResourceAllocation, allocating};
use crate::error::AllocationError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// No profile: the remaining effort is laid out again at the allocation's
/// current rate, starting on the first non-consolidated day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoneFunction;

impl NoneFunction {
    pub fn apply_to(&self, allocation: &mut ResourceAllocation) -> Result<(), AllocationError> {
        let effort = allocation.non_consolidated_effort();
        if effort.is_zero() {
            return Ok(());
        }
        let id = allocation.id();
        let end = allocating(vec![allocation.as_resources_per_day_modification()])?
            .until_allocating(effort);
        debug!(allocation = %id, effort = %effort, end = %end, "applied flat distribution");
        Ok(())
    }
}
