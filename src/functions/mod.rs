mod interpolation;
mod none;
mod stretches;

pub use interpolation::MonotoneCubic;
pub use none::NoneFunction;
pub use stretches::{Interval, Stretch, StretchesFunction, StretchesFunctionType};

use crate::allocation::ResourceAllocation;
use crate::error::AllocationError;
use serde::{Deserialize, Serialize};

/// How an allocation's effort is shaped over its window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "function", rename_all = "snake_case")]
pub enum AssignmentFunction {
    None(NoneFunction),
    Stretches(StretchesFunction),
}

impl AssignmentFunction {
    pub fn none() -> Self {
        AssignmentFunction::None(NoneFunction)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AssignmentFunction::None(_) => "none",
            AssignmentFunction::Stretches(function) if function.is_interpolated() => "interpolation",
            AssignmentFunction::Stretches(_) => "stretches",
        }
    }

    /// Reshapes `allocation`. Invalid profiles are rejected before any
    /// assignment is touched.
    pub fn apply_to(&self, allocation: &mut ResourceAllocation) -> Result<(), AllocationError> {
        match self {
            AssignmentFunction::None(function) => function.apply_to(allocation),
            AssignmentFunction::Stretches(function) => function.apply_to(allocation),
        }
    }
}

impl From<NoneFunction> for AssignmentFunction {
    fn from(function: NoneFunction) -> Self {
        AssignmentFunction::None(function)
    }
}

impl From<StretchesFunction> for AssignmentFunction {
    fn from(function: StretchesFunction) -> Self {
        AssignmentFunction::Stretches(function)
    }
}
