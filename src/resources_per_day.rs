use crate::distribution::ProportionalDistributor;
use crate::effort::EffortDuration;
use crate::error::ResourcesPerDayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SCALE: u64 = 100;

/// How many resource-equivalents work on a task each day, with two decimals.
///
/// Stored as hundredths so arithmetic stays exact. `amount(0)` marks an
/// allocation that could not be satisfied.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ResourcesPerDay(u32);

impl ResourcesPerDay {
    pub const fn amount(units: u32) -> Self {
        Self(units * SCALE as u32)
    }

    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    /// Rounds half up to two decimals.
    pub fn from_decimal(value: f64) -> Result<Self, ResourcesPerDayError> {
        if !value.is_finite() {
            return Err(ResourcesPerDayError::NotFinite(value));
        }
        if value < 0.0 {
            return Err(ResourcesPerDayError::Negative(value));
        }
        let hundredths = (value * SCALE as f64 + 0.5 + f64::EPSILON).floor();
        Ok(Self(hundredths.min(u32::MAX as f64) as u32))
    }

    pub const fn hundredths(self) -> u32 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    /// Effort delivered on a day whose one-resource capacity is `capacity`,
    /// truncated to whole seconds.
    pub fn as_duration_given_working_day_of(self, capacity: EffortDuration) -> EffortDuration {
        let seconds = capacity.as_seconds() as u128 * self.0 as u128 / SCALE as u128;
        EffortDuration::seconds(seconds.min(u64::MAX as u128) as u64)
    }

    /// Whole hours for a working day of `hours`, rounded half up and never
    /// zero for a non-zero amount.
    pub fn as_hours_given_working_day_of(self, hours: u32) -> u32 {
        if self.is_zero() {
            return 0;
        }
        let rounded = (hours as u64 * self.0 as u64 + SCALE / 2) / SCALE;
        rounded.max(1).min(u32::MAX as u64) as u32
    }

    /// Ratio between assigned and workable effort, half up to two decimals.
    /// Zero workable effort yields zero.
    pub fn calculate_from(effort: EffortDuration, workable: EffortDuration) -> Self {
        if workable.is_zero() {
            return Self(0);
        }
        let numerator = effort.as_seconds() as u128 * SCALE as u128;
        let denominator = workable.as_seconds() as u128;
        let hundredths = (2 * numerator + denominator) / (2 * denominator);
        Self(hundredths.min(u32::MAX as u128) as u32)
    }

    /// Splits amounts keeping the proportions among `parts`.
    pub fn distributor(parts: &[ResourcesPerDay]) -> ResourcesPerDayDistributor {
        let weights: Vec<u64> = parts.iter().map(|each| each.0 as u64).collect();
        ResourcesPerDayDistributor {
            distributor: ProportionalDistributor::create(&weights),
        }
    }
}

pub struct ResourcesPerDayDistributor {
    distributor: ProportionalDistributor,
}

impl ResourcesPerDayDistributor {
    pub fn distribute(&self, total: ResourcesPerDay) -> Vec<ResourcesPerDay> {
        self.distributor
            .distribute(total.0 as u64)
            .into_iter()
            .map(|hundredths| ResourcesPerDay(hundredths as u32))
            .collect()
    }
}

impl fmt::Display for ResourcesPerDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / SCALE as u32, self.0 % SCALE as u32)
    }
}

impl FromStr for ResourcesPerDay {
    type Err = ResourcesPerDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| ResourcesPerDayError::Unparsable(s.to_string()))?;
        Self::from_decimal(value)
    }
}
