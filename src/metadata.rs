use crate::error::ScheduleError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleMetadata {
    pub project_name: String,
    pub project_description: String,
    pub project_start_date: NaiveDate,
    pub project_end_date: NaiveDate,
}

impl Default for ScheduleMetadata {
    fn default() -> Self {
        Self {
            project_name: "New Project".to_string(),
            project_description: "No description".to_string(),
            project_start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN),
            project_end_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }
}

impl ScheduleMetadata {
    pub fn new(
        project_name: impl Into<String>,
        project_start_date: NaiveDate,
        project_end_date: NaiveDate,
    ) -> Result<Self, ScheduleError> {
        let metadata = Self {
            project_name: project_name.into(),
            project_start_date,
            project_end_date,
            ..Self::default()
        };
        metadata.validate()?;
        Ok(metadata)
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.project_start_date > self.project_end_date {
            return Err(ScheduleError::StartAfterEnd {
                start: self.project_start_date,
                end: self.project_end_date,
            });
        }
        Ok(())
    }

    /// Both ends inclusive.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.project_start_date <= day && day <= self.project_end_date
    }
}
