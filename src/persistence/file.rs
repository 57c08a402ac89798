use super::{AllocationSnapshot, PersistenceError, PersistenceResult};
use crate::calendar::{WorkCalendar, WorkCalendarConfig};
use crate::day_assignment::DayAssignment;
use crate::effort::EffortDuration;
use crate::resource::{Criterion, ResourceId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    allocations: Vec<AllocationSnapshot>,
}

pub fn save_snapshots_to_json<P: AsRef<Path>>(
    snapshots: &[AllocationSnapshot],
    path: P,
) -> PersistenceResult<()> {
    for snapshot in snapshots {
        snapshot.validate()?;
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(
        file,
        &SnapshotFile {
            allocations: snapshots.to_vec(),
        },
    )?;
    Ok(())
}

pub fn load_snapshots_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<AllocationSnapshot>> {
    let file = File::open(path)?;
    let contents: SnapshotFile = serde_json::from_reader(file)?;
    let mut ids = HashSet::new();
    for snapshot in &contents.allocations {
        snapshot.validate()?;
        if !ids.insert(snapshot.id) {
            return Err(PersistenceError::InvalidData(format!(
                "allocation {} appears twice",
                snapshot.id
            )));
        }
    }
    Ok(contents.allocations)
}

pub fn save_calendar_config<P: AsRef<Path>>(calendar: &WorkCalendar, path: P) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &calendar.to_config())?;
    Ok(())
}

pub fn load_calendar_config<P: AsRef<Path>>(path: P) -> PersistenceResult<WorkCalendar> {
    let file = File::open(path)?;
    let config: WorkCalendarConfig = serde_json::from_reader(file)?;
    Ok(WorkCalendar::from_config(&config))
}

#[derive(Default, Serialize, Deserialize)]
struct AssignmentCsvRecord {
    day: String,
    resource_id: u32,
    seconds: u64,
    consolidated: String,
    origin: String,
    #[serde(default)]
    criteria: String,
}

impl From<&DayAssignment> for AssignmentCsvRecord {
    fn from(assignment: &DayAssignment) -> Self {
        let mut record = AssignmentCsvRecord::default();
        record.day = format_date(assignment.day());
        record.resource_id = assignment.resource().0;
        record.seconds = assignment.duration().as_seconds();
        record.consolidated = assignment.is_consolidated().to_string();
        match assignment.criteria() {
            Some(criteria) => {
                record.origin = "generic".to_string();
                record.criteria = join_criteria(criteria);
            }
            None => record.origin = "specific".to_string(),
        }
        record
    }
}

impl AssignmentCsvRecord {
    fn into_assignment(self) -> PersistenceResult<DayAssignment> {
        let day = parse_date(&self.day)?;
        let duration = EffortDuration::seconds(self.seconds);
        let resource = ResourceId(self.resource_id);
        let assignment = match self.origin.trim() {
            "specific" => DayAssignment::specific(day, duration, resource),
            "generic" => {
                DayAssignment::generic(day, duration, resource, split_criteria(&self.criteria))
            }
            other => {
                return Err(PersistenceError::InvalidData(format!(
                    "invalid origin '{other}'"
                )));
            }
        };
        if parse_bool(&self.consolidated)? {
            Ok(assignment.into_consolidated())
        } else {
            Ok(assignment)
        }
    }
}

pub fn save_assignments_to_csv<P: AsRef<Path>>(
    assignments: &[DayAssignment],
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for assignment in assignments {
        writer.serialize(AssignmentCsvRecord::from(assignment))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_assignments_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<DayAssignment>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut assignments = Vec::new();
    for record in reader.deserialize::<AssignmentCsvRecord>() {
        assignments.push(record?.into_assignment()?);
    }
    Ok(assignments)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(input: &str) -> PersistenceResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| PersistenceError::InvalidData(format!("invalid date '{input}': {e}")))
}

fn parse_bool(input: &str) -> PersistenceResult<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" | "false" => Ok(false),
        "true" => Ok(true),
        other => Err(PersistenceError::InvalidData(format!(
            "invalid boolean '{other}'"
        ))),
    }
}

fn join_criteria(criteria: &BTreeSet<Criterion>) -> String {
    criteria
        .iter()
        .map(|each| each.name())
        .collect::<Vec<_>>()
        .join(";")
}

fn split_criteria(input: &str) -> BTreeSet<Criterion> {
    input
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Criterion::new)
        .collect()
}
