//! Tabular views over day assignments, for export and aggregation.

use crate::day_assignment::DayAssignment;
use crate::effort::EffortDuration;
use crate::resource::ResourceId;
use chrono::{DateTime, NaiveDate};
use polars::prelude::*;

fn date_to_i32(date: NaiveDate) -> i32 {
    let epoch = DateTime::UNIX_EPOCH.date_naive();
    (date - epoch).num_days() as i32
}

fn i32_to_date(days: i32) -> NaiveDate {
    let epoch = DateTime::UNIX_EPOCH.date_naive();
    epoch + chrono::Duration::days(days as i64)
}

/// Columns: `day` (Date), `resource_id` (u32), `seconds` (i64),
/// `consolidated` (bool). One row per assignment, in input order.
pub fn assignments_frame(assignments: &[DayAssignment]) -> PolarsResult<DataFrame> {
    let days: Vec<i32> = assignments.iter().map(|each| date_to_i32(each.day())).collect();
    let resources: Vec<u32> = assignments.iter().map(|each| each.resource().0).collect();
    let seconds: Vec<i64> = assignments
        .iter()
        .map(|each| each.duration().as_seconds() as i64)
        .collect();
    let consolidated: Vec<bool> = assignments.iter().map(DayAssignment::is_consolidated).collect();

    let df = df!(
        "day" => days,
        "resource_id" => resources,
        "seconds" => seconds,
        "consolidated" => consolidated,
    )?;
    df.lazy()
        .with_column(col("day").cast(DataType::Date))
        .collect()
}

/// Total seconds per resource, ordered by resource id.
pub fn effort_by_resource(frame: &DataFrame) -> PolarsResult<DataFrame> {
    frame
        .clone()
        .lazy()
        .group_by([col("resource_id")])
        .agg([col("seconds").sum().alias("seconds")])
        .sort(["resource_id"], SortMultipleOptions::default())
        .collect()
}

/// Total seconds per day, ordered by day.
pub fn effort_by_day(frame: &DataFrame) -> PolarsResult<DataFrame> {
    frame
        .clone()
        .lazy()
        .group_by([col("day")])
        .agg([col("seconds").sum().alias("seconds")])
        .sort(["day"], SortMultipleOptions::default())
        .collect()
}

pub fn totals_by_resource(assignments: &[DayAssignment]) -> PolarsResult<Vec<(ResourceId, EffortDuration)>> {
    let grouped = effort_by_resource(&assignments_frame(assignments)?)?;
    let ids = grouped.column("resource_id")?.u32()?;
    let seconds = grouped.column("seconds")?.i64()?;
    Ok(ids
        .into_iter()
        .zip(seconds.into_iter())
        .filter_map(|(id, seconds)| {
            Some((ResourceId(id?), EffortDuration::seconds(seconds?.max(0) as u64)))
        })
        .collect())
}

pub fn totals_by_day(assignments: &[DayAssignment]) -> PolarsResult<Vec<(NaiveDate, EffortDuration)>> {
    let grouped = effort_by_day(&assignments_frame(assignments)?)?;
    let days = grouped.column("day")?.cast(&DataType::Int32)?;
    let days = days.i32()?;
    let seconds = grouped.column("seconds")?.i64()?;
    Ok(days
        .into_iter()
        .zip(seconds.into_iter())
        .filter_map(|(day, seconds)| {
            Some((i32_to_date(day?), EffortDuration::seconds(seconds?.max(0) as u64)))
        })
        .collect())
}
