use serde_json::Value;

use super::resources::{ColumnSpec, ResourceSpec};

/// Text shown in a table cell. Missing fields and unresolved joins (a null
/// staffName, a record with no section) all collapse to the same placeholder.
pub fn cell_text(record: &Value, field: &str) -> String {
    match record.get(field) {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// One fetched record flattened into the spec's column order.
pub fn row_cells(spec: &ResourceSpec, record: &Value) -> Vec<String> {
    spec.columns
        .iter()
        .map(|c| cell_text(record, c.field))
        .collect()
}

pub fn header_titles(spec: &ResourceSpec) -> Vec<&'static str> {
    spec.columns.iter().map(|c| c.title).collect()
}

/// The message a table body shows when there are no rows.
pub fn empty_text(spec: &ResourceSpec) -> &'static str {
    spec.empty_message
}

/// Count of records whose `field` equals `value`. Derived stats recompute
/// from the fetched collection on every render, never from a separate call.
pub fn count_where(records: &[Value], field: &str, value: &str) -> usize {
    records
        .iter()
        .filter(|r| r.get(field).and_then(|v| v.as_str()) == Some(value))
        .count()
}

pub fn count_by<'a>(records: &'a [Value], field: &str) -> Vec<(&'a str, usize)> {
    let mut out: Vec<(&str, usize)> = Vec::new();
    for r in records {
        let Some(key) = r.get(field).and_then(|v| v.as_str()) else {
            continue;
        };
        match out.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => out.push((key, 1)),
        }
    }
    out
}

/// Sums a numeric field, tolerating numbers the API returns as strings.
pub fn sum_field(records: &[Value], field: &str) -> f64 {
    records
        .iter()
        .filter_map(|r| match r.get(field) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .sum()
}

/// Case-insensitive substring match over the listed columns plus the given
/// extra fields. An empty needle matches everything.
pub fn matches_search(record: &Value, columns: &[ColumnSpec], extra: &[&str], needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let mut fields: Vec<&str> = columns.iter().map(|c| c.field).collect();
    fields.extend_from_slice(extra);
    fields.iter().any(|f| {
        record
            .get(*f)
            .and_then(|v| v.as_str())
            .map(|s| s.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug)]
pub struct DaySchedule {
    pub day_of_week: i64,
    pub label: &'static str,
    pub entries: Vec<Value>,
}

/// Buckets timetable entries into the seven weekday columns. Every day is
/// present even when empty so the grid shape never depends on the data.
/// Entries arrive ordered by (day, period) from the API and keep that order.
pub fn group_by_day(entries: &[Value]) -> Vec<DaySchedule> {
    let mut days: Vec<DaySchedule> = (1..=7)
        .map(|d| DaySchedule {
            day_of_week: d,
            label: WEEKDAYS[(d - 1) as usize],
            entries: Vec::new(),
        })
        .collect();
    for e in entries {
        let Some(day) = e.get("dayOfWeek").and_then(|v| v.as_i64()) else {
            continue;
        };
        if (1..=7).contains(&day) {
            days[(day - 1) as usize].entries.push(e.clone());
        }
    }
    days
}
