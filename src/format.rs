//! Plain-text rendering of extracted schedules.

use std::collections::BTreeMap;

use crate::extract::DaySchedule;

const HEADERS: [&str; 6] = ["Slot", "Index", "Route", "Distance", "Start", "End"];
const DISTANCE_COLUMN: usize = 3;

/// Renders a schedule as a grid table, one row per assigned route followed
/// by a total row for each day.
///
/// ```
/// use run_scheduler::extract::{DaySchedule, ScheduledRoute};
/// use run_scheduler::format::schedule_to_table;
///
/// let day = DaySchedule {
///     day: 1,
///     routes: vec![ScheduledRoute {
///         slot: 1,
///         route_id: "r1".into(),
///         name: "Lakeside".into(),
///         start_exchange: "x1".into(),
///         end_exchange: "x2".into(),
///         distance_mi: 3.0,
///     }],
///     distance_range: None,
/// };
/// let table = schedule_to_table(&[day]);
/// assert!(table.contains("Lakeside"));
/// assert!(table.contains("Total"));
/// ```
pub fn schedule_to_table(schedule: &[DaySchedule]) -> String {
    let mut rows: Vec<[String; 6]> = Vec::new();
    for day in schedule {
        for (position, route) in day.routes.iter().enumerate() {
            rows.push([
                String::new(),
                (position + 1).to_string(),
                route.name.clone(),
                format!("{:.1}", route.distance_mi),
                route.start_exchange.clone(),
                route.end_exchange.clone(),
            ]);
        }
        rows.push([
            day.day.to_string(),
            "Total".to_string(),
            String::new(),
            format!("{:.1}", day.total_distance()),
            String::new(),
            String::new(),
        ]);
    }

    let mut widths = HEADERS.map(|header| header.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_rule(&mut out, &widths, '-');
    push_row(&mut out, &widths, &HEADERS.map(str::to_string));
    push_rule(&mut out, &widths, '=');
    for row in &rows {
        push_row(&mut out, &widths, row);
        push_rule(&mut out, &widths, '-');
    }
    out.trim_end().to_string()
}

fn push_rule(out: &mut String, widths: &[usize; 6], fill: char) {
    out.push('+');
    for width in widths {
        out.extend(std::iter::repeat_n(fill, width + 2));
        out.push('+');
    }
    out.push('\n');
}

fn push_row(out: &mut String, widths: &[usize; 6], cells: &[String; 6]) {
    out.push('|');
    for (column, (width, cell)) in widths.iter().zip(cells).enumerate() {
        let padded = if column == DISTANCE_COLUMN {
            format!(" {:>width$} ", cell, width = width)
        } else {
            format!(" {:<width$} ", cell, width = width)
        };
        out.push_str(&padded);
        out.push('|');
    }
    out.push('\n');
}

/// Renders a cost mapping as `name: value` pairs.
pub fn costs_to_string(costs: &BTreeMap<String, i64>) -> String {
    costs
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}
