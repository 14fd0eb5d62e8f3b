// Sidebar filters. Each one narrows the row set left by the previous one.
use crate::search::{prefix_search, sorted_distinct};
use crate::table_filter::ColumnFilter;
use crate::types::{Dataset, FineRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

/// How a categorical field is narrowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub enum Selection {
    #[default]
    All,
    /// Pick values from the list.
    OneOf(Vec<String>),
    /// Type the start of a value; matched case-insensitively.
    Prefix(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterState {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub plates: Selection,
    pub operations: Selection,
    pub reasons: Selection,
    /// Empty means every region.
    pub regions: Vec<String>,
    pub columns: Vec<ColumnFilter>,
}

/// Rows left after filtering plus messages for the user.
#[derive(Debug, Default)]
pub struct FilterOutcome<'a> {
    pub rows: Vec<&'a FineRecord>,
    pub notices: Vec<String>,
}

fn apply_selection<'a, F>(
    rows: Vec<&'a FineRecord>,
    selection: &Selection,
    label: &str,
    value: F,
    notices: &mut Vec<String>,
) -> Vec<&'a FineRecord>
where
    F: Fn(&FineRecord) -> Option<&str>,
{
    match selection {
        Selection::All => rows,
        Selection::OneOf(values) if values.is_empty() => rows,
        Selection::OneOf(values) => {
            let wanted: HashSet<&str> = values.iter().map(String::as_str).collect();
            rows.into_iter()
                .filter(|r| value(*r).is_some_and(|v| wanted.contains(v)))
                .collect()
        }
        Selection::Prefix(query) if query.trim().is_empty() => rows,
        Selection::Prefix(query) => {
            let sorted = sorted_distinct(rows.iter().filter_map(|r| value(*r)));
            let found: HashSet<&str> = prefix_search(&sorted, query).iter().map(String::as_str).collect();
            if found.is_empty() {
                notices.push(format!("No {} matches `{}`.", label, query.trim()));
                return Vec::new();
            }
            notices.push(format!("{} {} value(s) found.", found.len(), label));
            rows.into_iter()
                .filter(|r| value(*r).is_some_and(|v| found.contains(v.trim())))
                .collect()
        }
    }
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        *self == FilterState::default()
    }

    /// Narrow `dataset` by plate, region, date range, operation, reason and
    /// then each column filter, in that order.
    pub fn apply<'a>(&self, dataset: &'a Dataset) -> FilterOutcome<'a> {
        let mut notices = Vec::new();
        let mut rows: Vec<&FineRecord> = dataset.records.iter().collect();

        if dataset.columns.plate.is_some() {
            rows = apply_selection(rows, &self.plates, "plate", |r| r.plate.as_deref(), &mut notices);
        } else if self.plates != Selection::All {
            notices.push("Plate filter ignored: the ledger has no plate column.".to_string());
        }

        if !self.regions.is_empty() {
            rows.retain(|r| self.regions.iter().any(|uf| *uf == r.region));
        }

        if self.start.is_some() || self.end.is_some() {
            rows.retain(|r| match r.date {
                Some(d) => self.start.map_or(true, |s| d >= s) && self.end.map_or(true, |e| d <= e),
                None => false,
            });
        }

        if dataset.columns.operation.is_some() {
            rows = apply_selection(rows, &self.operations, "operation", |r| r.operation.as_deref(), &mut notices);
        } else if self.operations != Selection::All {
            notices.push("Operation filter ignored: the ledger has no operation column.".to_string());
        }

        rows = apply_selection(rows, &self.reasons, "reason", |r| Some(r.reason.as_str()), &mut notices);

        for filter in &self.columns {
            rows = filter.apply(dataset, rows);
        }

        if rows.is_empty() {
            notices.push("No records match the current filters.".to_string());
        }
        FilterOutcome { rows, notices }
    }
}

/// Distinct values offered by the list selectors.
pub fn options<'a, F>(rows: &[&'a FineRecord], value: F) -> Vec<String>
where
    F: Fn(&'a FineRecord) -> Option<&'a str>,
{
    sorted_distinct(rows.iter().filter_map(|r| value(*r)))
}
