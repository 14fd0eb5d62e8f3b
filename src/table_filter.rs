// Per-column filters for the raw data table. The widget for a column is
// chosen from the values it holds.
use crate::error::Error;
use crate::types::{Dataset, FineRecord};
use crate::util::{parse_date_dayfirst, parse_number};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

const CATEGORICAL_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Categorical,
    Numeric,
    Date,
    Text,
}

impl ColumnKind {
    /// Input format expected by [`ColumnPredicate::parse`].
    pub fn hint(&self) -> &'static str {
        match self {
            ColumnKind::Categorical => "values separated by `|`",
            ColumnKind::Numeric => "range `min..max` (either side optional)",
            ColumnKind::Date => "range `dd/mm/yyyy..dd/mm/yyyy` (either side optional)",
            ColumnKind::Text => "text contained in the value",
        }
    }
}

/// Categorical below ten distinct values, else numeric, else date, else
/// free text. Blank cells are ignored.
pub fn infer_kind<'a, I>(values: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a str>,
{
    let values: Vec<&str> = values.into_iter().map(str::trim).filter(|v| !v.is_empty()).collect();
    let distinct: HashSet<&str> = values.iter().copied().collect();
    if distinct.len() < CATEGORICAL_LIMIT {
        ColumnKind::Categorical
    } else if values.iter().all(|v| parse_number(v).is_some()) {
        ColumnKind::Numeric
    } else if values.iter().all(|v| parse_date_dayfirst(v).is_some()) {
        ColumnKind::Date
    } else {
        ColumnKind::Text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ColumnPredicate {
    OneOf(Vec<String>),
    Range { min: Option<f64>, max: Option<f64> },
    DateRange { from: Option<NaiveDate>, to: Option<NaiveDate> },
    Contains(String),
}

fn split_range(input: &str) -> Option<(&str, &str)> {
    let (lo, hi) = input.split_once("..")?;
    Some((lo.trim(), hi.trim()))
}

impl ColumnPredicate {
    pub fn parse(kind: ColumnKind, input: &str) -> Result<Self, Error> {
        let input = input.trim();
        let invalid = || Error::FilterInput {
            input: input.to_string(),
            kind,
        };
        match kind {
            ColumnKind::Categorical => {
                let values: Vec<String> = input
                    .split('|')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                if values.is_empty() {
                    return Err(invalid());
                }
                Ok(ColumnPredicate::OneOf(values))
            }
            ColumnKind::Numeric => {
                let (lo, hi) = split_range(input).ok_or_else(invalid)?;
                let bound = |s: &str| -> Result<Option<f64>, Error> {
                    if s.is_empty() {
                        Ok(None)
                    } else {
                        parse_number(s).map(Some).ok_or_else(invalid)
                    }
                };
                Ok(ColumnPredicate::Range {
                    min: bound(lo)?,
                    max: bound(hi)?,
                })
            }
            ColumnKind::Date => {
                let (lo, hi) = split_range(input).ok_or_else(invalid)?;
                let bound = |s: &str| -> Result<Option<NaiveDate>, Error> {
                    if s.is_empty() {
                        Ok(None)
                    } else {
                        parse_date_dayfirst(s).map(Some).ok_or_else(invalid)
                    }
                };
                Ok(ColumnPredicate::DateRange {
                    from: bound(lo)?,
                    to: bound(hi)?,
                })
            }
            ColumnKind::Text => Ok(ColumnPredicate::Contains(input.to_string())),
        }
    }

    pub fn matches(&self, cell: &str) -> bool {
        let cell = cell.trim();
        match self {
            ColumnPredicate::OneOf(values) => values.iter().any(|v| v == cell),
            ColumnPredicate::Range { min, max } => match parse_number(cell) {
                Some(v) => min.map_or(true, |m| v >= m) && max.map_or(true, |m| v <= m),
                None => false,
            },
            ColumnPredicate::DateRange { from, to } => match parse_date_dayfirst(cell) {
                Some(d) => from.map_or(true, |f| d >= f) && to.map_or(true, |t| d <= t),
                None => false,
            },
            ColumnPredicate::Contains(needle) => {
                cell.to_lowercase().contains(&needle.to_lowercase())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnFilter {
    pub column: String,
    pub predicate: ColumnPredicate,
}

impl ColumnFilter {
    /// Infer the column kind from the current rows and parse `input` for it.
    pub fn build(dataset: &Dataset, rows: &[&FineRecord], column: &str, input: &str) -> Result<Self, Error> {
        let kind = column_kind(dataset, rows, column)?;
        Ok(Self {
            column: column.to_string(),
            predicate: ColumnPredicate::parse(kind, input)?,
        })
    }

    pub fn apply<'a>(&self, dataset: &Dataset, rows: Vec<&'a FineRecord>) -> Vec<&'a FineRecord> {
        rows.into_iter()
            .filter(|r| {
                dataset
                    .cell(r, &self.column)
                    .is_some_and(|c| self.predicate.matches(&c))
            })
            .collect()
    }
}

pub fn column_kind(dataset: &Dataset, rows: &[&FineRecord], column: &str) -> Result<ColumnKind, Error> {
    if !dataset.has_column(column) {
        return Err(Error::UnknownColumn(column.to_string()));
    }
    let cells: Vec<String> = rows.iter().filter_map(|r| dataset.cell(r, column)).collect();
    Ok(infer_kind(cells.iter().map(String::as_str)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn few_distinct_values_are_categorical() {
        assert_eq!(infer_kind(["SP", "RJ", "SP", ""]), ColumnKind::Categorical);
    }

    #[test]
    fn wide_columns_are_typed_by_content() {
        let nums: Vec<String> = (0..12).map(|i| format!("{},5", i)).collect();
        assert_eq!(infer_kind(nums.iter().map(String::as_str)), ColumnKind::Numeric);

        let dates: Vec<String> = (1..=12).map(|d| format!("{:02}/01/2024", d)).collect();
        assert_eq!(infer_kind(dates.iter().map(String::as_str)), ColumnKind::Date);

        let text: Vec<String> = (0..12).map(|i| format!("item {}", i)).collect();
        assert_eq!(infer_kind(text.iter().map(String::as_str)), ColumnKind::Text);
    }

    #[test]
    fn parses_inputs_per_kind() {
        assert_eq!(
            ColumnPredicate::parse(ColumnKind::Categorical, "SP | RJ").unwrap(),
            ColumnPredicate::OneOf(vec!["SP".into(), "RJ".into()])
        );
        assert_eq!(
            ColumnPredicate::parse(ColumnKind::Numeric, "100..").unwrap(),
            ColumnPredicate::Range { min: Some(100.0), max: None }
        );
        assert_eq!(
            ColumnPredicate::parse(ColumnKind::Date, "..31/01/2024").unwrap(),
            ColumnPredicate::DateRange {
                from: None,
                to: NaiveDate::from_ymd_opt(2024, 1, 31)
            }
        );
        assert!(matches!(
            ColumnPredicate::parse(ColumnKind::Numeric, "cem"),
            Err(Error::FilterInput { kind: ColumnKind::Numeric, .. })
        ));
        assert!(ColumnPredicate::parse(ColumnKind::Categorical, " | ").is_err());
    }

    #[test]
    fn predicates_match_cells() {
        let range = ColumnPredicate::Range { min: Some(10.0), max: Some(20.0) };
        assert!(range.matches("15.5"));
        assert!(!range.matches("25"));
        assert!(!range.matches("n/a"));

        let text = ColumnPredicate::Contains("radar".into());
        assert!(text.matches("EXCESSO - RADAR FIXO"));
        assert!(!text.matches("FAROL"));

        let dates = ColumnPredicate::DateRange {
            from: NaiveDate::from_ymd_opt(2024, 1, 1),
            to: None,
        };
        assert!(dates.matches("02/01/2024"));
        assert!(!dates.matches("31/12/2023"));
        assert!(!dates.matches(""));
    }
}
