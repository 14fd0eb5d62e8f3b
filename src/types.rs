use crate::columns::ResolvedColumns;
use crate::loader::LoadReport;
use crate::util::{format_date, format_number};
use chrono::NaiveDate;
use serde::Serialize;
use tabled::Tabled;

// Names of the columns the cleaning phase adds next to the raw ledger ones.
pub const AMOUNT_COLUMN: &str = "VALOR_TOTAL";
pub const DATE_COLUMN: &str = "DATA_REF";
pub const REASON_COLUMN: &str = "MOTIVO_CANONICO";
pub const REGION_COLUMN: &str = "UF";
pub const LAT_COLUMN: &str = "LAT";
pub const LON_COLUMN: &str = "LON";

// Appended to a derived column name that a raw header already uses.
pub const DERIVED_SUFFIX: &str = "_DERIVADO";

/// Values the cleaning phase computes for every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derived {
    Amount,
    Date,
    Reason,
    Region,
    Lat,
    Lon,
}

pub const DERIVED_COLUMNS: [(&str, Derived); 6] = [
    (AMOUNT_COLUMN, Derived::Amount),
    (DATE_COLUMN, Derived::Date),
    (REASON_COLUMN, Derived::Reason),
    (REGION_COLUMN, Derived::Region),
    (LAT_COLUMN, Derived::Lat),
    (LON_COLUMN, Derived::Lon),
];

/// Names for the derived columns that never shadow a raw header: a clashing
/// name gets [`DERIVED_SUFFIX`] until it is free.
pub fn derived_names(headers: &[String]) -> Vec<(String, Derived)> {
    let mut names: Vec<(String, Derived)> = Vec::with_capacity(DERIVED_COLUMNS.len());
    for (base, kind) in DERIVED_COLUMNS {
        let mut name = base.to_string();
        while headers.iter().any(|h| *h == name) || names.iter().any(|(n, _)| *n == name) {
            name.push_str(DERIVED_SUFFIX);
        }
        names.push((name, kind));
    }
    names
}

/// Semicolon-separated file as read from disk: trimmed headers and rows
/// padded to the header width.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub skipped: usize,
}

/// One infraction: the raw ledger cells plus everything derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct FineRecord {
    pub cells: Vec<String>,
    pub supplier: Option<String>,
    pub plate: Option<String>,
    pub operation: Option<String>,
    pub amount: f64,
    pub date: Option<NaiveDate>,
    pub reason: String,
    pub region: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub headers: Vec<String>,
    /// Table names of the derived columns, see [`derived_names`].
    pub derived: Vec<(String, Derived)>,
    pub columns: ResolvedColumns,
    pub records: Vec<FineRecord>,
    pub report: LoadReport,
}

impl Dataset {
    /// Raw headers followed by the derived columns.
    pub fn table_columns(&self) -> Vec<String> {
        self.headers
            .iter()
            .chain(self.derived.iter().map(|(name, _)| name))
            .cloned()
            .collect()
    }

    /// Text of `column` for `record`, or `None` if the column does not
    /// exist. Raw headers are looked up first.
    pub fn cell(&self, record: &FineRecord, column: &str) -> Option<String> {
        if let Some(index) = self.headers.iter().position(|h| h == column) {
            return Some(record.cells.get(index).cloned().unwrap_or_default());
        }
        let (_, kind) = self.derived.iter().find(|(name, _)| name == column)?;
        Some(match kind {
            Derived::Amount => format!("{:.2}", record.amount),
            Derived::Date => record.date.map(format_date).unwrap_or_default(),
            Derived::Reason => record.reason.clone(),
            Derived::Region => record.region.clone(),
            Derived::Lat => record.lat.to_string(),
            Derived::Lon => record.lon.to_string(),
        })
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column) || self.derived.iter().any(|(name, _)| name == column)
    }
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MapPointRow {
    #[serde(rename = "UF")]
    #[tabled(rename = "UF")]
    pub region: String,
    #[serde(rename = "Fornecedor")]
    #[tabled(rename = "Fornecedor")]
    pub supplier: String,
    #[serde(rename = "Lat")]
    #[tabled(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    #[tabled(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "Multas")]
    #[tabled(rename = "Multas")]
    pub fines: usize,
    #[serde(rename = "Valor")]
    #[tabled(rename = "Valor", display_with = "display_money")]
    pub total: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct ReasonCountRow {
    #[serde(rename = "Motivo")]
    #[tabled(rename = "Motivo")]
    pub reason: String,
    #[serde(rename = "Quantidade")]
    #[tabled(rename = "Quantidade")]
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthlyCostRow {
    #[serde(rename = "Mes")]
    #[tabled(rename = "Mes")]
    pub month: String,
    #[serde(rename = "Valor")]
    #[tabled(rename = "Valor", display_with = "display_money")]
    pub total: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Kpis {
    pub total_cost: f64,
    pub infractions: usize,
    pub top_offender: String,
}

fn display_money(v: &f64) -> String {
    format_number(*v, 2)
}
