// Dashboard configuration.
//
// Every field has a default so an empty JSON object (or no file at all)
// reproduces the behavior expected by the existing ledger exports.
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SENTINEL_REGION: &str = "OUTROS";
/// Brasília, used for rows whose supplier has no mapping entry.
pub const FALLBACK_LAT: f64 = -15.78;
pub const FALLBACK_LON: f64 = -47.92;
pub const DATE_FALLBACK_THRESHOLD: f64 = 0.9;
pub const TOP_REASONS: usize = 10;

/// How one semantic column is located in the ledger headers.
///
/// `name` is an explicit header and wins whenever the ledger has it.
/// `candidates` are header fragments tried in order when `name` is absent
/// or missing from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSpec {
    pub name: Option<String>,
    pub candidates: Vec<String>,
}

impl ColumnSpec {
    pub fn fallback(candidates: &[&str]) -> Self {
        Self {
            name: None,
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub amount: ColumnSpec,
    pub date: ColumnSpec,
    pub due_date: ColumnSpec,
    pub supplier: ColumnSpec,
    pub reason: ColumnSpec,
    pub plate: ColumnSpec,
    pub operation: ColumnSpec,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            amount: ColumnSpec::fallback(&["VLR", "VALOR"]),
            date: ColumnSpec::fallback(&["DATA DEFINITIVA", "DATA DA INFRACAO", "DATA INFRACAO"]),
            due_date: ColumnSpec::fallback(&["VENCIMENTO", "DATA VENC"]),
            supplier: ColumnSpec::fallback(&["FORNECEDOR", "ORGAO"]),
            reason: ColumnSpec::fallback(&["OBSERVACAO", "MOTIVO"]),
            plate: ColumnSpec::fallback(&["PLACA"]),
            operation: ColumnSpec::fallback(&["OPERACAO"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub columns: ColumnsConfig,
    pub sentinel_region: String,
    pub fallback_lat: f64,
    pub fallback_lon: f64,
    /// Share of unparseable primary dates above which the due-date column is used.
    pub date_fallback_threshold: f64,
    pub top_reasons: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            columns: ColumnsConfig::default(),
            sentinel_region: SENTINEL_REGION.to_string(),
            fallback_lat: FALLBACK_LAT,
            fallback_lon: FALLBACK_LON,
            date_fallback_threshold: DATE_FALLBACK_THRESHOLD,
            top_reasons: TOP_REASONS,
        }
    }
}

impl DashboardConfig {
    pub fn from_json(s: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let s = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        assert_eq!(DashboardConfig::from_json("{}").unwrap(), DashboardConfig::default());
    }

    #[test]
    fn partial_column_override_keeps_other_defaults() {
        let cfg = DashboardConfig::from_json(
            r#"{"columns": {"amount": {"name": "Valor Pago"}}, "top_reasons": 5}"#,
        )
        .unwrap();
        assert_eq!(cfg.columns.amount.name.as_deref(), Some("Valor Pago"));
        assert!(cfg.columns.amount.candidates.is_empty());
        assert_eq!(cfg.columns.supplier, ColumnsConfig::default().supplier);
        assert_eq!(cfg.top_reasons, 5);
        assert_eq!(cfg.sentinel_region, "OUTROS");
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            DashboardConfig::from_json("{not json"),
            Err(Error::Config(_))
        ));
    }
}
