use crate::columns::{ResolvedColumn, ResolvedColumns};
use crate::config::DashboardConfig;
use crate::error::Error;
use crate::geo::SupplierMapping;
use crate::reason::canonicalize;
use crate::types::{derived_names, Dataset, FineRecord, RawTable};
use crate::util::{parse_amount, parse_date_dayfirst};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Encoding {
    Utf8,
    Latin1,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub total_rows: usize,
    pub skipped_rows: usize,
    pub encoding: Option<Encoding>,
    /// Header the dates were read from, if any.
    pub date_column: Option<String>,
    pub date_fallback_used: bool,
    pub undated_rows: usize,
    pub unmatched_suppliers: usize,
}

/// The two files a dashboard is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSources {
    pub ledger: PathBuf,
    pub mapping: PathBuf,
}

impl DataSources {
    /// Use `ledger` when given, otherwise the first `*.csv` in `dir` (by
    /// name) that is not a mapping file.
    pub fn discover(dir: &Path, ledger: Option<PathBuf>, mapping: PathBuf) -> Result<Self, Error> {
        if let Some(ledger) = ledger {
            return Ok(Self { ledger, mapping });
        }
        let entries = std::fs::read_dir(dir).map_err(|source| Error::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                let name = p
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                name.ends_with(".csv") && !name.contains("mapeamento")
            })
            .collect();
        candidates.sort();
        let ledger = candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoLedger(dir.to_path_buf()))?;
        info!("using ledger {}", ledger.display());
        Ok(Self { ledger, mapping })
    }
}

/// Decode file bytes: UTF-8 (with or without BOM), falling back to Latin-1.
pub fn decode_text(bytes: &[u8]) -> (String, Encoding) {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), Encoding::Utf8),
        // Latin-1 maps every byte to the code point of the same value.
        Err(_) => (bytes.iter().map(|&b| b as char).collect(), Encoding::Latin1),
    }
}

/// Read a `;`-separated table. Rows the CSV reader rejects, or with more
/// fields than the header, are skipped and counted; short rows are padded.
pub fn read_table(text: &str) -> Result<RawTable, Error> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let width = headers.len();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping unreadable row {}: {}", line + 2, e);
                skipped += 1;
                continue;
            }
        };
        if record.len() > width {
            debug!("skipping row {}: {} fields, expected {}", line + 2, record.len(), width);
            skipped += 1;
            continue;
        }
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        cells.resize(width, String::new());
        rows.push(cells);
    }
    if skipped > 0 {
        warn!("{} malformed rows skipped", skipped);
    }
    Ok(RawTable { headers, rows, skipped })
}

pub fn read_file(path: &Path) -> Result<Vec<u8>, Error> {
    if !path.exists() {
        return Err(Error::MissingFile(path.to_path_buf()));
    }
    std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_dataset(sources: &DataSources, cfg: &DashboardConfig) -> Result<Dataset, Error> {
    // The mapping is checked first: without it nothing can be joined.
    let mapping_bytes = read_file(&sources.mapping)?;
    let ledger_bytes = read_file(&sources.ledger)?;
    load_dataset_from_bytes(&ledger_bytes, &mapping_bytes, cfg)
}

pub fn load_dataset_from_bytes(
    ledger: &[u8],
    mapping: &[u8],
    cfg: &DashboardConfig,
) -> Result<Dataset, Error> {
    let mapping = SupplierMapping::from_bytes(mapping)?;
    load_ledger(ledger, &mapping, cfg)
}

/// Clean `ledger` and join it against an already parsed mapping.
pub fn load_ledger(
    ledger: &[u8],
    mapping: &SupplierMapping,
    cfg: &DashboardConfig,
) -> Result<Dataset, Error> {
    let (text, encoding) = decode_text(ledger);
    if encoding == Encoding::Latin1 {
        info!("ledger is not valid UTF-8, decoded as Latin-1");
    }
    let table = read_table(&text)?;
    let mut dataset = clean(table, cfg);
    dataset.report.encoding = Some(encoding);
    mapping.join(&mut dataset.records, cfg);
    dataset.report.unmatched_suppliers = dataset
        .records
        .iter()
        .filter(|r| r.region == cfg.sentinel_region)
        .count();
    Ok(dataset)
}

fn cell<'a>(row: &'a [String], col: &Option<ResolvedColumn>) -> Option<&'a str> {
    col.as_ref().and_then(|c| row.get(c.index)).map(String::as_str)
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Pick the column dates are read from: the primary one unless it is
/// missing or mostly unparseable, in which case the due date.
pub fn choose_date_column(
    rows: &[Vec<String>],
    columns: &ResolvedColumns,
    threshold: f64,
) -> (Option<ResolvedColumn>, bool) {
    let due = columns.due_date.clone();
    let Some(primary) = columns.date.clone() else {
        return (due.clone(), due.is_some());
    };
    if rows.is_empty() || due.is_none() {
        return (Some(primary), false);
    }
    let failed = rows
        .iter()
        .filter(|r| parse_date_dayfirst(r.get(primary.index).map(String::as_str).unwrap_or("")).is_none())
        .count();
    let ratio = failed as f64 / rows.len() as f64;
    if ratio > threshold {
        warn!(
            "{:.0}% of `{}` unparseable, using `{}`",
            ratio * 100.0,
            primary.name,
            due.as_ref().map(|d| d.name.as_str()).unwrap_or_default()
        );
        (due, true)
    } else {
        (Some(primary), false)
    }
}

/// Turn raw rows into fine records. Region and coordinates are left at the
/// sentinel values until the join.
pub fn clean(table: RawTable, cfg: &DashboardConfig) -> Dataset {
    let columns = ResolvedColumns::resolve(&table.headers, &cfg.columns);
    if columns.amount.is_none() {
        warn!("no amount column found, costs will be zero");
    }
    let (date_col, date_fallback_used) =
        choose_date_column(&table.rows, &columns, cfg.date_fallback_threshold);
    if date_col.is_none() {
        warn!("no date column found, records are undated");
    }

    let total_rows = table.rows.len();
    let mut undated_rows = 0usize;
    let records: Vec<FineRecord> = table
        .rows
        .into_iter()
        .map(|row| {
            let amount = cell(&row, &columns.amount).map(parse_amount).unwrap_or(0.0);
            let date: Option<NaiveDate> = cell(&row, &date_col).and_then(parse_date_dayfirst);
            if date.is_none() {
                undated_rows += 1;
            }
            FineRecord {
                supplier: non_empty(cell(&row, &columns.supplier)),
                plate: non_empty(cell(&row, &columns.plate)),
                operation: non_empty(cell(&row, &columns.operation)),
                amount,
                date,
                reason: canonicalize(cell(&row, &columns.reason)),
                region: cfg.sentinel_region.clone(),
                lat: cfg.fallback_lat,
                lon: cfg.fallback_lon,
                cells: row,
            }
        })
        .collect();

    info!("{} ledger rows cleaned", records.len());
    let report = LoadReport {
        total_rows: total_rows + table.skipped,
        skipped_rows: table.skipped,
        encoding: None,
        date_column: date_col.map(|c| c.name),
        date_fallback_used,
        undated_rows,
        unmatched_suppliers: 0,
    };
    Dataset {
        derived: derived_names(&table.headers),
        headers: table.headers,
        columns,
        records,
        report,
    }
}
