use crate::error::Error;
use crate::reports::{Dashboard, Panel};
use crate::types::{Dataset, FineRecord};
use crate::util::{format_brl, format_int};
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), Error> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Write filtered records with every raw and derived column.
pub fn write_records_csv<W: std::io::Write>(
    wtr: W,
    dataset: &Dataset,
    rows: &[&FineRecord],
) -> Result<(), Error> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(wtr);
    let columns = dataset.table_columns();
    wtr.write_record(&columns)?;
    for r in rows {
        wtr.write_record(columns.iter().map(|c| dataset.cell(r, c).unwrap_or_default()))?;
    }
    wtr.flush().map_err(|e| Error::Csv(e.into()))?;
    Ok(())
}

pub fn table_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

/// Raw data table: raw ledger columns plus the derived ones.
pub fn records_table(dataset: &Dataset, rows: &[&FineRecord], max_rows: usize) -> String {
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    let columns = dataset.table_columns();
    let mut builder = Builder::default();
    builder.push_record(columns.clone());
    for r in rows.iter().take(max_rows) {
        builder.push_record(columns.iter().map(|c| dataset.cell(r, c).unwrap_or_default()));
    }
    builder.build().with(Style::markdown()).to_string()
}

fn panel<T>(title: &str, panel: &Panel<Vec<T>>, max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    match panel {
        Panel::Ready(rows) => format!("## {}\n\n{}\n", title, table_rows(rows, max_rows)),
        Panel::Placeholder(msg) => format!("## {}\n\n{}\n", title, msg),
    }
}

/// Whole dashboard as markdown: KPIs, map, reasons, timeline, raw rows.
pub fn render_dashboard(
    dataset: &Dataset,
    dashboard: &Dashboard,
    table: &[&FineRecord],
    logo: Option<&Path>,
    max_rows: usize,
) -> String {
    let mut out = String::new();
    if let Some(logo) = logo {
        out.push_str(&format!("[logo: {}]\n", logo.display()));
    }
    out.push_str("# Traffic fines\n\n");
    out.push_str(&format!(
        "| Total cost | Infractions | Top offender |\n|---|---|---|\n| {} | {} | {} |\n\n",
        format_brl(dashboard.kpis.total_cost),
        format_int(dashboard.kpis.infractions),
        dashboard.kpis.top_offender
    ));
    out.push_str(&panel("Heat map", &dashboard.map, max_rows));
    out.push('\n');
    out.push_str(&panel("Reasons", &dashboard.reasons, max_rows));
    out.push('\n');
    out.push_str("## Monthly cost\n\n");
    out.push_str(&table_rows(&dashboard.timeline.months, usize::MAX));
    out.push('\n');
    if dashboard.timeline.undated_count > 0 {
        out.push_str(&format!(
            "({} undated records, {})\n",
            format_int(dashboard.timeline.undated_count),
            format_brl(dashboard.timeline.undated_total)
        ));
    }
    out.push_str(&format!("\n## Raw data ({} rows)\n\n", format_int(table.len())));
    out.push_str(&records_table(dataset, table, max_rows));
    out.push('\n');
    out
}
