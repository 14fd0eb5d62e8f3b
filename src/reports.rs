use crate::config::DashboardConfig;
use crate::types::{Dataset, FineRecord, Kpis, MapPointRow, MonthlyCostRow, ReasonCountRow};
use crate::util::normalize_key;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

const NOT_FOUND_OPERATION: &str = "NAO LOCALIZADA";

/// A chart either has data or says why it is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready(T),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub months: Vec<MonthlyCostRow>,
    pub undated_total: f64,
    pub undated_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub kpis: Kpis,
    pub map: Panel<Vec<MapPointRow>>,
    pub reasons: Panel<Vec<ReasonCountRow>>,
    pub timeline: Timeline,
}

pub fn generate_kpis(rows: &[&FineRecord]) -> Kpis {
    Kpis {
        total_cost: rows.iter().map(|r| r.amount).sum(),
        infractions: rows.len(),
        top_offender: top_offender(rows).unwrap_or_else(|| "N/A".to_string()),
    }
}

/// Most frequent operation, ignoring operations the ledger marks as not
/// located. Ties go to the alphabetically first name.
pub fn top_offender(rows: &[&FineRecord]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for op in rows.iter().filter_map(|r| r.operation.as_deref()) {
        if normalize_key(op).contains(NOT_FOUND_OPERATION) {
            continue;
        }
        *counts.entry(op).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(op, _)| op.to_string())
}

/// One point per supplier location, sentinel-region rows left out.
pub fn generate_map_points(rows: &[&FineRecord], cfg: &DashboardConfig) -> Panel<Vec<MapPointRow>> {
    if rows.is_empty() {
        return Panel::Placeholder("Insufficient data.".to_string());
    }
    let mut map: BTreeMap<(String, String), MapPointRow> = BTreeMap::new();
    for r in rows.iter().filter(|r| r.region != cfg.sentinel_region) {
        let supplier = r.supplier.clone().unwrap_or_default();
        let e = map
            .entry((r.region.clone(), supplier.clone()))
            .or_insert_with(|| MapPointRow {
                region: r.region.clone(),
                supplier,
                lat: r.lat,
                lon: r.lon,
                fines: 0,
                total: 0.0,
            });
        e.fines += 1;
        e.total += r.amount;
    }
    if map.is_empty() {
        return Panel::Placeholder("No geographic data.".to_string());
    }
    let mut points: Vec<MapPointRow> = map.into_values().collect();
    points.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    Panel::Ready(points)
}

/// Most common canonical reasons, largest first.
pub fn generate_reasons(dataset: &Dataset, rows: &[&FineRecord], top: usize) -> Panel<Vec<ReasonCountRow>> {
    if dataset.columns.reason.is_none() {
        return Panel::Placeholder("The ledger has no observation column.".to_string());
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in rows {
        *counts.entry(r.reason.as_str()).or_default() += 1;
    }
    let mut out: Vec<ReasonCountRow> = counts
        .into_iter()
        .map(|(reason, count)| ReasonCountRow {
            reason: reason.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
    out.truncate(top);
    Panel::Ready(out)
}

/// Cost per month (`YYYY-MM`), oldest first. Undated rows are totalled apart.
pub fn generate_timeline(rows: &[&FineRecord]) -> Timeline {
    let mut months: BTreeMap<String, f64> = BTreeMap::new();
    let (mut undated_total, mut undated_count) = (0.0, 0usize);
    for r in rows {
        match r.date {
            Some(d) => *months.entry(d.format("%Y-%m").to_string()).or_default() += r.amount,
            None => {
                undated_total += r.amount;
                undated_count += 1;
            }
        }
    }
    Timeline {
        months: months
            .into_iter()
            .map(|(month, total)| MonthlyCostRow { month, total })
            .collect(),
        undated_total,
        undated_count,
    }
}

/// Rows for the raw table: newest first, undated last.
pub fn sorted_for_table<'a>(rows: &[&'a FineRecord]) -> Vec<&'a FineRecord> {
    let mut out = rows.to_vec();
    // `None < Some`, so reversing the date order puts undated rows last.
    out.sort_by(|a, b| b.date.cmp(&a.date));
    out
}

pub fn generate_dashboard(dataset: &Dataset, rows: &[&FineRecord], cfg: &DashboardConfig) -> Dashboard {
    Dashboard {
        kpis: generate_kpis(rows),
        map: generate_map_points(rows, cfg),
        reasons: generate_reasons(dataset, rows, cfg.top_reasons),
        timeline: generate_timeline(rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(op: Option<&str>, region: &str, amount: f64, date: Option<(i32, u32, u32)>) -> FineRecord {
        FineRecord {
            cells: vec![],
            supplier: Some(format!("ORG-{}", region)),
            plate: None,
            operation: op.map(str::to_string),
            amount,
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            reason: "EXCESSO DE VELOCIDADE".into(),
            region: region.into(),
            lat: 1.0,
            lon: 2.0,
        }
    }

    #[test]
    fn top_offender_skips_not_located() {
        let records = vec![
            record(Some("OPERAÇÃO NÃO LOCALIZADA"), "SP", 1.0, None),
            record(Some("Operação não localizada"), "SP", 1.0, None),
            record(Some("COLETA"), "SP", 1.0, None),
            record(Some("ENTREGA"), "SP", 1.0, None),
        ];
        let rows: Vec<&FineRecord> = records.iter().collect();
        // Tie between COLETA and ENTREGA goes alphabetically.
        assert_eq!(top_offender(&rows).as_deref(), Some("COLETA"));
        assert_eq!(top_offender(&rows[..2]), None);
        assert_eq!(generate_kpis(&rows[..2]).top_offender, "N/A");
    }

    #[test]
    fn map_placeholders() {
        let cfg = DashboardConfig::default();
        assert_eq!(
            generate_map_points(&[], &cfg),
            Panel::Placeholder("Insufficient data.".into())
        );
        let only_unmapped = [record(None, "OUTROS", 5.0, None)];
        let rows: Vec<&FineRecord> = only_unmapped.iter().collect();
        assert_eq!(
            generate_map_points(&rows, &cfg),
            Panel::Placeholder("No geographic data.".into())
        );
    }

    #[test]
    fn map_points_aggregate_by_supplier() {
        let cfg = DashboardConfig::default();
        let records = [
            record(None, "SP", 10.0, None),
            record(None, "SP", 15.0, None),
            record(None, "RJ", 30.0, None),
            record(None, "OUTROS", 99.0, None),
        ];
        let rows: Vec<&FineRecord> = records.iter().collect();
        let Panel::Ready(points) = generate_map_points(&rows, &cfg) else {
            panic!("expected map points");
        };
        assert_eq!(points.len(), 2);
        assert_eq!((points[0].region.as_str(), points[0].total), ("RJ", 30.0));
        assert_eq!((points[1].region.as_str(), points[1].fines), ("SP", 2));
    }

    #[test]
    fn timeline_groups_by_month() {
        let records = [
            record(None, "SP", 10.0, Some((2024, 1, 5))),
            record(None, "SP", 5.0, Some((2024, 1, 20))),
            record(None, "SP", 7.0, Some((2023, 12, 1))),
            record(None, "SP", 3.0, None),
        ];
        let rows: Vec<&FineRecord> = records.iter().collect();
        let t = generate_timeline(&rows);
        assert_eq!(
            t.months,
            vec![
                MonthlyCostRow { month: "2023-12".into(), total: 7.0 },
                MonthlyCostRow { month: "2024-01".into(), total: 15.0 },
            ]
        );
        assert_eq!((t.undated_total, t.undated_count), (3.0, 1));
    }

    #[test]
    fn table_is_newest_first_with_undated_last() {
        let records = [
            record(Some("A"), "SP", 1.0, None),
            record(Some("B"), "SP", 1.0, Some((2024, 1, 1))),
            record(Some("C"), "SP", 1.0, Some((2024, 6, 1))),
        ];
        let rows: Vec<&FineRecord> = records.iter().collect();
        let ops: Vec<&str> = sorted_for_table(&rows)
            .iter()
            .filter_map(|r| r.operation.as_deref())
            .collect();
        assert_eq!(ops, vec!["C", "B", "A"]);
    }
}
