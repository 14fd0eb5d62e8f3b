// Supplier → region/coordinates lookup and the left join onto fine records.
use crate::config::DashboardConfig;
use crate::error::Error;
use crate::loader::{decode_text, read_table};
use crate::types::{FineRecord, RawTable};
use crate::util::parse_number;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

pub const KEY_COLUMN: &str = "fornecedor";
pub const REGION_COLUMN: &str = "uf_correta";
pub const LAT_COLUMN: &str = "lat";
pub const LON_COLUMN: &str = "lon";

/// Mapping values; any of them may be missing in the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub region: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct SupplierMapping {
    entries: HashMap<String, Location>,
}

impl SupplierMapping {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let (text, _) = decode_text(bytes);
        Ok(Self::from_table(read_table(&text)?))
    }

    /// Build the lookup from a mapping table. Headers are compared
    /// lowercased; a table without a `fornecedor` column maps nothing.
    pub fn from_table(table: RawTable) -> Self {
        let headers: Vec<String> = table.headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |name: &str| headers.iter().position(|h| h == name);
        let Some(key_idx) = find(KEY_COLUMN) else {
            warn!("mapping file has no `{}` column, every supplier is unmapped", KEY_COLUMN);
            return Self::default();
        };
        let (region_idx, lat_idx, lon_idx) = (find(REGION_COLUMN), find(LAT_COLUMN), find(LON_COLUMN));
        let get = |row: &[String], idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| row.get(i))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut entries = HashMap::new();
        for row in &table.rows {
            let row = row.as_slice();
            let Some(key) = get(row, Some(key_idx)) else {
                continue;
            };
            let location = Location {
                region: get(row, region_idx),
                lat: get(row, lat_idx).as_deref().and_then(parse_number),
                lon: get(row, lon_idx).as_deref().and_then(parse_number),
            };
            match entries.entry(key) {
                Entry::Vacant(e) => {
                    e.insert(location);
                }
                Entry::Occupied(e) => {
                    warn!("duplicate mapping for supplier `{}`, keeping the first", e.key());
                }
            }
        }
        info!("{} suppliers mapped", entries.len());
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, supplier: &str) -> Option<&Location> {
        self.entries.get(supplier.trim())
    }

    pub fn suppliers(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Left join: each record gets its supplier's region and coordinates,
    /// or the sentinel region and fallback coordinate. Records are updated
    /// in place, so the row count cannot change.
    pub fn join(&self, records: &mut [FineRecord], cfg: &DashboardConfig) {
        for r in records.iter_mut() {
            let location = r.supplier.as_deref().and_then(|s| self.get(s));
            r.region = location
                .and_then(|l| l.region.clone())
                .unwrap_or_else(|| cfg.sentinel_region.clone());
            r.lat = location.and_then(|l| l.lat).unwrap_or(cfg.fallback_lat);
            r.lon = location.and_then(|l| l.lon).unwrap_or(cfg.fallback_lon);
        }
    }
}

/// Suppliers present in the ledger but absent from the mapping, sorted.
pub fn missing_suppliers(records: &[FineRecord], mapping: &SupplierMapping) -> BTreeSet<String> {
    records
        .iter()
        .filter_map(|r| r.supplier.as_deref())
        .map(str::trim)
        .filter(|s| mapping.get(s).is_none())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(supplier: Option<&str>) -> FineRecord {
        FineRecord {
            cells: vec![],
            supplier: supplier.map(str::to_string),
            plate: None,
            operation: None,
            amount: 0.0,
            date: None,
            reason: "X".into(),
            region: String::new(),
            lat: 0.0,
            lon: 0.0,
        }
    }

    fn mapping(text: &str) -> SupplierMapping {
        SupplierMapping::from_bytes(text.as_bytes()).unwrap()
    }

    #[test]
    fn unmatched_supplier_gets_sentinel_and_fallback() {
        let map = mapping("Fornecedor ; UF_CORRETA;lat;lon\nDER-SP;SP;-23,55;-46.63\n");
        let mut records = vec![record(Some(" DER-SP ")), record(Some("PRF-XX")), record(None)];
        map.join(&mut records, &DashboardConfig::default());

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].region, "SP");
        assert_eq!((records[0].lat, records[0].lon), (-23.55, -46.63));
        for r in &records[1..] {
            assert_eq!(r.region, "OUTROS");
            assert_eq!((r.lat, r.lon), (-15.78, -47.92));
        }
    }

    #[test]
    fn duplicate_keys_do_not_duplicate_records() {
        let map = mapping("fornecedor;uf_correta;lat;lon\nDETRAN;MG;1;2\nDETRAN;RJ;3;4\n");
        assert_eq!(map.len(), 1);
        let mut records = vec![record(Some("DETRAN")), record(Some("DETRAN"))];
        map.join(&mut records, &DashboardConfig::default());
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.region == "MG"));
    }

    #[test]
    fn partial_mapping_rows_fall_back_per_field() {
        let map = mapping("fornecedor;uf_correta;lat\nANTT;;x\nDNIT;DF;-15.8\n");
        let mut records = vec![record(Some("ANTT")), record(Some("DNIT"))];
        map.join(&mut records, &DashboardConfig::default());
        assert_eq!(records[0].region, "OUTROS");
        assert_eq!(records[0].lat, -15.78);
        assert_eq!(records[1].region, "DF");
        assert_eq!((records[1].lat, records[1].lon), (-15.8, -47.92));
    }

    #[test]
    fn missing_key_column_maps_nothing() {
        let map = mapping("orgao;uf_correta\nDER;SP\n");
        assert!(map.is_empty());
    }

    #[test]
    fn lists_unmapped_suppliers() {
        let map = mapping("fornecedor;uf_correta\nDER-SP;SP\n");
        let records = vec![
            record(Some("PRF")),
            record(Some("DER-SP")),
            record(Some("ANTT ")),
            record(Some("PRF")),
        ];
        let missing: Vec<String> = missing_suppliers(&records, &map).into_iter().collect();
        assert_eq!(missing, vec!["ANTT", "PRF"]);
    }
}
