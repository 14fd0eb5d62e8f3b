// Locating semantically-named columns in ledger headers that vary between
// exports.
use crate::config::{ColumnSpec, ColumnsConfig};
use crate::util::normalize_key;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub name: String,
    pub index: usize,
}

/// Return the first header matching a candidate, trying candidates in
/// priority order. For each candidate an exact match on the normalized name
/// beats a partial (substring) match.
pub fn find_column<S: AsRef<str>>(headers: &[S], candidates: &[String]) -> Option<ResolvedColumn> {
    let keys: Vec<String> = headers.iter().map(|h| normalize_key(h.as_ref())).collect();
    for candidate in candidates {
        let needle = normalize_key(candidate);
        if needle.is_empty() {
            continue;
        }
        let hit = keys
            .iter()
            .position(|k| *k == needle)
            .or_else(|| keys.iter().position(|k| k.contains(&needle)));
        if let Some(index) = hit {
            return Some(ResolvedColumn {
                name: headers[index].as_ref().to_string(),
                index,
            });
        }
    }
    None
}

/// Resolve one column: the explicit name when the ledger has it, the
/// fallback candidates otherwise.
pub fn resolve<S: AsRef<str>>(headers: &[S], spec: &ColumnSpec) -> Option<ResolvedColumn> {
    if let Some(name) = &spec.name {
        let wanted = normalize_key(name);
        if let Some(index) = headers.iter().position(|h| normalize_key(h.as_ref()) == wanted) {
            return Some(ResolvedColumn {
                name: headers[index].as_ref().to_string(),
                index,
            });
        }
        warn!("configured column `{}` not in ledger, using fallback candidates", name);
    }
    find_column(headers, &spec.candidates)
}

/// Ledger columns the dashboard knows how to use. Each one is optional and
/// only disables its own feature when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedColumns {
    pub amount: Option<ResolvedColumn>,
    pub date: Option<ResolvedColumn>,
    pub due_date: Option<ResolvedColumn>,
    pub supplier: Option<ResolvedColumn>,
    pub reason: Option<ResolvedColumn>,
    pub plate: Option<ResolvedColumn>,
    pub operation: Option<ResolvedColumn>,
}

impl ResolvedColumns {
    pub fn resolve<S: AsRef<str>>(headers: &[S], cfg: &ColumnsConfig) -> Self {
        let cols = Self {
            amount: resolve(headers, &cfg.amount),
            date: resolve(headers, &cfg.date),
            due_date: resolve(headers, &cfg.due_date),
            supplier: resolve(headers, &cfg.supplier),
            reason: resolve(headers, &cfg.reason),
            plate: resolve(headers, &cfg.plate),
            operation: resolve(headers, &cfg.operation),
        };
        debug!(?cols, "resolved ledger columns");
        cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cands(c: &[&str]) -> Vec<String> {
        c.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partial_match_is_case_insensitive() {
        let headers = ["Placa", "Fornecedor / Orgao", "Vlr. Total"];
        let col = find_column(&headers, &cands(&["VLR", "VALOR"])).unwrap();
        assert_eq!(col, ResolvedColumn { name: "Vlr. Total".into(), index: 2 });
    }

    #[test]
    fn exact_match_beats_earlier_partial() {
        let headers = ["DATA DEFINITIVA ANTIGA", "DATA DEFINITIVA"];
        let col = find_column(&headers, &cands(&["data definitiva"])).unwrap();
        assert_eq!(col.index, 1);
    }

    #[test]
    fn candidate_priority_wins_over_header_order() {
        let headers = ["MOTIVO", "OBSERVAÇÃO"];
        let col = find_column(&headers, &cands(&["OBSERVACAO", "MOTIVO"])).unwrap();
        assert_eq!(col.name, "OBSERVAÇÃO");
    }

    #[test]
    fn missing_column_is_none() {
        let headers = ["PLACA", "FORNECEDOR"];
        assert_eq!(find_column(&headers, &cands(&["VLR", "VALOR"])), None);
        assert_eq!(find_column(&headers, &cands(&[""])), None);
    }

    #[test]
    fn explicit_name_overrides_candidates() {
        let headers = ["Valor Original", "Valor Pago"];
        let spec = ColumnSpec {
            name: Some("valor pago".into()),
            candidates: cands(&["VALOR"]),
        };
        assert_eq!(resolve(&headers, &spec).unwrap().index, 1);

        let absent = ColumnSpec {
            name: Some("Valor Corrigido".into()),
            candidates: cands(&["VALOR"]),
        };
        assert_eq!(resolve(&headers, &absent).unwrap().index, 0);
    }

    #[test]
    fn default_config_resolves_typical_export() {
        let headers = [
            "Fornecedor", "OPERAÇÃO", "PLACA", "DATA DEFINITIVA", "Vlr. Total", "OBSERVAÇÃO",
        ];
        let cols = ResolvedColumns::resolve(&headers, &ColumnsConfig::default());
        assert_eq!(cols.supplier.unwrap().index, 0);
        assert_eq!(cols.operation.unwrap().index, 1);
        assert_eq!(cols.plate.unwrap().index, 2);
        assert_eq!(cols.date.unwrap().index, 3);
        assert_eq!(cols.amount.unwrap().index, 4);
        assert_eq!(cols.reason.unwrap().index, 5);
        assert!(cols.due_date.is_none());
    }
}
