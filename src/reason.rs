// Free-text observation → canonical infraction category.
//
// Categories are open: text that matches no keyword becomes its own
// category, so they are plain strings rather than an enum.
use crate::util::fold_accents;
use once_cell::sync::Lazy;
use regex::Regex;

pub const NO_OBSERVATION: &str = "SEM OBSERVAÇÃO";

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,2}[/-]\d{1,2}([/-]\d{2,4})?").expect("valid date regex"));
static MONEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"R\$\s?[\d.,]+").expect("valid money regex"));
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3,}\b").expect("valid code regex"));
// Legacy AAA9999 and Mercosul AAA9A99 plates.
static PLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z]{3}(?:\d{4}|\d[A-Z]\d{2})\b").expect("valid plate regex")
});
static PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").expect("valid punctuation regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Ordered keyword table; the first row with any matching keyword wins.
/// Keywords are matched against accent-folded text.
const CATEGORIES: &[(&[&str], &str)] = &[
    (&["VELOCIDADE", "RADAR"], "EXCESSO DE VELOCIDADE"),
    (&["FAROL"], "FAROL DESLIGADO"),
    (&["CINTO"], "FALTA DE CINTO"),
    (&["CELULAR", "TELEFONE"], "USO DE CELULAR"),
    (&["ESTACION"], "ESTACIONAMENTO IRREGULAR"),
    (&["ULTRAPASS"], "ULTRAPASSAGEM INDEVIDA"),
    (
        &["IDENTIFICACAO DO CONDUTOR", "INDICACAO DO CONDUTOR", "NAO IDENTIF"],
        "NÃO IDENTIFICAÇÃO DO CONDUTOR",
    ),
];

/// Strip dates, amounts, numeric codes and plates from an observation,
/// then collapse punctuation and whitespace.
pub fn scrub(raw: &str) -> String {
    let s = raw.to_uppercase();
    let s = DATE_RE.replace_all(&s, " ");
    let s = MONEY_RE.replace_all(&s, " ");
    let s = CODE_RE.replace_all(&s, " ");
    let s = PLATE_RE.replace_all(&s, " ");
    let s = PUNCT_RE.replace_all(&s, " ");
    SPACE_RE.replace_all(&s, " ").trim().to_string()
}

/// Canonical category for a raw observation. `None`, blank text and text
/// that is blank once scrubbed all map to [`NO_OBSERVATION`].
pub fn canonicalize(raw: Option<&str>) -> String {
    let cleaned = match raw {
        Some(r) => scrub(r),
        None => return NO_OBSERVATION.to_string(),
    };
    if cleaned.is_empty() {
        return NO_OBSERVATION.to_string();
    }
    let folded = fold_accents(&cleaned);
    CATEGORIES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| folded.contains(k)))
        .map(|(_, category)| category.to_string())
        .unwrap_or(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radar_with_noise_is_speeding() {
        assert_eq!(
            canonicalize(Some("RADAR NA BR-101 10/11 R$150,00")),
            "EXCESSO DE VELOCIDADE"
        );
        assert_eq!(
            canonicalize(Some("transitar em velocidade superior à máxima")),
            "EXCESSO DE VELOCIDADE"
        );
    }

    #[test]
    fn keyword_table_order() {
        assert_eq!(canonicalize(Some("farol apagado rodovia")), "FAROL DESLIGADO");
        assert_eq!(canonicalize(Some("Sem cinto de segurança")), "FALTA DE CINTO");
        assert_eq!(canonicalize(Some("dirigir usando celular")), "USO DE CELULAR");
        assert_eq!(
            canonicalize(Some("Estacionar em local proibido")),
            "ESTACIONAMENTO IRREGULAR"
        );
        assert_eq!(
            canonicalize(Some("ultrapassagem pela contramão")),
            "ULTRAPASSAGEM INDEVIDA"
        );
        assert_eq!(
            canonicalize(Some("Multa por não identificação do condutor")),
            "NÃO IDENTIFICAÇÃO DO CONDUTOR"
        );
        // Radar outranks headlight when both appear.
        assert_eq!(canonicalize(Some("FAROL / RADAR")), "EXCESSO DE VELOCIDADE");
    }

    #[test]
    fn unmatched_text_passes_through_scrubbed() {
        assert_eq!(
            canonicalize(Some("avançar sinal vermelho ABC1234 em 03/02/2024, auto 998877")),
            "AVANÇAR SINAL VERMELHO EM AUTO"
        );
        assert_eq!(canonicalize(Some("  carga  excedente; BRA2E19 ")), "CARGA EXCEDENTE");
    }

    #[test]
    fn empty_input_is_sentinel() {
        assert_eq!(canonicalize(None), NO_OBSERVATION);
        assert_eq!(canonicalize(Some("   ")), NO_OBSERVATION);
        assert_eq!(canonicalize(Some("10/11 R$ 88,38 - 123456")), NO_OBSERVATION);
    }

    #[test]
    fn deterministic() {
        let raw = "Radar fixo km 45 12/12/2023";
        assert_eq!(canonicalize(Some(raw)), canonicalize(Some(raw)));
    }
}
