// Utility helpers for parsing and formatting.
//
// This module centralizes all the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Map accented Latin letters to their plain ASCII form.
///
/// Ledger exports spell the same header as `OPERAÇÃO` or `OPERACAO`
/// depending on the run, so every comparison of names goes through here.
pub fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ç' => 'C',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Trimmed, uppercased, accent-folded form used for name comparisons.
pub fn normalize_key(s: &str) -> String {
    fold_accents(s.trim()).to_uppercase()
}

/// Parse a ledger amount such as `R$ 1.234,56`.
///
/// Everything except digits and commas is dropped, the comma becomes the
/// decimal point, and anything that still fails to parse is `0.0`. Amounts
/// never surface an error to the user.
pub fn parse_amount(s: &str) -> f64 {
    let kept: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    kept.parse::<f64>().unwrap_or(0.0)
}

/// Parse a plain number, accepting either `1234.5` or `1234,5`.
///
/// Used for coordinates and for typing table columns, where a value that
/// is not a number must stay distinguishable (`None`) instead of `0.0`.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<f64>() {
        return v.is_finite().then_some(v);
    }
    if s.contains(',') && !s.contains('.') {
        return s.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite());
    }
    None
}

/// Parse a day-first date (`dd/mm/yyyy`, `dd-mm-yy`, `dd.mm.yyyy`) or an
/// ISO `yyyy-mm-dd` date. A trailing time part (`14:30`, `T14:30:00`) is
/// ignored.
///
/// Two-digit years pivot at 69: `00..=68` are 20xx, `69..=99` are 19xx.
pub fn parse_date_dayfirst(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // Drop the time part, if any.
    let date_part = s.split([' ', 'T']).next()?;
    let parts: Vec<&str> = date_part.split(['/', '-', '.']).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    if parts[0].len() == 4 {
        let y: i32 = parts[0].parse().ok()?;
        let m: u32 = parts[1].parse().ok()?;
        let d: u32 = parts[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }

    if parts[0].len() > 2 || parts[1].len() > 2 {
        return None;
    }
    let d: u32 = parts[0].parse().ok()?;
    let m: u32 = parts[1].parse().ok()?;
    let y: i32 = match parts[2].len() {
        2 => {
            let yy: i32 = parts[2].parse().ok()?;
            if yy <= 68 { 2000 + yy } else { 1900 + yy }
        }
        4 => parts[2].parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(y, m, d)
}

pub fn format_date(d: NaiveDate) -> String {
    d.format("%d/%m/%Y").to_string()
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert commas into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Brazilian currency: `R$ 1.234,56`.
///
/// Formats the English way and swaps the two separators.
pub fn format_brl(n: f64) -> String {
    let swapped: String = format_number(n, 2)
        .chars()
        .map(|c| match c {
            ',' => '.',
            '.' => ',',
            other => other,
        })
        .collect();
    format!("R$ {}", swapped)
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
