//! Single-value format checks used by the schema.

use chrono::NaiveDate;

/// `YYYY-MM-DD`, zero padded, naming a real calendar day.
pub fn is_valid_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    // chrono's %Y also takes signs and wider years, so pin the shape first
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());

    digits_ok && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Trim, then require a finite decimal number. Empty input is not a number.
pub fn is_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok_and(f64::is_finite)
}
