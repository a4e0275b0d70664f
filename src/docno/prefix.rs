//! DocNo formatting and parsing

use chrono::{DateTime, Utc};

/// `ModuleCode + YYYYMMDD`
pub fn doc_no_prefix(module_code: &str, date: DateTime<Utc>) -> String {
    format!("{}{}", module_code, date.format("%Y%m%d"))
}

/// `prefix + seq` zero-padded to `width` digits
pub fn format_doc_no(prefix: &str, seq: u64, width: usize) -> String {
    format!("{}{:0width$}", prefix, seq, width = width)
}

/// Sequence suffix of `doc_no` under `prefix`, if it is all digits
pub fn parse_sequence(doc_no: &str, prefix: &str) -> Option<u64> {
    let digits = doc_no.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
