use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::filters::NormalizedFilters;
use crate::matcher::filter_records;
use crate::model::SchoolRecord;

static FIRST_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

/// Result ordering. Keys that are not recognized are kept so they can be echoed back,
/// and sort as identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    FeesLowToHigh,
    FeesHighToLow,
    NameAsc,
    Newest,
    Unknown(String),
}

impl SortKey {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "fees-low-to-high" => SortKey::FeesLowToHigh,
            "fees-high-to-low" => SortKey::FeesHighToLow,
            "name-asc" => SortKey::NameAsc,
            "newest" => SortKey::Newest,
            other => SortKey::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SortKey::FeesLowToHigh => "fees-low-to-high",
            SortKey::FeesHighToLow => "fees-high-to-low",
            SortKey::NameAsc => "name-asc",
            SortKey::Newest => "newest",
            SortKey::Unknown(raw) => raw,
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Unknown(String::new())
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First run of ASCII digits in the fee text ("₹6-12 Lakhs/year" is 6). No digits, or
/// a run too long for `u64`, counts as 0.
pub fn fee_amount(record: &SchoolRecord) -> u64 {
    let text = record.fee_value().first_text();
    FIRST_INTEGER
        .find(&text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Numeric id for recency ordering; non-numeric or missing ids count as 0.
pub fn id_number(record: &SchoolRecord) -> f64 {
    record
        .id_text()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Name folded for ordering: decomposed, accents dropped, lowercased. "École" and
/// "ecole" share a key.
pub fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Order `records` by `key`. Returns a new vector; the input is untouched and ties keep
/// their input order.
pub fn sort_records<'a>(records: &[&'a SchoolRecord], key: &SortKey) -> Vec<&'a SchoolRecord> {
    let mut sorted = records.to_vec();
    match key {
        SortKey::FeesLowToHigh => sorted.sort_by_key(|r| fee_amount(r)),
        SortKey::FeesHighToLow => sorted.sort_by(|a, b| fee_amount(b).cmp(&fee_amount(a))),
        // Folded name first, then exact spelling so the order is total.
        SortKey::NameAsc => {
            sorted.sort_by_cached_key(|r| {
                let name = r.display_name();
                (collation_key(&name), name)
            });
        }
        SortKey::Newest => sorted.sort_by(|a, b| id_number(b).total_cmp(&id_number(a))),
        SortKey::Unknown(_) => {}
    }
    sorted
}

/// Filter then sort.
pub fn discover<'a>(
    records: &'a [SchoolRecord],
    filters: &NormalizedFilters,
    key: &SortKey,
) -> Vec<&'a SchoolRecord> {
    sort_records(&filter_records(records, filters), key)
}
