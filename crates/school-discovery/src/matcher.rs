/// Record matching: AND across categories, OR across the options of one category.
///
/// Matching is deliberately loose. Upstream data says "CBSE", "CBSE Board" and
/// "cbse-affiliated" for the same thing, so an option matches a field value when either
/// contains the other, ignoring case. The flip side is that short options can hit
/// unrelated words ("ib" inside "library").
use crate::filters::NormalizedFilters;
use crate::model::{FieldValue, SchoolRecord};
use crate::taxonomy::{CITY, CURRICULUM, FEE, STATE, TYPE};

/// Whether `value` satisfies a category whose selected options are `allowed`.
///
/// No selection never excludes anything. With a selection, a record that has nothing
/// usable in the field does not match.
pub fn matches_category(value: &FieldValue, allowed: &[String]) -> bool {
    let needles: Vec<String> = allowed
        .iter()
        .map(|option| option.trim().to_lowercase())
        .filter(|option| !option.is_empty())
        .collect();
    if needles.is_empty() {
        return true;
    }

    let haystack: Vec<String> = value
        .normalize()
        .into_iter()
        .map(|v| v.to_lowercase())
        .collect();
    if haystack.is_empty() {
        return false;
    }

    needles.iter().any(|needle| {
        haystack
            .iter()
            .any(|v| v == needle || v.contains(needle.as_str()) || needle.contains(v.as_str()))
    })
}

/// Every category must match. Evaluation stops at the first one that does not.
pub fn matches(record: &SchoolRecord, filters: &NormalizedFilters) -> bool {
    matches_category(&record.curriculum, filters.allowed(CURRICULUM))
        && matches_category(&record.school_type, filters.allowed(TYPE))
        && matches_category(record.fee_value(), filters.allowed(FEE))
        && matches_category(record.city_value(), filters.allowed(CITY))
        && matches_category(record.state_value(), filters.allowed(STATE))
}

pub fn filter_records<'a>(
    records: &'a [SchoolRecord],
    filters: &NormalizedFilters,
) -> Vec<&'a SchoolRecord> {
    records
        .iter()
        .filter(|record| matches(record, filters))
        .collect()
}
