/// Filter state: which facet options are selected, and how that maps to and from a
/// shareable query string.
///
/// `FilterState` never fails. Unknown keys, stray commas and undecodable escapes all
/// degrade to the best canonical guess, because the result always has to render.
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::canonical::canonicalize;
use crate::taxonomy::{slugify, Taxonomy};

/// Query keys that configure the result view rather than select facet options.
pub const RESERVED_QUERY_KEYS: &[&str] = &["sort", "limit"];

/// Category name to selected options. Options keep the order they were selected in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectedFilters(BTreeMap<String, Vec<String>>);

impl SelectedFilters {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        self.0.clone()
    }
}

/// Selected options keyed by wire key; the form the matcher consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedFilters(BTreeMap<String, Vec<String>>);

impl NormalizedFilters {
    /// Allowed options for a wire key. Empty means no constraint.
    pub fn allowed(&self, wire_key: &str) -> &[String] {
        self.0.get(wire_key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        self.0.clone()
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<String>)> for NormalizedFilters {
    fn from_iter<I: IntoIterator<Item = (K, Vec<String>)>>(iter: I) -> Self {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, options) in iter {
            let entry = map.entry(key.into()).or_default();
            for option in options {
                if !entry.contains(&option) {
                    entry.push(option);
                }
            }
        }
        Self(map)
    }
}

/// Split a raw query string into ordered `(key, value)` pairs.
///
/// A leading `?` is ignored. Keys are decoded; values are left encoded because they are
/// decoded per comma-separated piece, so an escaped comma stays inside its piece. A pair
/// without `=` gets an empty value.
pub fn parse_query_string(raw: &str) -> Vec<(String, String)> {
    raw.trim()
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key).trim().to_string(), value.to_string())
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Percent-decode one query component, reading `+` as a space. Invalid UTF-8 after
/// decoding leaves the input as it was.
pub fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).map(Cow::into_owned);
    decoded.unwrap_or(spaced)
}

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_QUERY_KEYS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(key))
}

/// Last value given for a reserved key, decoded.
pub fn reserved_value(params: &[(String, String)], key: &str) -> Option<String> {
    params
        .iter()
        .rev()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| decode_component(v).trim().to_string())
}

pub struct FilterState {
    taxonomy: Arc<Taxonomy>,
    selected: SelectedFilters,
    last_query: Option<String>,
}

impl FilterState {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self {
            taxonomy,
            selected: SelectedFilters::default(),
            last_query: None,
        }
    }

    pub fn selected(&self) -> &SelectedFilters {
        &self.selected
    }

    /// Replace the selection with the one described by `params` (wire key to
    /// comma-joined values). Running it twice with the same input gives the same
    /// selection.
    pub fn initialize_from_query<I, K, V>(&mut self, params: I) -> &SelectedFilters
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut selected: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in params {
            let key = key.as_ref().trim();
            let category = self
                .taxonomy
                .name_for_wire_key(key)
                .map(str::to_string)
                .unwrap_or_else(|| key.to_string());

            let mut options: Vec<String> = Vec::new();
            for piece in value.as_ref().split(',') {
                let decoded = decode_component(piece);
                let decoded = decoded.trim();
                if decoded.is_empty() {
                    continue;
                }
                let option = canonicalize(&self.taxonomy, &category, decoded);
                if !options.contains(&option) {
                    options.push(option);
                }
            }

            // Mapping semantics: a repeated key replaces what came before it.
            if options.is_empty() {
                selected.remove(&category);
            } else {
                selected.insert(category, options);
            }
        }
        self.selected = SelectedFilters(selected);
        &self.selected
    }

    /// Re-read the selection from a raw query string, unless it is the query string
    /// read last time. Reserved keys (`sort`, `limit`) are not facets and are skipped.
    /// Returns whether the selection was rebuilt.
    pub fn sync_with_query(&mut self, raw_query: &str) -> bool {
        if self.last_query.as_deref() == Some(raw_query) {
            return false;
        }
        let params = parse_query_string(raw_query)
            .into_iter()
            .filter(|(key, _)| !is_reserved_key(key));
        self.initialize_from_query(params);
        self.last_query = Some(raw_query.to_string());
        true
    }

    /// Remove `option` from `category` if selected, otherwise append it. No taxonomy
    /// check is made.
    pub fn toggle_option(&mut self, category: &str, option: &str) -> &SelectedFilters {
        let options = self.selected.0.entry(category.to_string()).or_default();
        match options.iter().position(|o| o == option) {
            Some(idx) => {
                options.remove(idx);
            }
            None => options.push(option.to_string()),
        }
        if options.is_empty() {
            self.selected.0.remove(category);
        }
        &self.selected
    }

    /// Drop every selection. The remembered query string is kept, so the same URL does
    /// not re-apply itself.
    pub fn clear_all(&mut self) {
        self.selected = SelectedFilters::default();
    }

    pub fn to_wire_keyed(&self) -> NormalizedFilters {
        self.selected
            .iter()
            .map(|(name, options)| {
                let wire_key = self
                    .taxonomy
                    .wire_key_for_name(name)
                    .map(str::to_string)
                    .unwrap_or_else(|| slugify(name));
                (wire_key, options.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> FilterState {
        FilterState::new(Arc::new(Taxonomy::standard()))
    }

    fn selected(s: &FilterState, category: &str) -> Vec<String> {
        s.selected().to_map().remove(category).unwrap_or_default()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn parse_query_string_pairs() {
        assert_eq!(
            parse_query_string("?type=montessori,cbse&city=new+delhi&flag&=x&&sort=name-asc"),
            vec![
                ("type".to_string(), "montessori,cbse".to_string()),
                ("city".to_string(), "new+delhi".to_string()),
                ("flag".to_string(), "".to_string()),
                ("sort".to_string(), "name-asc".to_string()),
            ]
        );
        assert!(parse_query_string("").is_empty());
    }

    #[test]
    fn decode_component_handles_plus_and_bad_escapes() {
        assert_eq!(decode_component("new+delhi"), "new delhi");
        assert_eq!(decode_component("IB%20World"), "IB World");
        assert_eq!(decode_component("%E2%82%B96-12"), "₹6-12");
        assert_eq!(decode_component("%FF"), "%FF");
    }

    #[test]
    fn initialize_canonicalizes_against_taxonomy() {
        let mut s = state();
        s.initialize_from_query([("type", "montessori,cbse"), ("city", "mumbai")]);
        assert_eq!(selected(&s, "Type"), strings(&["Montessori", "CBSE"]));
        assert_eq!(selected(&s, "City"), strings(&["Mumbai"]));
    }

    #[test]
    fn initialize_decodes_each_piece() {
        let mut s = state();
        s.initialize_from_query([("curriculum", "ib%20world,state%2Cboard")]);
        assert_eq!(
            selected(&s, "Curriculum"),
            strings(&["IB World", "State,board"])
        );
    }

    #[test]
    fn unknown_key_becomes_category_name() {
        let mut s = state();
        s.initialize_from_query([("board", "IGCSE,state board")]);
        assert_eq!(selected(&s, "board"), strings(&["IGCSE", "State Board"]));
        assert_eq!(
            s.to_wire_keyed().allowed("board"),
            strings(&["IGCSE", "State Board"])
        );
    }

    #[test]
    fn initialize_replaces_rather_than_merges() {
        let mut s = state();
        s.initialize_from_query([("type", "cbse")]);
        s.toggle_option("City", "Pune");
        s.initialize_from_query([("curriculum", "icse")]);
        assert_eq!(selected(&s, "Type"), &[] as &[String]);
        assert_eq!(selected(&s, "City"), &[] as &[String]);
        assert_eq!(selected(&s, "Curriculum"), strings(&["ICSE"]));
    }

    #[test]
    fn malformed_values_degrade() {
        let mut s = state();
        s.initialize_from_query([("type", ",,cbse,,CBSE, "), ("city", ""), ("fee", ",")]);
        assert_eq!(selected(&s, "Type"), strings(&["CBSE"]));
        assert!(!s.selected().iter().any(|(name, _)| name == "City" || name == "Fee Range"));
    }

    #[test]
    fn initialize_is_idempotent() {
        let params = [("type", "montessori,cbse"), ("city", "mumbai,pune")];
        let mut s = state();
        let first = s.initialize_from_query(params).clone();
        let second = s.initialize_from_query(params).clone();
        assert_eq!(first, second);
    }

    #[test]
    fn sync_only_reruns_on_new_query() {
        let mut s = state();
        assert!(s.sync_with_query("type=cbse&sort=newest"));
        assert_eq!(selected(&s, "Type"), strings(&["CBSE"]));
        assert_eq!(selected(&s, "sort"), &[] as &[String]);

        s.toggle_option("Type", "ICSE");
        assert!(!s.sync_with_query("type=cbse&sort=newest"));
        assert_eq!(selected(&s, "Type"), strings(&["CBSE", "ICSE"]));

        assert!(s.sync_with_query("type=icse"));
        assert_eq!(selected(&s, "Type"), strings(&["ICSE"]));
    }

    #[test]
    fn toggle_adds_and_removes_in_order() {
        let mut s = state();
        s.toggle_option("City", "Pune");
        s.toggle_option("City", "Mumbai");
        s.toggle_option("City", "Delhi");
        assert_eq!(selected(&s, "City"), strings(&["Pune", "Mumbai", "Delhi"]));

        s.toggle_option("City", "Mumbai");
        assert_eq!(selected(&s, "City"), strings(&["Pune", "Delhi"]));
        assert!(selected(&s, "City").contains(&"Delhi".to_string()));

        s.toggle_option("City", "Pune");
        s.toggle_option("City", "Delhi");
        assert!(s.selected().is_empty());
    }

    #[test]
    fn toggle_accepts_values_outside_taxonomy() {
        let mut s = state();
        s.toggle_option("Curriculum", "Waldorf");
        assert_eq!(selected(&s, "Curriculum"), strings(&["Waldorf"]));
    }

    #[test]
    fn clear_all_empties_selection() {
        let mut s = state();
        s.sync_with_query("type=cbse");
        s.clear_all();
        assert!(s.selected().is_empty());
        assert!(s.to_wire_keyed().is_empty());
        assert!(!s.sync_with_query("type=cbse"));
    }

    #[test]
    fn wire_keyed_uses_table_then_slug() {
        let mut s = state();
        s.toggle_option("Fee Range", "₹1-3 Lakhs");
        s.toggle_option("Curriculum", "CBSE");
        s.toggle_option("Board Type", "State");
        let wire = s.to_wire_keyed();
        assert_eq!(wire.allowed("fee"), strings(&["₹1-3 Lakhs"]));
        assert_eq!(wire.allowed("curriculum"), strings(&["CBSE"]));
        assert_eq!(wire.allowed("board-type"), strings(&["State"]));
        assert_eq!(wire.allowed("city"), &[] as &[String]);
    }

    #[test]
    fn end_to_end_query_to_wire_filters() {
        let mut s = state();
        s.sync_with_query("type=montessori,cbse&city=mumbai");

        let expected_selected: BTreeMap<String, Vec<String>> = [
            ("Type".to_string(), strings(&["Montessori", "CBSE"])),
            ("City".to_string(), strings(&["Mumbai"])),
        ]
        .into_iter()
        .collect();
        assert_eq!(s.selected().to_map(), expected_selected);

        let expected_wire: BTreeMap<String, Vec<String>> = [
            ("type".to_string(), strings(&["Montessori", "CBSE"])),
            ("city".to_string(), strings(&["Mumbai"])),
        ]
        .into_iter()
        .collect();
        assert_eq!(s.to_wire_keyed().to_map(), expected_wire);
    }
}
