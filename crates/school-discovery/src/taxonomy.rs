/// Facet taxonomy: the categories a school search can be narrowed by.
///
/// Each category has a display name ("Fee Range") and a wire key ("fee") used in URLs
/// and as the record field it matches. Both lookup directions are built together in
/// `Taxonomy::new`, so they cannot disagree. A `Taxonomy` is immutable once built;
/// loading the dynamic City/State options produces a new value.
use std::collections::HashMap;

pub const CURRICULUM: &str = "curriculum";
pub const TYPE: &str = "type";
pub const FEE: &str = "fee";
pub const CITY: &str = "city";
pub const STATE: &str = "state";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetCategory {
    pub name: String,
    pub wire_key: String,
    /// Canonical options in display order. For dynamic categories `None` means
    /// "not loaded yet" and `Some(vec![])` means "loaded, nothing available".
    pub options: Option<Vec<String>>,
    /// Options come from an external lookup rather than this file.
    pub dynamic: bool,
}

impl FacetCategory {
    pub fn fixed(name: &str, wire_key: &str, options: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            wire_key: wire_key.to_string(),
            options: Some(options.iter().map(|o| o.to_string()).collect()),
            dynamic: false,
        }
    }

    pub fn dynamic(name: &str, wire_key: &str) -> Self {
        Self {
            name: name.to_string(),
            wire_key: wire_key.to_string(),
            options: None,
            dynamic: true,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.options.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: Vec<FacetCategory>,
    by_name: HashMap<String, usize>,
    by_wire_key: HashMap<String, usize>,
}

impl Taxonomy {
    /// Build the lookup tables. When two categories share a name or a wire key, the
    /// earlier one owns it.
    pub fn new(categories: Vec<FacetCategory>) -> Self {
        let mut by_name = HashMap::new();
        let mut by_wire_key = HashMap::new();
        for (idx, category) in categories.iter().enumerate() {
            by_name.entry(category.name.clone()).or_insert(idx);
            by_wire_key
                .entry(category.wire_key.to_lowercase())
                .or_insert(idx);
        }
        Self {
            categories,
            by_name,
            by_wire_key,
        }
    }

    /// The school discovery facets. City and State start unloaded.
    pub fn standard() -> Self {
        Self::new(vec![
            FacetCategory::fixed(
                "Curriculum",
                CURRICULUM,
                &["Montessori", "CBSE", "ICSE", "IB World", "Cambridge", "International"],
            ),
            FacetCategory::fixed(
                "Type",
                TYPE,
                &[
                    "Montessori",
                    "CBSE",
                    "ICSE",
                    "IB",
                    "Play School",
                    "Pre School",
                    "Day Care",
                    "Kindergarten",
                ],
            ),
            FacetCategory::fixed(
                "Fee Range",
                FEE,
                &[
                    "Under ₹1 Lakh",
                    "₹1-3 Lakhs",
                    "₹3-6 Lakhs",
                    "₹6-12 Lakhs",
                    "₹12-20 Lakhs",
                    "₹20+ Lakhs",
                ],
            ),
            FacetCategory::dynamic("City", CITY),
            FacetCategory::dynamic("State", STATE),
        ])
    }

    /// Set the option list of a dynamic category. Fixed categories and unknown wire
    /// keys are left alone.
    pub fn with_dynamic_options(mut self, wire_key: &str, options: Option<Vec<String>>) -> Self {
        if let Some(&idx) = self.by_wire_key.get(&wire_key.to_lowercase()) {
            let category = &mut self.categories[idx];
            if category.dynamic {
                category.options = options;
            }
        }
        self
    }

    pub fn categories(&self) -> &[FacetCategory] {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&FacetCategory> {
        self.by_name.get(name).map(|&idx| &self.categories[idx])
    }

    pub fn by_wire_key(&self, wire_key: &str) -> Option<&FacetCategory> {
        self.by_wire_key
            .get(&wire_key.to_lowercase())
            .map(|&idx| &self.categories[idx])
    }

    pub fn name_for_wire_key(&self, wire_key: &str) -> Option<&str> {
        self.by_wire_key(wire_key).map(|c| c.name.as_str())
    }

    pub fn wire_key_for_name(&self, name: &str) -> Option<&str> {
        self.category(name).map(|c| c.wire_key.as_str())
    }

    /// Canonical options for a category name, if the category is known and loaded.
    pub fn options(&self, name: &str) -> Option<&[String]> {
        self.category(name)?.options.as_deref()
    }
}

/// Wire key for a category with no table entry: lowercase, whitespace runs to hyphens.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_wire_key_round_trip() {
        let taxonomy = Taxonomy::standard();
        for category in taxonomy.categories() {
            assert_eq!(
                taxonomy.name_for_wire_key(&category.wire_key),
                Some(category.name.as_str())
            );
            assert_eq!(
                taxonomy.wire_key_for_name(&category.name),
                Some(category.wire_key.as_str())
            );
        }
        assert_eq!(taxonomy.name_for_wire_key("FEE"), Some("Fee Range"));
        assert_eq!(taxonomy.name_for_wire_key("rating"), None);
        assert_eq!(taxonomy.wire_key_for_name("fee range"), None);
    }

    #[test]
    fn dynamic_categories_start_unloaded() {
        let taxonomy = Taxonomy::standard();
        assert_eq!(taxonomy.options("City"), None);
        assert!(!taxonomy.category("State").unwrap().is_loaded());
        assert_eq!(taxonomy.options("Curriculum").unwrap().len(), 6);
    }

    #[test]
    fn loading_dynamic_options() {
        let taxonomy = Taxonomy::standard()
            .with_dynamic_options(CITY, Some(vec!["Mumbai".to_string(), "Pune".to_string()]))
            .with_dynamic_options(STATE, Some(vec![]))
            .with_dynamic_options(CURRICULUM, Some(vec!["Other".to_string()]));

        assert_eq!(
            taxonomy.options("City"),
            Some(&["Mumbai".to_string(), "Pune".to_string()][..])
        );
        // Loaded but empty is distinct from not loaded.
        assert_eq!(taxonomy.options("State"), Some(&[][..]));
        assert!(taxonomy.category("State").unwrap().is_loaded());
        // Fixed categories are not overwritten.
        assert_eq!(taxonomy.options("Curriculum").unwrap()[0], "Montessori");
    }

    #[test]
    fn duplicate_keys_keep_first_category() {
        let taxonomy = Taxonomy::new(vec![
            FacetCategory::fixed("Board", "board", &["CBSE"]),
            FacetCategory::fixed("Board Alt", "board", &["ICSE"]),
        ]);
        assert_eq!(taxonomy.name_for_wire_key("board"), Some("Board"));
        assert_eq!(taxonomy.wire_key_for_name("Board Alt"), Some("board"));
    }

    #[test]
    fn slugify_names() {
        assert_eq!(slugify("Fee Range"), "fee-range");
        assert_eq!(slugify("  Board   Affiliation "), "board-affiliation");
        assert_eq!(slugify("Rating"), "rating");
    }
}
