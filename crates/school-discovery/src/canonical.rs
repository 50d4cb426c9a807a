/// Canonicalization of externally supplied facet values.
///
/// A value that matches one of its category's options case-insensitively takes the
/// option's spelling. Anything else is passed through title-cased, except values that
/// are already all-uppercase, which are kept verbatim so "IB" does not become "Ib".
use crate::taxonomy::Taxonomy;

pub fn canonicalize(taxonomy: &Taxonomy, category: &str, raw: &str) -> String {
    let value = raw.trim();
    if let Some(options) = taxonomy.options(category) {
        let wanted = value.to_lowercase();
        if let Some(option) = options.iter().find(|o| o.to_lowercase() == wanted) {
            return option.clone();
        }
    }
    title_case_unless_acronym(value)
}

pub fn title_case_unless_acronym(value: &str) -> String {
    if value == value.to_uppercase() {
        return value.to_string();
    }
    value
        .split(' ')
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::CITY;

    fn taxonomy() -> Taxonomy {
        Taxonomy::standard()
    }

    #[test]
    fn taxonomy_hit_uses_canonical_spelling() {
        let t = taxonomy();
        assert_eq!(canonicalize(&t, "Curriculum", "ib world"), "IB World");
        assert_eq!(canonicalize(&t, "Curriculum", "cbse"), "CBSE");
        assert_eq!(canonicalize(&t, "Type", "MONTESSORI"), "Montessori");
        assert_eq!(canonicalize(&t, "Fee Range", "₹6-12 lakhs"), "₹6-12 Lakhs");
    }

    #[test]
    fn miss_is_title_cased() {
        let t = taxonomy();
        assert_eq!(canonicalize(&t, "Curriculum", "state board"), "State Board");
        assert_eq!(canonicalize(&t, "City", "new delhi"), "New Delhi");
        assert_eq!(canonicalize(&t, "Unknown", "hELLO wORLD"), "Hello World");
    }

    #[test]
    fn acronyms_are_preserved() {
        let t = taxonomy();
        assert_eq!(canonicalize(&t, "Type", "IGCSE"), "IGCSE");
        assert_eq!(canonicalize(&t, "Unknown", "IB"), "IB");
        assert_eq!(canonicalize(&t, "Curriculum", "IB"), "IB");
    }

    #[test]
    fn loaded_dynamic_options_are_used() {
        let t = taxonomy().with_dynamic_options(CITY, Some(vec!["Navi Mumbai".to_string()]));
        assert_eq!(canonicalize(&t, "City", "navi mumbai"), "Navi Mumbai");
        assert_eq!(canonicalize(&t, "City", "thane"), "Thane");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let t = taxonomy();
        let inputs = [
            ("Curriculum", "ib world"),
            ("Curriculum", "state board"),
            ("Type", "IB"),
            ("City", "mumbai"),
            ("City", "  pimpri  chinchwad "),
            ("Fee Range", "₹20+ lakhs"),
            ("Unknown", "x"),
            ("Unknown", ""),
        ];
        for (category, raw) in inputs {
            let once = canonicalize(&t, category, raw);
            let twice = canonicalize(&t, category, &once);
            assert_eq!(once, twice, "not a fixed point for {category}={raw:?}");
        }
    }
}
