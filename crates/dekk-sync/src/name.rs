//! Display names, descriptions and categories derived from attributes.

use dekk_core::{AttributeKey, AttributeSet};

use crate::extract::patterns::StudStatus;

const SEGMENT_SEPARATOR: &str = " - ";

/// Builds the standardized display name, e.g.
/// `225/45 R17 - Nokian Hakkapeliitta R5 - Neglanleg - Vetrardekk`.
///
/// Pure and deterministic; the update path compares its output with the
/// stored name to decide whether the name changed.
#[must_use]
pub fn build_name(attrs: &AttributeSet) -> String {
    let mut segments: Vec<String> = Vec::with_capacity(4);

    let size = dimension_segment(attrs);
    if !size.is_empty() {
        segments.push(size);
    }

    let brand_line = [
        attrs.first(AttributeKey::Brand),
        attrs.first(AttributeKey::Subtype),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");
    if !brand_line.is_empty() {
        segments.push(brand_line);
    }

    if let Some(status) = attrs
        .first(AttributeKey::StudStatus)
        .and_then(StudStatus::from_value)
    {
        segments.push(status.label().to_string());
    }

    if let Some(tire_type) = attrs.first(AttributeKey::TireType) {
        segments.push(tire_type.to_string());
    }

    segments.join(SEGMENT_SEPARATOR)
}

/// `width/height R{rim}`, leaving out whatever is missing.
fn dimension_segment(attrs: &AttributeSet) -> String {
    let ratio = match (
        attrs.first(AttributeKey::Width),
        attrs.first(AttributeKey::Height),
    ) {
        (Some(w), Some(h)) => format!("{w}/{h}"),
        (Some(w), None) => w.to_string(),
        (None, Some(h)) => h.to_string(),
        (None, None) => String::new(),
    };

    match attrs.first(AttributeKey::RimSize) {
        Some(rim) if ratio.is_empty() => rim.to_string(),
        Some(rim) => format!("{ratio} {rim}"),
        None => ratio,
    }
}

/// Customer-facing description: one `Label: values` line per visible,
/// non-variation attribute.
#[must_use]
pub fn build_description(attrs: &AttributeSet) -> String {
    attrs
        .iter()
        .filter(|a| a.visible && !a.variation)
        .map(|a| format!("{}: {}", a.key.label(), a.values.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Catalog category slugs: every tire type, the rim size and the brand.
#[must_use]
pub fn build_categories(attrs: &AttributeSet) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    let candidates = attrs
        .values(AttributeKey::TireType)
        .iter()
        .map(String::as_str)
        .chain(attrs.first(AttributeKey::RimSize))
        .chain(attrs.first(AttributeKey::Brand));

    for value in candidates {
        let slug = slugify(value);
        if !slug.is_empty() && !categories.contains(&slug) {
            categories.push(slug);
        }
    }
    categories
}

fn slugify(value: &str) -> String {
    value
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_set() -> AttributeSet {
        let mut attrs = AttributeSet::new();
        attrs.insert(AttributeKey::Width, "225");
        attrs.insert(AttributeKey::Height, "45");
        attrs.insert(AttributeKey::RimSize, "R17");
        attrs.insert(AttributeKey::Brand, "Nokian");
        attrs.insert(AttributeKey::StudStatus, "Neglanleg");
        attrs.insert_variation(AttributeKey::HasStuds, &["yes", "no"]);
        attrs.insert(AttributeKey::TireType, "Vetrardekk");
        attrs.insert(AttributeKey::TireType, "Jeppadekk");
        attrs.insert(AttributeKey::LoadIndex, "91");
        attrs.insert(AttributeKey::SpeedRating, "W");
        attrs.insert(AttributeKey::Subtype, "Hakkapeliitta R5");
        attrs
    }

    #[test]
    fn name_has_all_segments_in_order() {
        assert_eq!(
            build_name(&full_set()),
            "225/45 R17 - Nokian Hakkapeliitta R5 - Neglanleg - Vetrardekk"
        );
    }

    #[test]
    fn name_is_deterministic() {
        let attrs = full_set();
        let first = build_name(&attrs);
        for _ in 0..10 {
            assert_eq!(build_name(&attrs), first);
        }
    }

    #[test]
    fn stud_values_are_translated() {
        let mut attrs = AttributeSet::new();
        attrs.insert(AttributeKey::StudStatus, "Negld");
        assert_eq!(build_name(&attrs), "Nagladekk");

        let mut attrs = AttributeSet::new();
        attrs.insert(AttributeKey::StudStatus, "Óneglanleg");
        assert_eq!(build_name(&attrs), "Ekki neglanleg");
    }

    #[test]
    fn missing_segments_are_omitted() {
        let mut attrs = AttributeSet::new();
        attrs.insert(AttributeKey::Width, "205");
        attrs.insert(AttributeKey::RimSize, "R16");
        attrs.insert(AttributeKey::Subtype, "Ice Blazer");
        assert_eq!(build_name(&attrs), "205 R16 - Ice Blazer");

        assert_eq!(build_name(&AttributeSet::new()), "");
    }

    #[test]
    fn description_skips_variation_attributes() {
        let description = build_description(&full_set());
        assert!(description.contains("Framleiðandi: Nokian"));
        assert!(description.contains("Tegund: Vetrardekk, Jeppadekk"));
        assert!(!description.contains("Naglar"));
        assert_eq!(description.lines().count(), 9);
    }

    #[test]
    fn categories_are_slugged_and_unique() {
        let mut attrs = full_set();
        attrs.insert(AttributeKey::TireType, "Heilsársdekk");
        assert_eq!(
            build_categories(&attrs),
            vec!["vetrardekk", "jeppadekk", "heilsársdekk", "r17", "nokian"]
        );
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Annað merki / Other"), "annað-merki-other");
        assert_eq!(slugify("  "), "");
    }
}
