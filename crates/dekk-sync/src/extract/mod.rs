//! Attribute extraction from supplier titles.
//!
//! The title is consumed step by step: each step may emit attributes and
//! cut the working title at the position of what it recognized, so later
//! steps only see what earlier steps left behind. The order is fixed:
//!
//! 1. dimensions from structured fields
//! 2. cargo marker (needs the untouched title, so nothing is cut before it)
//! 3. terrain pattern
//! 4. OWL lettering
//! 5. brand
//! 6. stud status (cut)
//! 7. tire type (cut)
//! 8. load index / speed rating (cut)
//! 9. promo marker (cut)
//! 10. remainder becomes the subtype

pub mod patterns;
pub mod profile;

use dekk_core::{raw_fields, AttributeKey, AttributeSet, CanonicalProduct, SupplierCode};

use self::patterns::StudStatus;
use self::profile::{
    brand_for_producer, profile_for, BrandStrategy, SpeedRatingFormat, SupplierProfile,
    TireTypeStrategy,
};

/// Values of the `hasStuds` variation attribute.
pub const HAS_STUDS_YES: &str = "yes";
pub const HAS_STUDS_NO: &str = "no";

/// Title being consumed by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WorkingTitle(String);

impl WorkingTitle {
    fn as_str(&self) -> &str {
        &self.0
    }

    /// Drops everything from `offset` onward.
    fn cut_at(&mut self, offset: usize) {
        self.0.truncate(offset);
    }

    /// Removes the first word and returns it.
    fn take_first_word(&mut self) -> Option<String> {
        let trimmed = self.0.trim_start();
        let word_end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        if word_end == 0 {
            return None;
        }
        let word = trimmed[..word_end].to_string();
        self.0 = trimmed[word_end..].to_string();
        Some(word)
    }

    fn first_word(&self) -> Option<&str> {
        self.0.split_whitespace().next()
    }
}

/// Extracts an [`AttributeSet`] from one supplier's products.
pub struct AttributeExtractor {
    profile: &'static dyn SupplierProfile,
}

impl AttributeExtractor {
    #[must_use]
    pub fn for_supplier(code: SupplierCode) -> Self {
        Self {
            profile: profile_for(code),
        }
    }

    /// Runs the pipeline. Never fails; steps that do not match add nothing.
    #[must_use]
    pub fn extract(&self, product: &CanonicalProduct) -> AttributeSet {
        let mut attrs = AttributeSet::new();
        let mut title = WorkingTitle(product.title.clone());

        Self::dimensions(product, &mut attrs);
        Self::cargo(&title, &mut attrs);
        Self::terrain(&title, &mut attrs);
        Self::finish(&title, &mut attrs);
        self.brand(product, &mut title, &mut attrs);
        Self::studs(&mut title, &mut attrs);
        self.tire_type(product, &mut title, &mut attrs);
        self.load_speed(&mut title, &mut attrs);
        Self::promo(&mut title);
        self.subtype(&title, &mut attrs);

        attrs
    }

    fn dimensions(product: &CanonicalProduct, attrs: &mut AttributeSet) {
        attrs.insert(AttributeKey::Width, product.width.as_str());
        attrs.insert(AttributeKey::Height, product.aspect_ratio.as_str());
        if product.rim_diameter_inches > 0 {
            attrs.insert(
                AttributeKey::RimSize,
                format!("R{}", product.rim_diameter_inches),
            );
        }
    }

    fn cargo(title: &WorkingTitle, attrs: &mut AttributeSet) {
        if patterns::is_cargo(title.as_str()) {
            attrs.insert(AttributeKey::TireSubtype, patterns::TIRE_SUBTYPE_CARGO);
        }
    }

    fn terrain(title: &WorkingTitle, attrs: &mut AttributeSet) {
        if let Some(pattern) = patterns::terrain_pattern(title.as_str()) {
            attrs.insert(AttributeKey::Pattern, pattern);
        }
    }

    fn finish(title: &WorkingTitle, attrs: &mut AttributeSet) {
        if patterns::has_owl(title.as_str()) {
            attrs.insert(AttributeKey::Finish, patterns::FINISH_OWL);
        }
    }

    fn brand(&self, product: &CanonicalProduct, title: &mut WorkingTitle, attrs: &mut AttributeSet) {
        match self.profile.brand_strategy() {
            BrandStrategy::ProducerLookup => {
                attrs.insert(
                    AttributeKey::Brand,
                    brand_for_producer(product.raw_field(raw_fields::PRODUCER_ID)),
                );
            }
            BrandStrategy::LeadingToken => {
                // A title that opens with the dimension has no brand token.
                let leads_with_digit = title
                    .first_word()
                    .is_some_and(|w| w.starts_with(|c: char| c.is_ascii_digit()));
                if leads_with_digit {
                    return;
                }
                if let Some(brand) = title.take_first_word() {
                    attrs.insert(AttributeKey::Brand, brand);
                }
            }
        }
    }

    fn studs(title: &mut WorkingTitle, attrs: &mut AttributeSet) {
        let Some((status, offset)) = patterns::find_stud(title.as_str()) else {
            return;
        };
        title.cut_at(offset);
        attrs.insert(AttributeKey::StudStatus, status.value());
        if status == StudStatus::Studdable {
            attrs.insert_variation(AttributeKey::HasStuds, &[HAS_STUDS_YES, HAS_STUDS_NO]);
        }
    }

    fn tire_type(
        &self,
        product: &CanonicalProduct,
        title: &mut WorkingTitle,
        attrs: &mut AttributeSet,
    ) {
        match self.profile.tire_type_strategy() {
            TireTypeStrategy::GroupField => {
                if let Some(group) = product.raw_field(raw_fields::GROUP_TITLE) {
                    attrs.insert(AttributeKey::TireType, group);
                }
            }
            TireTypeStrategy::TitleTokens => {
                if let Some((types, offset)) = patterns::find_tire_types(title.as_str()) {
                    title.cut_at(offset);
                    for tire_type in types {
                        attrs.insert(AttributeKey::TireType, tire_type);
                    }
                }
            }
        }
    }

    fn load_speed(&self, title: &mut WorkingTitle, attrs: &mut AttributeSet) {
        let Some(found) = patterns::find_load_speed(title.as_str()) else {
            return;
        };
        title.cut_at(found.offset);
        match self.profile.speed_rating_format() {
            SpeedRatingFormat::Separate => {
                attrs.insert(AttributeKey::LoadIndex, found.load_index);
                attrs.insert(AttributeKey::SpeedRating, found.speed_rating);
            }
            SpeedRatingFormat::Combined => {
                attrs.insert(
                    AttributeKey::SpeedRating,
                    format!("{}{}", found.load_index, found.speed_rating),
                );
            }
        }
    }

    fn promo(title: &mut WorkingTitle) {
        if let Some(offset) = patterns::find_promo(title.as_str()) {
            title.cut_at(offset);
        }
    }

    fn subtype(&self, title: &WorkingTitle, attrs: &mut AttributeSet) {
        let mut remainder = WorkingTitle(patterns::clean_remainder(title.as_str()));
        if self.profile.drops_leading_subtype_word() {
            remainder.take_first_word();
        }
        attrs.insert(AttributeKey::Subtype, remainder.as_str().trim());
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
