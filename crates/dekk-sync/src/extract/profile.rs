//! Per-supplier extraction behaviour.

use dekk_core::SupplierCode;

/// Brand used when a producer id is missing or unknown.
pub const DEFAULT_BRAND: &str = "Annað";

/// Supplier B producer ids.
const PRODUCER_BRANDS: &[(&str, &str)] = &[
    ("1", "Nokian"),
    ("2", "Michelin"),
    ("3", "Continental"),
    ("4", "Bridgestone"),
    ("5", "Goodyear"),
    ("6", "Hankook"),
    ("7", "Kumho"),
    ("8", "Pirelli"),
    ("9", "Sailun"),
    ("10", "Toyo"),
    ("11", "BFGoodrich"),
    ("12", "Nexen"),
    ("13", "Yokohama"),
];

/// Maps a Supplier B producer id to a brand name.
#[must_use]
pub fn brand_for_producer(producer_id: Option<&str>) -> &'static str {
    producer_id
        .map(str::trim)
        .and_then(|id| PRODUCER_BRANDS.iter().find(|(key, _)| *key == id))
        .map_or(DEFAULT_BRAND, |(_, brand)| brand)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrandStrategy {
    /// First word of the title is the brand; it is removed from the title.
    LeadingToken,
    /// Brand comes from the producer id field; the title is left alone.
    ProducerLookup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TireTypeStrategy {
    /// Icelandic type tokens anywhere in the title.
    TitleTokens,
    /// The supplier's group field, used verbatim.
    GroupField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedRatingFormat {
    /// `loadIndex=91`, `speedRating=W`.
    Separate,
    /// `speedRating=91W`.
    Combined,
}

/// How one supplier's records are read.
pub trait SupplierProfile: Send + Sync {
    fn brand_strategy(&self) -> BrandStrategy;
    fn tire_type_strategy(&self) -> TireTypeStrategy;
    fn speed_rating_format(&self) -> SpeedRatingFormat;
    /// Whether the subtype remainder still starts with the brand name.
    fn drops_leading_subtype_word(&self) -> bool;
}

pub struct SupplierAProfile;

impl SupplierProfile for SupplierAProfile {
    fn brand_strategy(&self) -> BrandStrategy {
        BrandStrategy::LeadingToken
    }

    fn tire_type_strategy(&self) -> TireTypeStrategy {
        TireTypeStrategy::TitleTokens
    }

    fn speed_rating_format(&self) -> SpeedRatingFormat {
        SpeedRatingFormat::Separate
    }

    fn drops_leading_subtype_word(&self) -> bool {
        false
    }
}

pub struct SupplierBProfile;

impl SupplierProfile for SupplierBProfile {
    fn brand_strategy(&self) -> BrandStrategy {
        BrandStrategy::ProducerLookup
    }

    fn tire_type_strategy(&self) -> TireTypeStrategy {
        TireTypeStrategy::GroupField
    }

    fn speed_rating_format(&self) -> SpeedRatingFormat {
        SpeedRatingFormat::Combined
    }

    fn drops_leading_subtype_word(&self) -> bool {
        true
    }
}

#[must_use]
pub fn profile_for(code: SupplierCode) -> &'static dyn SupplierProfile {
    match code {
        SupplierCode::A => &SupplierAProfile,
        SupplierCode::B => &SupplierBProfile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_producer_ids_map_to_brands() {
        assert_eq!(brand_for_producer(Some("1")), "Nokian");
        assert_eq!(brand_for_producer(Some(" 9 ")), "Sailun");
        assert_eq!(brand_for_producer(Some("11")), "BFGoodrich");
    }

    #[test]
    fn unknown_or_missing_producer_is_default_brand() {
        assert_eq!(brand_for_producer(Some("999")), DEFAULT_BRAND);
        assert_eq!(brand_for_producer(None), DEFAULT_BRAND);
    }

    #[test]
    fn profiles_differ_on_every_axis() {
        let a = profile_for(SupplierCode::A);
        let b = profile_for(SupplierCode::B);
        assert_ne!(a.brand_strategy(), b.brand_strategy());
        assert_ne!(a.tire_type_strategy(), b.tire_type_strategy());
        assert_ne!(a.speed_rating_format(), b.speed_rating_format());
        assert_ne!(a.drops_leading_subtype_word(), b.drops_leading_subtype_word());
    }
}
