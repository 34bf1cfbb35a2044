use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;

use super::*;

fn product(code: SupplierCode, title: &str, rim: u32) -> CanonicalProduct {
    CanonicalProduct {
        sku: code.sku_for("1"),
        external_id: "1".to_string(),
        title: title.to_string(),
        raw_price: Decimal::from(20_000),
        quantity: 8,
        width: "225".to_string(),
        aspect_ratio: "45".to_string(),
        rim_diameter_inches: rim,
        image_url: None,
        gallery_image_url: None,
        energy_label_url: None,
        supplier_code: code,
        last_modified: Utc::now(),
        raw_supplier_fields: BTreeMap::new(),
    }
}

fn supplier_b(title: &str, producer_id: &str, group: &str) -> CanonicalProduct {
    let mut p = product(SupplierCode::B, title, 16);
    p.width = "205".to_string();
    p.aspect_ratio = "55".to_string();
    p.raw_supplier_fields
        .insert(raw_fields::PRODUCER_ID.to_string(), producer_id.to_string());
    p.raw_supplier_fields
        .insert(raw_fields::GROUP_TITLE.to_string(), group.to_string());
    p
}

#[test]
fn supplier_a_full_title() {
    let extractor = AttributeExtractor::for_supplier(SupplierCode::A);
    let attrs = extractor.extract(&product(
        SupplierCode::A,
        "Nokian 225/45R17 91W Vetrardekk Neglanleg",
        17,
    ));

    assert_eq!(attrs.first(AttributeKey::Brand), Some("Nokian"));
    assert_eq!(attrs.first(AttributeKey::Width), Some("225"));
    assert_eq!(attrs.first(AttributeKey::Height), Some("45"));
    assert_eq!(attrs.first(AttributeKey::RimSize), Some("R17"));
    assert_eq!(attrs.first(AttributeKey::LoadIndex), Some("91"));
    assert_eq!(attrs.first(AttributeKey::SpeedRating), Some("W"));
    assert!(attrs
        .values(AttributeKey::TireType)
        .iter()
        .any(|v| v == "Vetrardekk"));
    assert_eq!(attrs.first(AttributeKey::StudStatus), Some("Neglanleg"));

    let variation = attrs.variation().expect("studdable tires are variable");
    assert_eq!(variation.key, AttributeKey::HasStuds);
    assert_eq!(variation.values, [HAS_STUDS_YES, HAS_STUDS_NO]);

    // Nothing is left over once the dimension is stripped.
    assert!(!attrs.contains(AttributeKey::Subtype));
}

#[test]
fn supplier_a_subtype_is_what_remains() {
    let extractor = AttributeExtractor::for_supplier(SupplierCode::A);
    let attrs = extractor.extract(&product(
        SupplierCode::A,
        "Nokian Hakkapeliitta R5 205/55R16 94R XL Vetrardekk Óneglanleg",
        16,
    ));

    assert_eq!(attrs.first(AttributeKey::Brand), Some("Nokian"));
    assert_eq!(attrs.first(AttributeKey::StudStatus), Some("Óneglanleg"));
    assert!(!attrs.is_variable());
    assert_eq!(attrs.first(AttributeKey::LoadIndex), Some("94"));
    assert_eq!(attrs.first(AttributeKey::SpeedRating), Some("R"));
    assert_eq!(attrs.first(AttributeKey::Subtype), Some("Hakkapeliitta R5"));
}

#[test]
fn supplier_a_multiple_tire_types() {
    let extractor = AttributeExtractor::for_supplier(SupplierCode::A);
    let attrs = extractor.extract(&product(
        SupplierCode::A,
        "BFGoodrich All-Terrain 265/70R17 121/118S OWL Jeppadekk Heilsársdekk",
        17,
    ));

    assert_eq!(attrs.values(AttributeKey::TireType), ["Jeppadekk", "Heilsársdekk"]);
    assert_eq!(attrs.first(AttributeKey::Pattern), Some("All-Terrain"));
    assert_eq!(attrs.first(AttributeKey::Finish), Some("OWL"));
    assert_eq!(attrs.first(AttributeKey::TireSubtype), Some("Cargo"));
    assert_eq!(attrs.first(AttributeKey::LoadIndex), Some("121/118"));
    assert_eq!(attrs.first(AttributeKey::Subtype), Some("All-Terrain"));
}

#[test]
fn supplier_a_title_starting_with_dimension_has_no_brand() {
    let extractor = AttributeExtractor::for_supplier(SupplierCode::A);
    let attrs = extractor.extract(&product(SupplierCode::A, "225/45R17 91W Sumardekk", 17));
    assert!(!attrs.contains(AttributeKey::Brand));
    assert_eq!(attrs.first(AttributeKey::TireType), Some("Sumardekk"));
}

#[test]
fn supplier_b_uses_producer_and_group() {
    let extractor = AttributeExtractor::for_supplier(SupplierCode::B);
    let attrs = extractor.extract(&supplier_b(
        "Sailun Ice Blazer 205/55R16 91T negld",
        "9",
        "Vetrardekk",
    ));

    assert_eq!(attrs.first(AttributeKey::Brand), Some("Sailun"));
    assert_eq!(attrs.first(AttributeKey::TireType), Some("Vetrardekk"));
    assert_eq!(attrs.first(AttributeKey::StudStatus), Some("Negld"));
    assert_eq!(attrs.first(AttributeKey::SpeedRating), Some("91T"));
    assert!(!attrs.contains(AttributeKey::LoadIndex));
    assert_eq!(attrs.first(AttributeKey::Subtype), Some("Ice Blazer"));
}

#[test]
fn supplier_b_unknown_producer_defaults_brand() {
    let extractor = AttributeExtractor::for_supplier(SupplierCode::B);
    let attrs = extractor.extract(&supplier_b("Linglong Green-Max 205/55R16 91V", "77", "Sumardekk"));
    assert_eq!(attrs.first(AttributeKey::Brand), Some(profile::DEFAULT_BRAND));
    assert_eq!(attrs.first(AttributeKey::Subtype), Some("Green-Max"));
}

#[test]
fn supplier_b_promo_marker_is_cut() {
    let extractor = AttributeExtractor::for_supplier(SupplierCode::B);
    let attrs = extractor.extract(&supplier_b(
        "Toyo Observe GSi6 TILBOÐ 205/55R16",
        "10",
        "Vetrardekk",
    ));
    assert_eq!(attrs.first(AttributeKey::Subtype), Some("Observe GSi6"));
}

#[test]
fn cargo_is_detected_before_anything_is_cut() {
    let extractor = AttributeExtractor::for_supplier(SupplierCode::A);
    let attrs = extractor.extract(&product(
        SupplierCode::A,
        "Nokian cLine 195/70R15C 104/102S Sendibíladekk",
        15,
    ));
    assert_eq!(attrs.first(AttributeKey::TireSubtype), Some("Cargo"));
    assert_eq!(attrs.first(AttributeKey::TireType), Some("Sendibíladekk"));
    assert_eq!(attrs.first(AttributeKey::Subtype), Some("cLine"));
}

#[test]
fn unrecognised_title_only_yields_dimensions() {
    let extractor = AttributeExtractor::for_supplier(SupplierCode::B);
    let mut p = product(SupplierCode::B, "", 0);
    p.width = String::new();
    p.aspect_ratio = String::new();
    let attrs = extractor.extract(&p);

    assert_eq!(attrs.first(AttributeKey::Brand), Some(profile::DEFAULT_BRAND));
    assert!(!attrs.contains(AttributeKey::RimSize));
    assert!(!attrs.contains(AttributeKey::Width));
    assert!(!attrs.contains(AttributeKey::Subtype));
}

#[test]
fn extraction_is_deterministic() {
    let extractor = AttributeExtractor::for_supplier(SupplierCode::A);
    let p = product(SupplierCode::A, "Nokian 225/45R17 91W Vetrardekk Neglanleg", 17);
    assert_eq!(extractor.extract(&p), extractor.extract(&p));
}
