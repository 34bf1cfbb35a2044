//! Supplier B adapter: one endpoint queried in four variants.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dekk_core::{raw_fields, CanonicalProduct, RecordPatches, SupplierCode};

use crate::client::{with_query, FeedClient};
use crate::error::ScraperError;
use crate::parse::{normalize_dimension, parse_decimal, parse_quantity, parse_rim, parse_timestamp};
use crate::types::SupplierBRecord;

pub struct SupplierBFeed {
    client: Arc<FeedClient>,
    base_url: String,
    patches: RecordPatches,
}

/// The base listing only returns the first page; later pages and the 4x4
/// group have to be requested separately.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidFeedUrl`] if `base_url` is not absolute.
pub fn endpoint_urls(base_url: &str) -> Result<Vec<String>, ScraperError> {
    Ok(vec![
        base_url.to_string(),
        with_query(base_url, "page", "2")?,
        with_query(base_url, "page", "3")?,
        with_query(base_url, "group", "jeppadekk")?,
    ])
}

impl SupplierBFeed {
    #[must_use]
    pub fn new(client: Arc<FeedClient>, base_url: String, patches: RecordPatches) -> Self {
        Self {
            client,
            base_url,
            patches,
        }
    }

    /// Fetches all endpoint variants concurrently and normalizes the
    /// concatenated records. Failed variants contribute nothing.
    pub async fn fetch(&self) -> Vec<CanonicalProduct> {
        let fetched_at = Utc::now();

        let urls = match endpoint_urls(&self.base_url) {
            Ok(urls) => urls,
            Err(e) => {
                tracing::error!(supplier = "b", error = %e, "cannot build feed URLs");
                return Vec::new();
            }
        };

        let responses = futures::future::join_all(
            urls.iter()
                .map(|url| self.client.get_json::<Vec<SupplierBRecord>>(url)),
        )
        .await;

        let mut records = Vec::new();
        for (url, response) in urls.iter().zip(responses) {
            match response {
                Ok(batch) => {
                    tracing::debug!(supplier = "b", url = %url, count = batch.len(), "feed variant fetched");
                    records.extend(batch);
                }
                Err(e) => {
                    tracing::error!(
                        supplier = "b",
                        url = %url,
                        error = %e,
                        "feed variant fetch failed; skipping"
                    );
                }
            }
        }

        let products = normalize_records(records, &self.patches, fetched_at);
        tracing::info!(supplier = "b", count = products.len(), "supplier feed normalized");
        products
    }
}

/// Normalizes concatenated Supplier B records.
///
/// The paging variants overlap, so the first occurrence of an id wins. Known
/// malformed records are corrected through `patches` before anything else
/// reads them. Records without a rim diameter are not tires and are dropped.
#[must_use]
pub fn normalize_records(
    records: Vec<SupplierBRecord>,
    patches: &RecordPatches,
    fetched_at: DateTime<Utc>,
) -> Vec<CanonicalProduct> {
    let mut seen = HashSet::new();
    let mut products = Vec::with_capacity(records.len());

    for mut record in records {
        let id = record.id.trim().to_string();
        if id.is_empty() || !seen.insert(id.clone()) {
            continue;
        }

        if let Some(patch) = patches.get(&id) {
            tracing::debug!(supplier = "b", external_id = %id, "applying record patch");
            record.name = patch.patch_title(&record.name);
            if let Some(dims) = &patch.dimension_override {
                if let Some(width) = &dims.width {
                    record.width.clone_from(width);
                }
                if let Some(aspect_ratio) = &dims.aspect_ratio {
                    record.profile.clone_from(aspect_ratio);
                }
                if let Some(rim) = dims.rim_diameter_inches {
                    record.rim = rim.to_string();
                }
            }
        }

        let product = normalize_record(record, id, fetched_at);
        if product.is_valid_tire() {
            products.push(product);
        } else {
            tracing::trace!(sku = %product.sku, "dropped record without rim diameter");
        }
    }

    products
}

fn normalize_record(record: SupplierBRecord, id: String, fetched_at: DateTime<Utc>) -> CanonicalProduct {
    let mut raw_supplier_fields = BTreeMap::new();
    if let Some(producer_id) = record.producer_id {
        raw_supplier_fields.insert(raw_fields::PRODUCER_ID.to_string(), producer_id);
    }
    if let Some(group_title) = record.group_title {
        raw_supplier_fields.insert(raw_fields::GROUP_TITLE.to_string(), group_title);
    }

    CanonicalProduct {
        sku: SupplierCode::B.sku_for(&id),
        external_id: id,
        title: record.name,
        raw_price: parse_decimal(&record.price),
        quantity: parse_quantity(&record.stock),
        width: normalize_dimension(&record.width),
        aspect_ratio: normalize_dimension(&record.profile),
        rim_diameter_inches: parse_rim(&record.rim),
        image_url: record.image,
        gallery_image_url: None,
        energy_label_url: record.eu_label,
        supplier_code: SupplierCode::B,
        last_modified: record
            .updated_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(fetched_at),
        raw_supplier_fields,
    }
}

#[cfg(test)]
mod tests {
    use dekk_core::{DimensionOverride, RecordPatch, TitleCorrection};
    use rust_decimal::Decimal;

    use super::*;

    fn record(id: &str, name: &str) -> SupplierBRecord {
        SupplierBRecord {
            id: id.to_string(),
            name: name.to_string(),
            price: "18990".to_string(),
            stock: "12".to_string(),
            width: "205".to_string(),
            profile: "55".to_string(),
            rim: "16".to_string(),
            producer_id: Some("9".to_string()),
            group_title: Some("Vetrardekk".to_string()),
            image: None,
            eu_label: None,
            updated_at: None,
        }
    }

    #[test]
    fn endpoint_urls_cover_all_variants() {
        let urls = endpoint_urls("https://b.example.is/api/tires").unwrap();
        assert_eq!(
            urls,
            vec![
                "https://b.example.is/api/tires",
                "https://b.example.is/api/tires?page=2",
                "https://b.example.is/api/tires?page=3",
                "https://b.example.is/api/tires?group=jeppadekk",
            ]
        );
    }

    #[test]
    fn first_occurrence_wins() {
        let mut dup = record("1", "Second copy 205/55R16");
        dup.stock = "99".to_string();
        let products = normalize_records(
            vec![record("1", "Sailun Ice Blazer 205/55R16 91T"), dup],
            &RecordPatches::empty(),
            Utc::now(),
        );
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].quantity, 12);
        assert_eq!(products[0].sku, "1-DH");
    }

    #[test]
    fn raw_fields_are_carried() {
        let products = normalize_records(
            vec![record("1", "Sailun Ice Blazer 205/55R16 91T")],
            &RecordPatches::empty(),
            Utc::now(),
        );
        let product = &products[0];
        assert_eq!(product.raw_field(raw_fields::PRODUCER_ID), Some("9"));
        assert_eq!(product.raw_field(raw_fields::GROUP_TITLE), Some("Vetrardekk"));
        assert_eq!(product.raw_price, Decimal::from(18_990));
    }

    #[test]
    fn patch_table_corrects_title_and_dimensions() {
        let patches = RecordPatches::from_patches(vec![RecordPatch {
            external_id: "10442".to_string(),
            title_correction: Some(TitleCorrection {
                find: "LT265/7517".to_string(),
                replace: "LT265/75R17".to_string(),
            }),
            dimension_override: Some(DimensionOverride {
                width: Some("265".to_string()),
                aspect_ratio: Some("75".to_string()),
                rim_diameter_inches: Some(17),
            }),
            notes: None,
        }])
        .unwrap();

        let mut broken = record("10442", "Nokian Outpost LT265/7517 121/118S");
        broken.rim = String::new();

        let products = normalize_records(vec![broken], &patches, Utc::now());
        assert_eq!(products.len(), 1);
        let product = &products[0];
        assert_eq!(product.title, "Nokian Outpost LT265/75R17 121/118S");
        assert_eq!(product.width, "265");
        assert_eq!(product.aspect_ratio, "75");
        assert_eq!(product.rim_diameter_inches, 17);
    }

    #[test]
    fn records_without_rim_are_dropped() {
        let mut no_rim = record("5", "Gift card");
        no_rim.rim = String::new();
        let products = normalize_records(vec![no_rim], &RecordPatches::empty(), Utc::now());
        assert!(products.is_empty());
    }

    #[test]
    fn missing_timestamp_falls_back_to_fetch_time() {
        let now = Utc::now();
        let products = normalize_records(
            vec![record("1", "Sailun 205/55R16")],
            &RecordPatches::empty(),
            now,
        );
        assert_eq!(products[0].last_modified, now);
    }
}
