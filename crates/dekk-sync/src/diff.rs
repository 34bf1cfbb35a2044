//! Field-by-field comparison of a stored entry with a freshly built one.

use dekk_core::{CatalogEntry, EntryUpdate};

/// Builds an update holding only the fields of `fresh` that differ from
/// `stored`.
///
/// Image references are only replaced when the feed supplies one; a record
/// that lost its image keeps the one already in the catalog. Sync metadata
/// is left for the caller.
#[must_use]
pub fn diff_entry(stored: &CatalogEntry, fresh: &CatalogEntry) -> EntryUpdate {
    EntryUpdate {
        display_name: changed(&stored.display_name, &fresh.display_name),
        description: changed(&stored.description, &fresh.description),
        price: changed(&stored.price, &fresh.price),
        stock_quantity: changed(&stored.stock_quantity, &fresh.stock_quantity),
        stock_status: changed(&stored.stock_status, &fresh.stock_status),
        attributes: changed(&stored.attributes, &fresh.attributes),
        categories: changed(&stored.categories, &fresh.categories),
        image_ref: replaced_ref(stored.image_ref.as_ref(), fresh.image_ref.as_ref()),
        gallery_image_ref: replaced_ref(
            stored.gallery_image_ref.as_ref(),
            fresh.gallery_image_ref.as_ref(),
        ),
        energy_label_ref: replaced_ref(
            stored.energy_label_ref.as_ref(),
            fresh.energy_label_ref.as_ref(),
        ),
        is_variable: changed(&stored.is_variable, &fresh.is_variable),
        variants: changed(&stored.variants, &fresh.variants),
        last_synced_at: None,
        sync_count: None,
    }
}

fn changed<T: PartialEq + Clone>(stored: &T, fresh: &T) -> Option<T> {
    (stored != fresh).then(|| fresh.clone())
}

fn replaced_ref(stored: Option<&String>, fresh: Option<&String>) -> Option<String> {
    match fresh {
        Some(url) if stored != Some(url) => Some(url.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use dekk_core::{AttributeSet, StockStatus, SupplierCode};
    use rust_decimal::Decimal;

    use super::*;

    fn entry() -> CatalogEntry {
        CatalogEntry {
            sku: "1-BK".to_string(),
            external_id: "1".to_string(),
            display_name: "225/45 R17 - Nokian".to_string(),
            description: "Framleiðandi: Nokian".to_string(),
            price: Decimal::from(24_000),
            stock_quantity: 4,
            stock_status: StockStatus::InStock,
            attributes: AttributeSet::new(),
            categories: vec!["nokian".to_string()],
            image_ref: Some("https://img.example/1.jpg".to_string()),
            gallery_image_ref: None,
            energy_label_ref: None,
            last_synced_at: Utc::now(),
            sync_count: 3,
            supplier_code: SupplierCode::A,
            is_variable: false,
            variants: Vec::new(),
        }
    }

    #[test]
    fn identical_entries_change_nothing() {
        let update = diff_entry(&entry(), &entry());
        assert!(update.changed_fields().is_empty());
    }

    #[test]
    fn only_changed_fields_are_set() {
        let stored = entry();
        let mut fresh = entry();
        fresh.price = Decimal::from(22_000);
        fresh.stock_quantity = 0;
        fresh.stock_status = StockStatus::OutOfStock;

        let update = diff_entry(&stored, &fresh);
        assert_eq!(
            update.changed_fields(),
            ["price", "stock_quantity", "stock_status"]
        );
        assert_eq!(update.price, Some(Decimal::from(22_000)));
        assert!(update.display_name.is_none());
    }

    #[test]
    fn missing_fresh_image_keeps_stored_one() {
        let stored = entry();
        let mut fresh = entry();
        fresh.image_ref = None;
        assert!(diff_entry(&stored, &fresh).image_ref.is_none());
    }

    #[test]
    fn new_image_replaces_stored_one() {
        let stored = entry();
        let mut fresh = entry();
        fresh.image_ref = Some("https://img.example/1b.jpg".to_string());
        fresh.energy_label_ref = Some("https://eprel.example/1".to_string());

        let update = diff_entry(&stored, &fresh);
        assert_eq!(update.image_ref.as_deref(), Some("https://img.example/1b.jpg"));
        assert_eq!(
            update.energy_label_ref.as_deref(),
            Some("https://eprel.example/1")
        );
    }

    #[test]
    fn sync_metadata_is_left_to_caller() {
        let stored = entry();
        let mut fresh = entry();
        fresh.sync_count = 1;
        fresh.last_synced_at = Utc::now();
        let update = diff_entry(&stored, &fresh);
        assert!(update.sync_count.is_none());
        assert!(update.last_synced_at.is_none());
    }
}
