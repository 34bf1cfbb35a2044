//! Offline unit tests for dekk-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use dekk_core::{AppConfig, AttributeKey, AttributeSet, Environment, StockStatus, SupplierCode};
use dekk_db::{assemble_entries, CatalogEntryRow, CatalogVariantRow, DbError, PoolConfig, SyncRunRow};
use rust_decimal::Decimal;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        supplier_a_stock_url: None,
        supplier_a_images_url: None,
        supplier_b_url: None,
        feed_request_timeout_secs: 30,
        feed_user_agent: "ua".to_string(),
        price_markup_isk: Decimal::from(400),
        sync_batch_size: 50,
        sync_batch_pause_ms: 100,
        sync_handle_obsolete: true,
        obsolete_batch_size: 20,
        obsolete_grace_days: None,
        obsolete_skip_silent_suppliers: false,
        sync_lock_timeout_secs: 3600,
        notify_email: None,
        sync_schedule: "0 0 */6 * * *".to_string(),
        record_patches_path: PathBuf::from("./config/record_patches.yaml"),
    }
}

fn entry_row() -> CatalogEntryRow {
    let mut attributes = AttributeSet::new();
    attributes.insert(AttributeKey::Brand, "Nokian");
    attributes.insert_variation(AttributeKey::HasStuds, &["yes", "no"]);

    CatalogEntryRow {
        id: 11,
        sku: "10-BK".to_string(),
        external_id: "10".to_string(),
        supplier_code: "a".to_string(),
        display_name: "225/45 R17 - Nokian".to_string(),
        description: "Framleiðandi: Nokian".to_string(),
        price: Decimal::from(24_600),
        stock_quantity: 6,
        stock_status: "in_stock".to_string(),
        attributes: serde_json::to_value(&attributes).unwrap(),
        categories: serde_json::json!(["vetrardekk", "r17"]),
        image_ref: Some("https://img.example/10.jpg".to_string()),
        gallery_image_ref: None,
        energy_label_ref: None,
        is_variable: true,
        last_synced_at: Utc::now(),
        sync_count: 2,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn variant_row(position: i32, value: &str, price: i64) -> CatalogVariantRow {
    CatalogVariantRow {
        id: i64::from(position) + 100,
        entry_id: 11,
        position,
        sku: format!("10-BK-{value}"),
        price: Decimal::from(price),
        stock_quantity: 6,
        attribute_key: "hasStuds".to_string(),
        attribute_value: value.to_string(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn entry_row_converts_with_variants() {
    let stored = entry_row()
        .into_stored(vec![variant_row(0, "yes", 27_600), variant_row(1, "no", 24_600)])
        .expect("valid row");

    assert_eq!(stored.id, 11);
    let entry = stored.entry;
    assert_eq!(entry.supplier_code, SupplierCode::A);
    assert_eq!(entry.stock_status, StockStatus::InStock);
    assert_eq!(entry.attributes.first(AttributeKey::Brand), Some("Nokian"));
    assert!(entry.attributes.is_variable());
    assert_eq!(entry.categories, ["vetrardekk", "r17"]);
    assert_eq!(entry.variants.len(), 2);
    assert_eq!(entry.variants[0].attribute_key, AttributeKey::HasStuds);
    assert_eq!(entry.variants[0].price, Decimal::from(27_600));
}

#[test]
fn unknown_supplier_code_is_rejected() {
    let mut row = entry_row();
    row.supplier_code = "z".to_string();
    let err = row.into_stored(Vec::new()).unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidColumn {
            column: "catalog_entries.supplier_code",
            ..
        }
    ));
}

#[test]
fn unknown_stock_status_is_rejected() {
    let mut row = entry_row();
    row.stock_status = "backorder".to_string();
    assert!(row.into_stored(Vec::new()).is_err());
}

#[test]
fn malformed_attributes_are_rejected() {
    let mut row = entry_row();
    row.attributes = serde_json::json!({"brand": "Nokian"});
    assert!(matches!(row.into_stored(Vec::new()), Err(DbError::Json(_))));
}

#[test]
fn unknown_variant_key_is_rejected() {
    let mut variant = variant_row(0, "yes", 1);
    variant.attribute_key = "colour".to_string();
    assert!(variant.into_variant().is_err());
}

/// Compile-time smoke test: confirm that [`SyncRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn sync_run_row_has_expected_fields() {
    let row = SyncRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        status: "completed".to_string(),
        dry_run: false,
        batch_size: 50_i32,
        started_at: Utc::now(),
        finished_at: None,
        fetched: 10,
        processed: 10,
        created: 2,
        updated: 3,
        skipped: 5,
        errors: 0,
        obsolete_found: 1,
        obsolete_deactivated: 1,
        created_items: serde_json::json!([]),
        created_at: Utc::now(),
    };

    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["status"], "completed");
    assert_eq!(json["obsolete_deactivated"], 1);
}

#[test]
fn undecodable_entry_is_skipped_without_hiding_the_rest() {
    let mut broken = entry_row();
    broken.id = 12;
    broken.sku = "12-BK".to_string();
    broken.stock_status = "backorder".to_string();
    let mut last = entry_row();
    last.id = 13;
    last.sku = "13-BK".to_string();
    last.is_variable = false;

    let mut broken_variant = variant_row(0, "yes", 1);
    broken_variant.entry_id = 12;

    let entries = assemble_entries(
        vec![entry_row(), broken, last],
        vec![
            variant_row(0, "yes", 27_600),
            variant_row(1, "no", 24_600),
            broken_variant,
        ],
    );

    let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, [11, 13]);
    assert_eq!(entries[0].entry.variants.len(), 2);
    assert!(entries[1].entry.variants.is_empty());
}
