//! Raw supplier feed record types.
//!
//! ## Supplier A
//! Two endpoints, both returning a top-level JSON array. The stock endpoint
//! lists one row per item *per warehouse location*, so the same `ItemId`
//! appears several times. Numeric fields arrive as numbers on some rows and as
//! strings on others (`"Quantity": "6"`), so everything is captured as text and
//! parsed leniently in [`crate::parse`]. `LastModified` is usually absent.
//!
//! The image endpoint maps `ItemId` to image, gallery image and EPREL energy
//! label URLs. Items without an image row are still synced.
//!
//! ## Supplier B
//! One endpoint with paging and group query variants, each returning a
//! top-level JSON array in snake case. `producer_id` is a small integer mapped
//! to a brand name during attribute extraction; `group_title` is the supplier's
//! own tire-type label. `updated_at` has never been observed populated.

use serde::{Deserialize, Deserializer};

/// Accepts a JSON string, number or `null` and keeps it as text.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

/// Like [`lenient_text`], but blank values become `None`.
fn lenient_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = lenient_text(deserializer)?;
    let trimmed = text.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// One stock row from Supplier A (one item at one warehouse location).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SupplierAStockRow {
    #[serde(deserialize_with = "lenient_text")]
    pub item_id: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub item_name: String,

    /// Price excluding VAT.
    #[serde(default, deserialize_with = "lenient_text")]
    pub price: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub quantity: String,

    /// Warehouse location code; `"01"` is the primary warehouse.
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub width: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub height: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub rim_size: String,

    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub last_modified: Option<String>,
}

/// One row of Supplier A's image database.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SupplierAImageRow {
    #[serde(deserialize_with = "lenient_text")]
    pub item_id: String,

    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub image_url: Option<String>,

    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub gallery_image_url: Option<String>,

    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub eprel_url: Option<String>,
}

/// One product record from Supplier B.
#[derive(Debug, Clone, Deserialize)]
pub struct SupplierBRecord {
    #[serde(deserialize_with = "lenient_text")]
    pub id: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,

    /// Price including VAT.
    #[serde(default, deserialize_with = "lenient_text")]
    pub price: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub stock: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub width: String,

    /// Aspect ratio.
    #[serde(default, deserialize_with = "lenient_text")]
    pub profile: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub rim: String,

    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub producer_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub group_title: Option<String>,

    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub image: Option<String>,

    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub eu_label: Option<String>,

    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub updated_at: Option<String>,
}
