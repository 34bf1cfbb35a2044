//! Catalog entry types shared by the sync engine and catalog stores.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeKey, AttributeSet};
use crate::products::SupplierCode;

/// Store-assigned catalog entry id.
pub type CatalogId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
}

impl StockStatus {
    #[must_use]
    pub fn from_quantity(quantity: i64) -> Self {
        if quantity > 0 {
            StockStatus::InStock
        } else {
            StockStatus::OutOfStock
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

impl std::str::FromStr for StockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_stock" => Ok(StockStatus::InStock),
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            other => Err(format!("unknown stock status '{other}'")),
        }
    }
}

/// A child variant of a variable catalog entry, selected by one attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogVariant {
    pub sku: String,
    pub price: Decimal,
    pub stock_quantity: i64,
    pub attribute_key: AttributeKey,
    pub attribute_value: String,
}

/// A catalog entry as the sync engine reads and writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub sku: String,
    pub external_id: String,
    pub display_name: String,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: i64,
    pub stock_status: StockStatus,
    pub attributes: AttributeSet,
    pub categories: Vec<String>,
    pub image_ref: Option<String>,
    pub gallery_image_ref: Option<String>,
    pub energy_label_ref: Option<String>,
    pub last_synced_at: DateTime<Utc>,
    pub sync_count: i32,
    pub supplier_code: SupplierCode,
    pub is_variable: bool,
    pub variants: Vec<CatalogVariant>,
}

impl CatalogEntry {
    #[must_use]
    pub fn is_in_stock(&self) -> bool {
        self.stock_status == StockStatus::InStock && self.stock_quantity > 0
    }

    /// Zeroes stock on the entry and all of its variants.
    pub fn mark_out_of_stock(&mut self) {
        self.stock_quantity = 0;
        self.stock_status = StockStatus::OutOfStock;
        for variant in &mut self.variants {
            variant.stock_quantity = 0;
        }
    }
}

/// An entry together with its store id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub id: CatalogId,
    pub entry: CatalogEntry,
}

/// Partial update: only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryUpdate {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<i64>,
    pub stock_status: Option<StockStatus>,
    pub attributes: Option<AttributeSet>,
    pub categories: Option<Vec<String>>,
    pub image_ref: Option<String>,
    pub gallery_image_ref: Option<String>,
    pub energy_label_ref: Option<String>,
    pub is_variable: Option<bool>,
    pub variants: Option<Vec<CatalogVariant>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub sync_count: Option<i32>,
}

impl EntryUpdate {
    /// Names of content fields this update changes. Sync metadata
    /// (`last_synced_at`, `sync_count`) is not listed.
    #[must_use]
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut mark = |set: bool, name: &'static str| {
            if set {
                fields.push(name);
            }
        };
        mark(self.display_name.is_some(), "display_name");
        mark(self.description.is_some(), "description");
        mark(self.price.is_some(), "price");
        mark(self.stock_quantity.is_some(), "stock_quantity");
        mark(self.stock_status.is_some(), "stock_status");
        mark(self.attributes.is_some(), "attributes");
        mark(self.categories.is_some(), "categories");
        mark(self.image_ref.is_some(), "image_ref");
        mark(self.gallery_image_ref.is_some(), "gallery_image_ref");
        mark(self.energy_label_ref.is_some(), "energy_label_ref");
        mark(self.is_variable.is_some(), "is_variable");
        mark(self.variants.is_some(), "variants");
        fields
    }

    /// Applies every `Some` field to `entry`.
    pub fn apply_to(&self, entry: &mut CatalogEntry) {
        if let Some(v) = &self.display_name {
            entry.display_name.clone_from(v);
        }
        if let Some(v) = &self.description {
            entry.description.clone_from(v);
        }
        if let Some(v) = self.price {
            entry.price = v;
        }
        if let Some(v) = self.stock_quantity {
            entry.stock_quantity = v;
        }
        if let Some(v) = self.stock_status {
            entry.stock_status = v;
        }
        if let Some(v) = &self.attributes {
            entry.attributes = v.clone();
        }
        if let Some(v) = &self.categories {
            entry.categories.clone_from(v);
        }
        if let Some(v) = &self.image_ref {
            entry.image_ref = Some(v.clone());
        }
        if let Some(v) = &self.gallery_image_ref {
            entry.gallery_image_ref = Some(v.clone());
        }
        if let Some(v) = &self.energy_label_ref {
            entry.energy_label_ref = Some(v.clone());
        }
        if let Some(v) = self.is_variable {
            entry.is_variable = v;
        }
        if let Some(v) = &self.variants {
            entry.variants.clone_from(v);
        }
        if let Some(v) = self.last_synced_at {
            entry.last_synced_at = v;
        }
        if let Some(v) = self.sync_count {
            entry.sync_count = v;
        }
    }
}
