use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Keys used in [`CanonicalProduct::raw_supplier_fields`].
pub mod raw_fields {
    /// Supplier B numeric producer id, mapped to a brand name.
    pub const PRODUCER_ID: &str = "producer_id";
    /// Supplier B product group, a controlled tire-type vocabulary.
    pub const GROUP_TITLE: &str = "group_title";
    /// Supplier A warehouse location code of the aggregated rows.
    pub const LOCATION: &str = "location";
}

/// Upstream feed a product came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierCode {
    A,
    B,
}

impl SupplierCode {
    /// Suffix appended to the supplier's native id to form a catalog SKU.
    #[must_use]
    pub fn sku_suffix(self) -> &'static str {
        match self {
            SupplierCode::A => "BK",
            SupplierCode::B => "DH",
        }
    }

    /// Builds the catalog SKU for a native supplier id, e.g. `"12345-BK"`.
    #[must_use]
    pub fn sku_for(self, external_id: &str) -> String {
        format!("{}-{}", external_id.trim(), self.sku_suffix())
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SupplierCode::A => "a",
            SupplierCode::B => "b",
        }
    }
}

impl std::fmt::Display for SupplierCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SupplierCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" | "A" => Ok(SupplierCode::A),
            "b" | "B" => Ok(SupplierCode::B),
            other => Err(format!("unknown supplier code '{other}'")),
        }
    }
}

/// A supplier record normalized into the supplier-agnostic shape consumed by
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProduct {
    /// Supplier-suffixed key, unique across suppliers (e.g. `"12345-BK"`).
    pub sku: String,
    /// The supplier's native identifier.
    pub external_id: String,
    /// Free-text product name exactly as the supplier sends it.
    pub title: String,
    /// Price before the markup deduction. Supplier A prices already include VAT.
    pub raw_price: Decimal,
    pub quantity: u32,
    pub width: String,
    pub aspect_ratio: String,
    pub rim_diameter_inches: u32,
    pub image_url: Option<String>,
    pub gallery_image_url: Option<String>,
    pub energy_label_url: Option<String>,
    pub supplier_code: SupplierCode,
    /// Supplier modification time, or the fetch time when the feed has none.
    pub last_modified: DateTime<Utc>,
    /// Supplier-specific fields needed by attribute extraction.
    pub raw_supplier_fields: BTreeMap<String, String>,
}

impl CanonicalProduct {
    /// Returns `true` when the record describes a mountable tire.
    #[must_use]
    pub fn is_valid_tire(&self) -> bool {
        self.rim_diameter_inches > 0
    }

    #[must_use]
    pub fn raw_field(&self, key: &str) -> Option<&str> {
        self.raw_supplier_fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}
