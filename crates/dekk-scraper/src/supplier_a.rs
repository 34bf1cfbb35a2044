//! Supplier A adapter: per-location stock rows joined with an image database.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dekk_core::{raw_fields, CanonicalProduct, SupplierCode};
use rust_decimal::Decimal;
use tokio::sync::OnceCell;

use crate::client::FeedClient;
use crate::parse::{
    has_tire_dimension, normalize_dimension, parse_decimal, parse_quantity, parse_rim,
    parse_timestamp,
};
use crate::types::{SupplierAImageRow, SupplierAStockRow};

/// Only rows from this warehouse location are synced.
pub const PRIMARY_LOCATION: &str = "01";

/// Supplier A prices exclude VAT; 24% is added at aggregation time.
pub const TAX_MULTIPLIER: Decimal = Decimal::from_parts(124, 0, 0, false, 2);

/// Items with less aggregated stock than this are not listed.
pub const MIN_QUANTITY: u32 = 4;

/// Smallest rim diameter (inches) the shop sells.
pub const MIN_RIM_INCHES: u32 = 13;

type ImageIndex = HashMap<String, SupplierAImageRow>;

pub struct SupplierAFeed {
    client: Arc<FeedClient>,
    stock_url: String,
    images_url: Option<String>,
    images: OnceCell<ImageIndex>,
}

impl SupplierAFeed {
    #[must_use]
    pub fn new(client: Arc<FeedClient>, stock_url: String, images_url: Option<String>) -> Self {
        Self {
            client,
            stock_url,
            images_url,
            images: OnceCell::new(),
        }
    }

    /// Fetches and normalizes the stock feed.
    ///
    /// Never fails: an unreachable or malformed stock endpoint yields an empty
    /// list, and a failed image fetch yields products without images.
    pub async fn fetch(&self) -> Vec<CanonicalProduct> {
        let fetched_at = Utc::now();

        let rows = match self
            .client
            .get_json::<Vec<SupplierAStockRow>>(&self.stock_url)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(
                    supplier = "a",
                    url = %self.stock_url,
                    error = %e,
                    "stock feed fetch failed; no products from this supplier"
                );
                return Vec::new();
            }
        };

        let images = self.image_index().await;
        let products = aggregate_stock(rows, images, fetched_at);
        tracing::info!(supplier = "a", count = products.len(), "supplier feed normalized");
        products
    }

    /// Returns the image database, fetching it on first use. A failed fetch
    /// is not cached, so the next run tries again.
    async fn image_index(&self) -> Option<&ImageIndex> {
        let url = self.images_url.as_deref()?;
        let result = self
            .images
            .get_or_try_init(|| async {
                let rows = self.client.get_json::<Vec<SupplierAImageRow>>(url).await?;
                let index: ImageIndex = rows
                    .into_iter()
                    .map(|row| (row.item_id.trim().to_string(), row))
                    .collect();
                tracing::debug!(supplier = "a", count = index.len(), "image database cached");
                Ok::<_, crate::ScraperError>(index)
            })
            .await;

        match result {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!(
                    supplier = "a",
                    url,
                    error = %e,
                    "image database fetch failed; continuing without images"
                );
                None
            }
        }
    }
}

/// Aggregates per-location stock rows into canonical products.
///
/// Non-primary locations are discarded, quantities of repeated item ids are
/// summed, VAT is added to the price, and items that are low on stock, too
/// small, or not recognisably tires are filtered out. An item whose price
/// overflows once VAT is added is dropped with a warning.
#[must_use]
pub fn aggregate_stock(
    rows: Vec<SupplierAStockRow>,
    images: Option<&ImageIndex>,
    fetched_at: DateTime<Utc>,
) -> Vec<CanonicalProduct> {
    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, CanonicalProduct> = HashMap::new();
    let mut rejected: HashSet<String> = HashSet::new();

    for row in rows {
        if row.location.trim() != PRIMARY_LOCATION {
            continue;
        }
        let id = row.item_id.trim().to_string();
        if id.is_empty() || rejected.contains(&id) {
            continue;
        }

        let quantity = parse_quantity(&row.quantity);
        if let Some(existing) = by_id.get_mut(&id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
            continue;
        }

        let Some(raw_price) = parse_decimal(&row.price).checked_mul(TAX_MULTIPLIER) else {
            tracing::warn!(
                supplier = "a",
                item_id = %id,
                price = %row.price,
                "price out of range; dropping item"
            );
            rejected.insert(id);
            continue;
        };

        let image = images.and_then(|index| index.get(&id));
        let last_modified = row
            .last_modified
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(fetched_at);

        let mut raw_supplier_fields = BTreeMap::new();
        raw_supplier_fields.insert(raw_fields::LOCATION.to_string(), PRIMARY_LOCATION.to_string());

        let product = CanonicalProduct {
            sku: SupplierCode::A.sku_for(&id),
            external_id: id.clone(),
            title: row.item_name,
            raw_price: raw_price.round_dp(0),
            quantity,
            width: normalize_dimension(&row.width),
            aspect_ratio: normalize_dimension(&row.height),
            rim_diameter_inches: parse_rim(&row.rim_size),
            image_url: image.and_then(|i| i.image_url.clone()),
            gallery_image_url: image.and_then(|i| i.gallery_image_url.clone()),
            energy_label_url: image.and_then(|i| i.eprel_url.clone()),
            supplier_code: SupplierCode::A,
            last_modified,
            raw_supplier_fields,
        };

        order.push(id.clone());
        by_id.insert(id, product);
    }

    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .filter(|p| {
            let keep = p.quantity >= MIN_QUANTITY
                && p.rim_diameter_inches >= MIN_RIM_INCHES
                && has_tire_dimension(&p.title);
            if !keep {
                tracing::trace!(sku = %p.sku, "filtered out by stock, rim or title checks");
            }
            keep
        })
        .collect()
}
