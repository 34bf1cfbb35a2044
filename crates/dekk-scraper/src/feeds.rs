use std::collections::HashSet;
use std::sync::Arc;

use dekk_core::{AppConfig, CanonicalProduct, ProductFeed, RecordPatches};

use crate::client::FeedClient;
use crate::error::ScraperError;
use crate::supplier_a::SupplierAFeed;
use crate::supplier_b::SupplierBFeed;

/// Both supplier adapters behind one [`ProductFeed`].
///
/// An adapter whose endpoint is not configured is simply absent.
pub struct SupplierFeeds {
    supplier_a: Option<SupplierAFeed>,
    supplier_b: Option<SupplierBFeed>,
}

impl SupplierFeeds {
    #[must_use]
    pub fn new(supplier_a: Option<SupplierAFeed>, supplier_b: Option<SupplierBFeed>) -> Self {
        Self {
            supplier_a,
            supplier_b,
        }
    }

    /// Builds the adapters from configuration, sharing one HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig, patches: RecordPatches) -> Result<Self, ScraperError> {
        let client = Arc::new(FeedClient::new(
            config.feed_request_timeout_secs,
            &config.feed_user_agent,
        )?);

        let supplier_a = config.supplier_a_stock_url.clone().map(|stock_url| {
            SupplierAFeed::new(
                Arc::clone(&client),
                stock_url,
                config.supplier_a_images_url.clone(),
            )
        });
        let supplier_b = config
            .supplier_b_url
            .clone()
            .map(|url| SupplierBFeed::new(Arc::clone(&client), url, patches));

        if supplier_a.is_none() && supplier_b.is_none() {
            tracing::warn!("no supplier feed URLs configured; sync runs will fetch nothing");
        }

        Ok(Self::new(supplier_a, supplier_b))
    }
}

impl ProductFeed for SupplierFeeds {
    async fn fetch_all(&self) -> Vec<CanonicalProduct> {
        let fetch_a = async {
            match &self.supplier_a {
                Some(feed) => feed.fetch().await,
                None => Vec::new(),
            }
        };
        let fetch_b = async {
            match &self.supplier_b {
                Some(feed) => feed.fetch().await,
                None => Vec::new(),
            }
        };
        let (from_a, from_b) = tokio::join!(fetch_a, fetch_b);

        combine(from_a, from_b)
    }
}

/// Concatenates adapter output, keeping the first product per SKU.
fn combine(from_a: Vec<CanonicalProduct>, from_b: Vec<CanonicalProduct>) -> Vec<CanonicalProduct> {
    let mut seen = HashSet::new();
    let mut combined = Vec::with_capacity(from_a.len() + from_b.len());
    for product in from_a.into_iter().chain(from_b) {
        if seen.insert(product.sku.clone()) {
            combined.push(product);
        } else {
            tracing::warn!(sku = %product.sku, "duplicate sku in combined feed; keeping first");
        }
    }
    combined
}
