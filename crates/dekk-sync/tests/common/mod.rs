#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use dekk_core::{
    CanonicalProduct, NotificationError, NotificationPort, ProductFeed, SupplierCode,
};
use dekk_sync::{
    LogNotifier, MemoryCatalog, SyncCoordinator, SyncEngine, SyncSettings,
};

/// Serves a fixed product list, replaceable between runs.
#[derive(Default)]
pub struct StaticFeed {
    products: Mutex<Vec<CanonicalProduct>>,
    /// Stamp `last_modified` with the fetch time, like a feed without
    /// modification timestamps.
    stamp_fetch_time: bool,
}

impl StaticFeed {
    pub fn new(products: Vec<CanonicalProduct>) -> Self {
        Self {
            products: Mutex::new(products),
            stamp_fetch_time: false,
        }
    }

    pub fn stamping_fetch_time(products: Vec<CanonicalProduct>) -> Self {
        Self {
            products: Mutex::new(products),
            stamp_fetch_time: true,
        }
    }

    pub fn replace(&self, products: Vec<CanonicalProduct>) {
        *self.products.lock().unwrap() = products;
    }
}

impl ProductFeed for StaticFeed {
    async fn fetch_all(&self) -> Vec<CanonicalProduct> {
        let mut products = self.products.lock().unwrap().clone();
        if self.stamp_fetch_time {
            let now = Utc::now();
            for p in &mut products {
                p.last_modified = now;
            }
        }
        products
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReport {
    pub recipient: String,
    pub subject: String,
    pub lines: Vec<String>,
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<SentReport>>,
}

impl RecordingNotifier {
    pub fn reports(&self) -> Vec<SentReport> {
        self.sent.lock().unwrap().clone()
    }
}

impl NotificationPort for RecordingNotifier {
    async fn send_report(
        &self,
        recipient: &str,
        subject: &str,
        body_lines: &[String],
    ) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(SentReport {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            lines: body_lines.to_vec(),
        });
        Ok(())
    }
}

pub type TestEngine<N = LogNotifier> = SyncEngine<MemoryCatalog, StaticFeed, N>;

pub fn fast_settings() -> SyncSettings {
    SyncSettings {
        batch_pause: Duration::ZERO,
        ..SyncSettings::default()
    }
}

pub fn engine_with<N: NotificationPort>(
    catalog: &Arc<MemoryCatalog>,
    feed: &Arc<StaticFeed>,
    notifier: Arc<N>,
    settings: SyncSettings,
) -> SyncEngine<MemoryCatalog, StaticFeed, N> {
    SyncEngine::new(
        Arc::clone(catalog),
        Arc::clone(feed),
        notifier,
        Arc::new(SyncCoordinator::default()),
        settings,
    )
}

pub fn engine(catalog: &Arc<MemoryCatalog>, feed: &Arc<StaticFeed>) -> TestEngine {
    engine_with(catalog, feed, Arc::new(LogNotifier), fast_settings())
}

/// A Supplier A winter tire modified at `last_modified`.
pub fn tire_a(id: &str, last_modified: DateTime<Utc>) -> CanonicalProduct {
    CanonicalProduct {
        sku: SupplierCode::A.sku_for(id),
        external_id: id.to_string(),
        title: "Nokian 225/45R17 91W Vetrardekk Neglanleg".to_string(),
        raw_price: Decimal::from(25_000),
        quantity: 10,
        width: "225".to_string(),
        aspect_ratio: "45".to_string(),
        rim_diameter_inches: 17,
        image_url: None,
        gallery_image_url: None,
        energy_label_url: None,
        supplier_code: SupplierCode::A,
        last_modified,
        raw_supplier_fields: BTreeMap::new(),
    }
}

/// A Supplier B summer tire modified at `last_modified`.
pub fn tire_b(id: &str, last_modified: DateTime<Utc>) -> CanonicalProduct {
    let mut fields = BTreeMap::new();
    fields.insert(dekk_core::raw_fields::PRODUCER_ID.to_string(), "9".to_string());
    fields.insert(
        dekk_core::raw_fields::GROUP_TITLE.to_string(),
        "Sumardekk".to_string(),
    );
    CanonicalProduct {
        sku: SupplierCode::B.sku_for(id),
        external_id: id.to_string(),
        title: "Sailun Atrezzo Elite 205/55R16 91V".to_string(),
        raw_price: Decimal::from(14_000),
        quantity: 12,
        width: "205".to_string(),
        aspect_ratio: "55".to_string(),
        rim_diameter_inches: 16,
        image_url: None,
        gallery_image_url: None,
        energy_label_url: None,
        supplier_code: SupplierCode::B,
        last_modified,
        raw_supplier_fields: fields,
    }
}

pub fn tires_a(ids: &[&str], last_modified: DateTime<Utc>) -> Vec<CanonicalProduct> {
    ids.iter().map(|id| tire_a(id, last_modified)).collect()
}

/// Polls until `check` holds or roughly two seconds pass.
pub async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
