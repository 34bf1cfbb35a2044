use std::net::SocketAddr;
use std::path::PathBuf;

use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Supplier A stock endpoint. `None` disables the adapter.
    pub supplier_a_stock_url: Option<String>,
    /// Supplier A image database endpoint, joined to stock rows by item id.
    pub supplier_a_images_url: Option<String>,
    /// Supplier B base endpoint. `None` disables the adapter.
    pub supplier_b_url: Option<String>,
    pub feed_request_timeout_secs: u64,
    pub feed_user_agent: String,
    /// Amount in ISK deducted from every supplier price.
    pub price_markup_isk: Decimal,
    pub sync_batch_size: usize,
    pub sync_batch_pause_ms: u64,
    pub sync_handle_obsolete: bool,
    pub obsolete_batch_size: usize,
    /// When set, obsolete entries are only deactivated once they have gone
    /// unsynced for this many days.
    pub obsolete_grace_days: Option<u32>,
    /// Leave entries of suppliers that returned no products this run alone
    /// instead of deactivating them.
    pub obsolete_skip_silent_suppliers: bool,
    pub sync_lock_timeout_secs: u64,
    pub notify_email: Option<String>,
    /// Six-field cron expression for the scheduled sync job.
    pub sync_schedule: String,
    pub record_patches_path: PathBuf,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("supplier_a_stock_url", &self.supplier_a_stock_url)
            .field("supplier_a_images_url", &self.supplier_a_images_url)
            .field("supplier_b_url", &self.supplier_b_url)
            .field("feed_request_timeout_secs", &self.feed_request_timeout_secs)
            .field("feed_user_agent", &self.feed_user_agent)
            .field("price_markup_isk", &self.price_markup_isk)
            .field("sync_batch_size", &self.sync_batch_size)
            .field("sync_batch_pause_ms", &self.sync_batch_pause_ms)
            .field("sync_handle_obsolete", &self.sync_handle_obsolete)
            .field("obsolete_batch_size", &self.obsolete_batch_size)
            .field("obsolete_grace_days", &self.obsolete_grace_days)
            .field(
                "obsolete_skip_silent_suppliers",
                &self.obsolete_skip_silent_suppliers,
            )
            .field("sync_lock_timeout_secs", &self.sync_lock_timeout_secs)
            .field(
                "notify_email",
                &self.notify_email.as_ref().map(|_| "[redacted]"),
            )
            .field("sync_schedule", &self.sync_schedule)
            .field("record_patches_path", &self.record_patches_path)
            .finish()
    }
}
