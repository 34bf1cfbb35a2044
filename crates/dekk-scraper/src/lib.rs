pub mod client;
pub mod error;
pub mod feeds;
pub mod parse;
pub mod supplier_a;
pub mod supplier_b;
pub mod types;

pub use client::FeedClient;
pub use error::ScraperError;
pub use feeds::SupplierFeeds;
pub use supplier_a::SupplierAFeed;
pub use supplier_b::SupplierBFeed;
pub use types::{SupplierAImageRow, SupplierAStockRow, SupplierBRecord};
