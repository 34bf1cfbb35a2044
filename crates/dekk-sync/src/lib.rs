//! Attribute extraction, naming, pricing and the reconciliation engine that
//! turns supplier products into catalog entries.

pub mod coordinator;
pub mod diff;
pub mod engine;
pub mod extract;
pub mod memory;
pub mod name;
pub mod notify;
pub mod obsolete;
pub mod pricing;

pub use coordinator::{
    LockHeld, SyncCoordinator, SyncEvent, SyncLockGuard, DEFAULT_LOCK_TIMEOUT,
    DEFAULT_PROGRESS_TTL,
};
pub use dekk_core::SyncProgress;
pub use diff::diff_entry;
pub use engine::{SyncAction, SyncEngine, SyncError, SyncOptions, SyncSettings};
pub use extract::AttributeExtractor;
pub use memory::MemoryCatalog;
pub use name::{build_categories, build_description, build_name};
pub use notify::LogNotifier;
pub use obsolete::{find_obsolete, ObsoletePolicy, ObsoleteScope};
pub use pricing::{build_variants, exposed_stock, final_price, stud_surcharge};
