//! Detection of catalog entries whose SKU disappeared from the supplier feeds.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Duration, Utc};
use dekk_core::{CanonicalProduct, StoredEntry, SupplierCode};

/// When an in-stock entry missing from the current fetch gets deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObsoletePolicy {
    /// Deactivate on the first run that does not see the SKU.
    #[default]
    Immediate,
    /// Deactivate only once the entry has gone unsynced for `days`.
    GracePeriod { days: u32 },
}

impl ObsoletePolicy {
    #[must_use]
    pub fn from_grace_days(days: Option<u32>) -> Self {
        match days {
            Some(days) if days > 0 => ObsoletePolicy::GracePeriod { days },
            _ => ObsoletePolicy::Immediate,
        }
    }

    fn is_due(self, last_synced_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            ObsoletePolicy::Immediate => true,
            ObsoletePolicy::GracePeriod { days } => {
                now - last_synced_at >= Duration::days(i64::from(days))
            }
        }
    }
}

/// Which supplier-tagged entries are candidates for deactivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObsoleteScope {
    /// Every supplier-tagged entry. A supplier that returned nothing this
    /// run has all of its in-stock entries deactivated.
    #[default]
    AllSuppliers,
    /// Only entries of suppliers that delivered at least one product this
    /// run. Guards against a supplier outage emptying its catalog share.
    FetchedSuppliers,
}

impl ObsoleteScope {
    #[must_use]
    pub fn from_skip_silent(skip_silent_suppliers: bool) -> Self {
        if skip_silent_suppliers {
            ObsoleteScope::FetchedSuppliers
        } else {
            ObsoleteScope::AllSuppliers
        }
    }
}

/// Entries to deactivate after a run that fetched `products`: in stock,
/// absent from the fetched SKU set, within `scope` and due under `policy`.
#[must_use]
pub fn find_obsolete(
    entries: Vec<StoredEntry>,
    products: &[CanonicalProduct],
    policy: ObsoletePolicy,
    scope: ObsoleteScope,
    now: DateTime<Utc>,
) -> Vec<StoredEntry> {
    let live_suppliers: BTreeSet<SupplierCode> =
        products.iter().map(|p| p.supplier_code).collect();
    let fetched: HashSet<&str> = products.iter().map(|p| p.sku.as_str()).collect();
    let in_scope = |code: SupplierCode| match scope {
        ObsoleteScope::AllSuppliers => true,
        ObsoleteScope::FetchedSuppliers => live_suppliers.contains(&code),
    };

    entries
        .into_iter()
        .filter(|stored| {
            let entry = &stored.entry;
            in_scope(entry.supplier_code)
                && !fetched.contains(entry.sku.as_str())
                && entry.is_in_stock()
                && policy.is_due(entry.last_synced_at, now)
        })
        .collect()
}
