//! Bulk reindex scan
//!
//! Computes the registry's next collection set from the store: every asset
//! of every registered collection subkind, keeping only automatically-loaded
//! collections. The registry diffs the result against its current set.

use curio_core::{AssetStore, Collection, Guid, KindRegistry};
use std::collections::HashSet;

/// Outcome of a reload: which collection GUIDs entered and left the
/// registry. Empty on both sides means the reindex was a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    pub added: Vec<Guid>,
    pub removed: Vec<Guid>,
}

impl ReloadReport {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Scan the store for every automatically-loaded collection, in kind
/// registration order then store order. Assets that fail to load are skipped
/// with a warning; an asset reported under two kinds is taken once.
pub fn scan_collections(store: &dyn AssetStore, kinds: &KindRegistry) -> Vec<Collection> {
    let mut seen: HashSet<Guid> = HashSet::new();
    let mut discovered = Vec::new();

    for kind in kinds.subkinds_of(kinds.collection_root()) {
        for guid in store.find_assets(kind, kinds) {
            if !seen.insert(guid.clone()) {
                continue;
            }
            let collection = match store.load_collection(&guid, kinds) {
                Ok(collection) => collection,
                Err(error) => {
                    tracing::warn!(%guid, %error, "skipping unloadable collection asset");
                    continue;
                }
            };
            if !collection.automatically_loaded() {
                tracing::debug!(collection = %collection.name(),
                    "skipping non-automatically-loaded collection");
                continue;
            }
            discovered.push(collection);
        }
    }
    discovered
}
