//! Fold-out state cache
//!
//! Inspector expand/collapse state, keyed by a combined hash of the
//! inspected object set so the same selection folds the same way across
//! redraws. Pure presentation state, never persisted.

use curio_core::Guid;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

#[derive(Default)]
pub struct FoldoutCache {
    open: HashMap<u64, bool>,
}

impl FoldoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Order-insensitive: the key is a wrapping sum of per-object hashes, so
    // a reordered selection maps to the same entry. Nil GUIDs are skipped.
    fn key(objects: &[&Guid]) -> u64 {
        let mut combined: u64 = 0;
        for guid in objects {
            if guid.is_nil() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            guid.hash(&mut hasher);
            combined = combined.wrapping_add(hasher.finish());
        }
        combined
    }

    /// Whether the fold-out for this object set is open. Unseen sets (and
    /// the empty set) are closed.
    pub fn is_open(&mut self, objects: &[&Guid]) -> bool {
        let key = Self::key(objects);
        if key == 0 {
            return false;
        }
        *self.open.entry(key).or_insert(false)
    }

    pub fn set_open(&mut self, objects: &[&Guid], value: bool) {
        let key = Self::key(objects);
        if key == 0 {
            return;
        }
        self.open.insert(key, value);
    }
}
