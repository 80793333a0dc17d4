//! Kind table
//!
//! A registered type hierarchy standing in for host reflection: every
//! collection and item declares a kind, kinds form a tree under two built-in
//! roots, and assignability walks parent links.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Interned kind identifier, valid for the lifetime of its [`KindRegistry`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KindId(u32);

impl KindId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind#{}", self.0)
    }
}

struct KindDef {
    name: String,
    parent: Option<KindId>,
}

/// Registered inheritance table over collection and item kinds.
///
/// Two roots are always present: [`KindRegistry::collection_root`] for
/// collection asset types and [`KindRegistry::item_root`] for item types.
pub struct KindRegistry {
    kinds: Vec<KindDef>,
    name_lookup: HashMap<String, KindId>,
}

impl KindRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            kinds: Vec::new(),
            name_lookup: HashMap::new(),
        };
        registry.intern("collection", None);
        registry.intern("item", None);
        registry
    }

    /// Root kind of every collection asset type.
    pub fn collection_root(&self) -> KindId {
        KindId(0)
    }

    /// Root kind of every item type.
    pub fn item_root(&self) -> KindId {
        KindId(1)
    }

    /// Register a kind under `parent`. Idempotent: re-registering a known
    /// name returns the existing id (the parent link is not rewritten).
    pub fn register(&mut self, name: &str, parent: KindId) -> KindId {
        if let Some(&existing) = self.name_lookup.get(name) {
            return existing;
        }
        self.intern(name, Some(parent))
    }

    fn intern(&mut self, name: &str, parent: Option<KindId>) -> KindId {
        let id = KindId(self.kinds.len() as u32);
        self.kinds.push(KindDef {
            name: name.to_owned(),
            parent,
        });
        self.name_lookup.insert(name.to_owned(), id);
        id
    }

    pub fn name(&self, kind: KindId) -> &str {
        &self.kinds[kind.index()].name
    }

    pub fn parent(&self, kind: KindId) -> Option<KindId> {
        self.kinds[kind.index()].parent
    }

    pub fn kind_by_name(&self, name: &str) -> Option<KindId> {
        self.name_lookup.get(name).copied()
    }

    /// True when a value of kind `derived` can be treated as `base`:
    /// `base` appears on `derived`'s parent chain (or they are equal).
    pub fn is_assignable(&self, base: KindId, derived: KindId) -> bool {
        let mut current = Some(derived);
        while let Some(kind) = current {
            if kind == base {
                return true;
            }
            current = self.parent(kind);
        }
        false
    }

    /// All strict descendants of `base`, in registration order.
    pub fn subkinds_of(&self, base: KindId) -> Vec<KindId> {
        (0..self.kinds.len() as u32)
            .map(KindId)
            .filter(|&kind| kind != base && self.is_assignable(base, kind))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roots_are_distinct() {
        let kinds = KindRegistry::new();
        assert_ne!(kinds.collection_root(), kinds.item_root());
        assert_eq!(kinds.name(kinds.collection_root()), "collection");
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut kinds = KindRegistry::new();
        let root = kinds.item_root();
        let a = kinds.register("Consumable", root);
        let b = kinds.register("Consumable", root);
        assert_eq!(a, b);
        assert_eq!(kinds.len(), 3);
    }

    #[test]
    fn test_assignability_walks_parent_chain() {
        let mut kinds = KindRegistry::new();
        let item = kinds.item_root();
        let consumable = kinds.register("Consumable", item);
        let potion = kinds.register("Potion", consumable);
        let weapon = kinds.register("Weapon", item);

        assert!(kinds.is_assignable(consumable, potion));
        assert!(kinds.is_assignable(item, potion));
        assert!(kinds.is_assignable(potion, potion));
        assert!(!kinds.is_assignable(potion, consumable));
        assert!(!kinds.is_assignable(weapon, potion));
    }

    #[test]
    fn test_subkinds_excludes_base() {
        let mut kinds = KindRegistry::new();
        let item = kinds.item_root();
        let consumable = kinds.register("Consumable", item);
        let potion = kinds.register("Potion", consumable);
        kinds.register("AudioCollection", kinds.collection_root());

        let subs = kinds.subkinds_of(item);
        assert_eq!(subs, vec![consumable, potion]);
    }

    #[test]
    fn test_kind_name_round_trip() {
        let mut kinds = KindRegistry::new();
        let weapon = kinds.register("Weapon", kinds.item_root());
        assert_eq!(kinds.kind_by_name("Weapon"), Some(weapon));
        assert_eq!(kinds.kind_by_name("Armor"), None);
    }
}
