//! Collections registry

use crate::reload::{scan_collections, ReloadReport};
use curio_core::{
    AssetStore, Collection, Guid, Item, KindId, KindRegistry, RegistrySnapshot, StoreError,
};
use std::collections::HashSet;

/// Directory of all known collections.
///
/// Owns the in-process list; the backing assets stay owned by the store.
/// Linear scans throughout: the expected scale is tens to hundreds of
/// collections.
#[derive(Default)]
pub struct CollectionsRegistry {
    collections: Vec<Collection>,
    play_mode: bool,
    dirty: bool,
}

impl CollectionsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn collections_mut(&mut self) -> &mut [Collection] {
        &mut self.collections
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn is_known_collection(&self, guid: &Guid) -> bool {
        self.collections
            .iter()
            .any(|collection| collection.guid() == guid)
    }

    /// Idempotent insert keyed by GUID. Returns whether the set changed.
    pub fn register(&mut self, collection: Collection) -> bool {
        if self.is_known_collection(collection.guid()) {
            return false;
        }
        self.collections.push(collection);
        self.dirty = true;
        true
    }

    /// Idempotent removal. Returns the collection when it was registered.
    pub fn unregister(&mut self, guid: &Guid) -> Option<Collection> {
        let index = self
            .collections
            .iter()
            .position(|collection| collection.guid() == guid)?;
        self.dirty = true;
        Some(self.collections.remove(index))
    }

    pub fn collection_by_guid(&self, guid: &Guid) -> Option<&Collection> {
        self.collections
            .iter()
            .find(|collection| collection.guid() == guid)
    }

    pub fn collection_by_guid_mut(&mut self, guid: &Guid) -> Option<&mut Collection> {
        self.collections
            .iter_mut()
            .find(|collection| collection.guid() == guid)
    }

    pub fn collection_by_name(&self, name: &str) -> Option<&Collection> {
        self.collections
            .iter()
            .find(|collection| collection.name() == name)
    }

    /// First registered collection whose own asset kind is `kind` or a
    /// subkind of it.
    pub fn collection_of_kind(&self, kind: KindId, kinds: &KindRegistry) -> Option<&Collection> {
        self.collections
            .iter()
            .find(|collection| kinds.is_assignable(kind, collection.kind()))
    }

    /// Collections whose declared item kind accepts `item_kind` (covariant:
    /// a collection of the ancestor kind accepts the subtype).
    pub fn collections_by_item_kind(
        &self,
        item_kind: KindId,
        kinds: &KindRegistry,
    ) -> Vec<&Collection> {
        self.collections
            .iter()
            .filter(|collection| kinds.is_assignable(collection.item_kind(), item_kind))
            .collect()
    }

    /// Every item of every collection whose declared item kind is `base` or
    /// a subkind of it.
    pub fn items_of_kind(&self, base: KindId, kinds: &KindRegistry) -> Vec<&Item> {
        self.collections
            .iter()
            .filter(|collection| kinds.is_assignable(base, collection.item_kind()))
            .flat_map(|collection| collection.items().iter())
            .collect()
    }

    /// Succeeds only when exactly one registered collection accepts the
    /// given item kind. Zero or several matches resolve to `None`: silently
    /// picking one of several would be a correctness hazard, so ambiguity is
    /// pushed back to the caller.
    pub fn unique_collection_for_item_kind(
        &self,
        item_kind: KindId,
        kinds: &KindRegistry,
    ) -> Option<&Collection> {
        let mut matches = self
            .collections
            .iter()
            .filter(|collection| kinds.is_assignable(collection.item_kind(), item_kind));
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }

    /// Resolve an item's owning collection: the stored back-reference GUID
    /// first, falling back to the unique collection accepting the item's
    /// concrete kind. A fallback hit self-heals by writing the discovered
    /// GUID into the item. A stored GUID that no longer matches any
    /// registered collection resolves to `None` and is left for repair.
    pub fn resolve_owner<'a>(
        &'a self,
        item: &mut Item,
        kinds: &KindRegistry,
    ) -> Option<&'a Collection> {
        if let Some(stored) = item.collection_guid() {
            return self.collection_by_guid(&stored.clone());
        }
        let found = self.unique_collection_for_item_kind(item.kind(), kinds)?;
        tracing::info!(
            item = %item.name(),
            collection = %found.name(),
            "item was missing its collection GUID, assigned"
        );
        item.set_collection_guid(found.guid().clone());
        Some(found)
    }

    /// GUID repair protocol: assign identities to collections that never
    /// synchronized one, then a pairwise case-insensitive scan regenerates
    /// the later of each colliding pair, then each collection repairs its
    /// own item GUIDs. GUID space stays globally unique without rejecting
    /// anything.
    pub fn validate_guids(&mut self) {
        for collection in &mut self.collections {
            if collection.guid().is_nil() {
                collection.generate_new_guid();
                self.dirty = true;
            }
        }
        for i in 0..self.collections.len() {
            for j in (i + 1)..self.collections.len() {
                let colliding = self.collections[i]
                    .guid()
                    .eq_ignore_case(self.collections[j].guid());
                if colliding {
                    let name = self.collections[j].name().to_owned();
                    self.collections[j].generate_new_guid();
                    self.dirty = true;
                    tracing::warn!(
                        collection = %name,
                        "duplicated collection GUID, regenerated"
                    );
                }
            }
            self.collections[i].validate_item_guids();
        }
    }

    /// Full rescan against the store: swap-and-diff bulk reindex. The next
    /// set is every automatically-loaded collection the store reports;
    /// additions and removals relative to the current set are reported.
    /// Reloading twice over an unchanged store is a no-op the second time.
    ///
    /// Structurally disallowed during play mode: short-circuits to an empty
    /// report.
    pub fn reload(&mut self, store: &dyn AssetStore, kinds: &KindRegistry) -> ReloadReport {
        if self.play_mode {
            tracing::debug!("reload short-circuited during play mode");
            return ReloadReport::default();
        }

        let next = scan_collections(store, kinds);

        let old_guids: HashSet<Guid> = self
            .collections
            .iter()
            .map(|collection| collection.guid().clone())
            .collect();
        let new_guids: HashSet<Guid> = next
            .iter()
            .map(|collection| collection.guid().clone())
            .collect();

        let report = ReloadReport {
            added: next
                .iter()
                .map(|collection| collection.guid())
                .filter(|guid| !old_guids.contains(guid))
                .cloned()
                .collect(),
            removed: self
                .collections
                .iter()
                .map(|collection| collection.guid())
                .filter(|guid| !new_guids.contains(guid))
                .cloned()
                .collect(),
        };

        self.collections = next;
        if !report.is_unchanged() {
            self.dirty = true;
            tracing::info!(
                added = report.added.len(),
                removed = report.removed.len(),
                total = self.collections.len(),
                "registry reloaded"
            );
        }

        self.validate_guids();
        report
    }

    /// Pack step: drop non-automatically-loaded collections from the
    /// registry and persist the pruned snapshot, so shipped builds only
    /// embed intended collections.
    pub fn pre_build(&mut self, store: &mut dyn AssetStore) -> Result<(), StoreError> {
        let before = self.collections.len();
        self.collections
            .retain(|collection| collection.automatically_loaded());
        if self.collections.len() != before {
            self.dirty = true;
            tracing::info!(
                removed = before - self.collections.len(),
                "pruned non-automatically-loaded collections for build"
            );
        }
        store.save_registry(&self.snapshot())?;
        store.flush()
    }

    /// Unpack step: full reload to restore editor-time state, then persist
    /// the restored snapshot.
    pub fn post_build(
        &mut self,
        store: &mut dyn AssetStore,
        kinds: &KindRegistry,
    ) -> Result<ReloadReport, StoreError> {
        let report = self.reload(store, kinds);
        store.save_registry(&self.snapshot())?;
        Ok(report)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            collections: self
                .collections
                .iter()
                .map(|collection| collection.guid().clone())
                .collect(),
        }
    }

    /// Host constraint gate: reload is unreachable during play.
    pub fn set_play_mode(&mut self, playing: bool) {
        self.play_mode = playing;
    }

    pub fn is_play_mode(&self) -> bool {
        self.play_mode
    }

    /// Clear every collection's items, then the directory itself.
    pub fn clear(&mut self) {
        for collection in &mut self.collections {
            collection.clear();
        }
        if !self.collections.is_empty() {
            self.collections.clear();
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curio_store::MemoryStore;
    use std::collections::BTreeSet;

    struct Fixture {
        store: MemoryStore,
        kinds: KindRegistry,
        collection_kind: KindId,
        item_kind: KindId,
    }

    fn fixture() -> Fixture {
        let mut kinds = KindRegistry::new();
        let collection_kind = kinds.register("LootTable", kinds.collection_root());
        let item_kind = kinds.register("LootEntry", kinds.item_root());
        Fixture {
            store: MemoryStore::new(),
            kinds,
            collection_kind,
            item_kind,
        }
    }

    fn collection(name: &str, guid: &str, kind: KindId, item_kind: KindId) -> Collection {
        Collection::from_parts(
            Guid::from(guid),
            name.to_owned(),
            kind,
            item_kind,
            true,
            Vec::new(),
            None,
        )
    }

    fn guid_set(registry: &CollectionsRegistry) -> BTreeSet<Guid> {
        registry
            .collections()
            .iter()
            .map(|c| c.guid().clone())
            .collect()
    }

    #[test]
    fn test_register_is_idempotent() {
        let f = fixture();
        let mut registry = CollectionsRegistry::new();
        assert!(registry.register(collection("a", "aa", f.collection_kind, f.item_kind)));
        assert!(!registry.register(collection("a2", "aa", f.collection_kind, f.item_kind)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_then_unregister_restores_content() {
        let f = fixture();
        let mut registry = CollectionsRegistry::new();
        registry.register(collection("a", "aa", f.collection_kind, f.item_kind));
        registry.register(collection("b", "bb", f.collection_kind, f.item_kind));
        let before = guid_set(&registry);

        registry.register(collection("c", "cc", f.collection_kind, f.item_kind));
        registry.unregister(&Guid::from("cc"));

        assert_eq!(guid_set(&registry), before);
        assert!(registry.unregister(&Guid::from("cc")).is_none());
    }

    #[test]
    fn test_validate_guids_makes_guids_pairwise_distinct() {
        let f = fixture();
        let mut registry = CollectionsRegistry::new();
        // Injected duplicates, including a case-only variant.
        registry.register(collection("a", "deadbeef", f.collection_kind, f.item_kind));
        for (name, guid) in [("b", "DEADBEEF"), ("c", "deadbeef"), ("d", "cafe")] {
            registry
                .collections
                .push(collection(name, guid, f.collection_kind, f.item_kind));
        }

        registry.validate_guids();

        let guids: Vec<&Guid> = registry.collections().iter().map(|c| c.guid()).collect();
        for i in 0..guids.len() {
            for j in 0..guids.len() {
                if i != j {
                    assert!(!guids[i].eq_ignore_case(guids[j]));
                }
            }
        }
        // The first holder keeps its identity.
        assert_eq!(registry.collections()[0].guid(), &Guid::from("deadbeef"));
        assert!(registry.is_dirty());
    }

    #[test]
    fn test_validate_guids_assigns_missing_collection_guid() {
        let f = fixture();
        let mut registry = CollectionsRegistry::new();
        // Registered before its first GUID sync.
        let mut unsynced = Collection::new("fresh", f.collection_kind, f.item_kind);
        unsynced.add_item(Item::new("entry", f.item_kind));
        registry.register(unsynced);

        registry.validate_guids();

        let collection = &registry.collections()[0];
        assert!(!collection.guid().is_nil());
        assert!(collection.is_dirty());
        assert!(!collection.items()[0].guid().is_nil());
        assert!(registry.is_dirty());
    }

    #[test]
    fn test_resolve_owner_by_stored_guid() {
        let f = fixture();
        let mut registry = CollectionsRegistry::new();
        registry.register(collection("loot", "aa", f.collection_kind, f.item_kind));

        let mut item = Item::new("sword", f.item_kind);
        item.set_collection_guid(Guid::from("aa"));
        let owner = registry.resolve_owner(&mut item, &f.kinds).unwrap();
        assert_eq!(owner.name(), "loot");
    }

    #[test]
    fn test_resolve_owner_self_heals_unique_match() {
        let f = fixture();
        let mut registry = CollectionsRegistry::new();
        registry.register(collection("loot", "aa", f.collection_kind, f.item_kind));

        let mut item = Item::new("sword", f.item_kind);
        assert!(item.collection_guid().is_none());
        let owner = registry.resolve_owner(&mut item, &f.kinds).unwrap();
        assert_eq!(owner.guid(), &Guid::from("aa"));
        // Back-reference persisted on the item.
        assert_eq!(item.collection_guid(), Some(&Guid::from("aa")));
        assert!(item.is_dirty());
    }

    #[test]
    fn test_resolve_owner_ambiguous_is_none() {
        let f = fixture();
        let mut registry = CollectionsRegistry::new();
        registry.register(collection("loot_a", "aa", f.collection_kind, f.item_kind));
        registry.register(collection("loot_b", "bb", f.collection_kind, f.item_kind));

        let mut item = Item::new("sword", f.item_kind);
        assert!(registry.resolve_owner(&mut item, &f.kinds).is_none());
        assert!(item.collection_guid().is_none());
    }

    #[test]
    fn test_resolve_owner_dangling_guid_is_none() {
        let f = fixture();
        let mut registry = CollectionsRegistry::new();
        registry.register(collection("loot", "aa", f.collection_kind, f.item_kind));

        let mut item = Item::new("sword", f.item_kind);
        item.set_collection_guid(Guid::from("gone"));
        assert!(registry.resolve_owner(&mut item, &f.kinds).is_none());
        // Tolerated until repaired, not silently rewritten.
        assert_eq!(item.collection_guid(), Some(&Guid::from("gone")));
    }

    #[test]
    fn test_unique_collection_matches_ancestor_typed_collection() {
        let mut f = fixture();
        let rare = f.kinds.register("RareLootEntry", f.item_kind);
        let mut registry = CollectionsRegistry::new();
        registry.register(collection("loot", "aa", f.collection_kind, f.item_kind));

        // A collection of the ancestor kind accepts the subtype.
        let found = registry
            .unique_collection_for_item_kind(rare, &f.kinds)
            .unwrap();
        assert_eq!(found.name(), "loot");
    }

    #[test]
    fn test_items_of_kind_is_contravariant_on_base() {
        let mut f = fixture();
        let rare = f.kinds.register("RareLootEntry", f.item_kind);
        let rare_tables = f
            .kinds
            .register("RareLootTable", f.kinds.collection_root());

        let mut base = collection("loot", "aa", f.collection_kind, f.item_kind);
        base.add_item(Item::from_parts(
            Guid::from("11"),
            f.item_kind,
            "common".into(),
            None,
            None,
            serde_json::Value::Null,
        ));
        let mut rares = collection("rare_loot", "bb", rare_tables, rare);
        rares.add_item(Item::from_parts(
            Guid::from("22"),
            rare,
            "epic".into(),
            None,
            None,
            serde_json::Value::Null,
        ));

        let mut registry = CollectionsRegistry::new();
        registry.register(base);
        registry.register(rares);

        // Asking for the base kind gathers items from subtype collections too.
        let all = registry.items_of_kind(f.item_kind, &f.kinds);
        assert_eq!(all.len(), 2);
        let only_rare = registry.items_of_kind(rare, &f.kinds);
        assert_eq!(only_rare.len(), 1);
        assert_eq!(only_rare[0].name(), "epic");

        // The covariant query instead finds collections accepting the kind.
        let accepting_rare = registry.collections_by_item_kind(rare, &f.kinds);
        assert_eq!(accepting_rare.len(), 2);
    }

    #[test]
    fn test_reload_is_idempotent_over_unchanged_store() {
        let mut f = fixture();
        let a = collection("a", "aa", f.collection_kind, f.item_kind);
        f.store.save_collection(&a, &f.kinds).unwrap();

        let mut registry = CollectionsRegistry::new();
        let first = registry.reload(&f.store, &f.kinds);
        assert_eq!(first.added, vec![Guid::from("aa")]);
        assert!(first.removed.is_empty());

        let second = registry.reload(&f.store, &f.kinds);
        assert!(second.is_unchanged());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reload_evicts_no_longer_auto_loaded() {
        let mut f = fixture();
        let mut a = collection("a", "aa", f.collection_kind, f.item_kind);
        f.store.save_collection(&a, &f.kinds).unwrap();

        let mut registry = CollectionsRegistry::new();
        registry.reload(&f.store, &f.kinds);
        assert!(registry.is_known_collection(&Guid::from("aa")));

        // Flag flipped out-of-band in the store.
        a.set_automatically_loaded(false);
        f.store.save_collection(&a, &f.kinds).unwrap();

        let report = registry.reload(&f.store, &f.kinds);
        assert_eq!(report.removed, vec![Guid::from("aa")]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reload_short_circuits_in_play_mode() {
        let mut f = fixture();
        let a = collection("a", "aa", f.collection_kind, f.item_kind);
        f.store.save_collection(&a, &f.kinds).unwrap();

        let mut registry = CollectionsRegistry::new();
        registry.set_play_mode(true);
        let report = registry.reload(&f.store, &f.kinds);
        assert!(report.is_unchanged());
        assert!(registry.is_empty());

        registry.set_play_mode(false);
        assert!(!registry.reload(&f.store, &f.kinds).is_unchanged());
    }

    #[test]
    fn test_pre_build_removes_exactly_non_auto_loaded() {
        let mut f = fixture();
        let auto = collection("auto", "aa", f.collection_kind, f.item_kind);
        let mut manual = collection("manual", "bb", f.collection_kind, f.item_kind);
        manual.set_automatically_loaded(false);
        manual.take_dirty();

        let mut registry = CollectionsRegistry::new();
        registry.register(auto);
        registry.register(manual);

        registry.pre_build(&mut f.store).unwrap();

        assert_eq!(guid_set(&registry), BTreeSet::from([Guid::from("aa")]));
        let snapshot = f.store.load_registry().unwrap().unwrap();
        assert_eq!(snapshot.collections, vec![Guid::from("aa")]);
    }

    #[test]
    fn test_post_build_restores_pre_build_state() {
        let mut f = fixture();
        for (name, guid) in [("a", "aa"), ("b", "bb")] {
            let c = collection(name, guid, f.collection_kind, f.item_kind);
            f.store.save_collection(&c, &f.kinds).unwrap();
        }

        let mut registry = CollectionsRegistry::new();
        registry.reload(&f.store, &f.kinds);
        let before = guid_set(&registry);

        registry.pre_build(&mut f.store).unwrap();
        registry.post_build(&mut f.store, &f.kinds).unwrap();

        assert_eq!(guid_set(&registry), before);
        let snapshot = f.store.load_registry().unwrap().unwrap();
        assert_eq!(
            snapshot.collections.iter().cloned().collect::<BTreeSet<_>>(),
            before
        );
    }

    #[test]
    fn test_clear_empties_collections_and_directory() {
        let f = fixture();
        let mut registry = CollectionsRegistry::new();
        let mut a = collection("a", "aa", f.collection_kind, f.item_kind);
        a.add_item(Item::new("x", f.item_kind));
        registry.register(a);

        registry.clear();
        assert!(registry.is_empty());
    }
}
