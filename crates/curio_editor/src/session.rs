//! Editor session
//!
//! The explicit context object an embedding editor constructs once at
//! startup: it owns the asset store, the kind table, and the registry, and
//! exposes the host lifecycle hooks (initialize-on-load, play-mode
//! transitions, save points, pre/post build).

use curio_core::{AssetStore, KindRegistry, StoreError};
use curio_registry::{CollectionsRegistry, ReloadReport};

pub struct EditorSession<S: AssetStore> {
    store: S,
    kinds: KindRegistry,
    registry: CollectionsRegistry,
}

impl<S: AssetStore> EditorSession<S> {
    pub fn new(store: S, kinds: KindRegistry) -> Self {
        Self {
            store,
            kinds,
            registry: CollectionsRegistry::new(),
        }
    }

    /// Initialize-on-load hook, invoked once when the host editor (re)loads:
    /// restore the persisted registry snapshot, then reconcile against what
    /// the store actually holds.
    pub fn on_load(&mut self) -> Result<ReloadReport, StoreError> {
        if let Some(snapshot) = self.store.load_registry()? {
            for guid in &snapshot.collections {
                match self.store.load_collection(guid, &self.kinds) {
                    Ok(collection) => {
                        self.registry.register(collection);
                    }
                    Err(error) => {
                        tracing::warn!(%guid, %error, "snapshot references unloadable collection");
                    }
                }
            }
        }
        Ok(self.registry.reload(&self.store, &self.kinds))
    }

    pub fn enter_play_mode(&mut self) {
        self.registry.set_play_mode(true);
    }

    pub fn exit_play_mode(&mut self) {
        self.registry.set_play_mode(false);
    }

    /// Save point: persist every dirty item, collection, and the registry
    /// snapshot, then flush the store. Returns whether anything was written.
    pub fn save(&mut self) -> Result<bool, StoreError> {
        let Self {
            store,
            kinds,
            registry,
        } = self;

        let mut wrote = false;
        for collection in registry.collections_mut() {
            for item in collection.items_mut() {
                if item.take_dirty() {
                    store.save_item(item, kinds)?;
                    wrote = true;
                }
            }
            if collection.take_dirty() {
                store.save_collection(collection, kinds)?;
                wrote = true;
            }
        }
        if registry.take_dirty() {
            store.save_registry(&registry.snapshot())?;
            wrote = true;
        }
        if wrote {
            store.flush()?;
        }
        Ok(wrote)
    }

    /// Re-read every registered collection's item list from the store.
    pub fn refresh_collections(&mut self) -> usize {
        let Self {
            store,
            kinds,
            registry,
        } = self;
        registry
            .collections_mut()
            .iter_mut()
            .map(|collection| collection.refresh(&*store, kinds))
            .sum()
    }

    /// Drop item references whose backing assets disappeared out-of-band.
    pub fn clear_bad_items(&mut self) -> usize {
        let Self {
            store, registry, ..
        } = self;
        registry
            .collections_mut()
            .iter_mut()
            .map(|collection| collection.clear_bad_items(&*store))
            .sum()
    }

    pub fn pre_build(&mut self) -> Result<(), StoreError> {
        self.registry.pre_build(&mut self.store)
    }

    pub fn post_build(&mut self) -> Result<ReloadReport, StoreError> {
        self.registry.post_build(&mut self.store, &self.kinds)
    }

    pub fn registry(&self) -> &CollectionsRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CollectionsRegistry {
        &mut self.registry
    }

    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    pub fn kinds_mut(&mut self) -> &mut KindRegistry {
        &mut self.kinds
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
