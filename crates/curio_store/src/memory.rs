//! In-memory asset store
//!
//! Same contract as the file store, backed by maps. Used by tests and by
//! headless embeddings that bring their own persistence.

use crate::records::{CollectionRecord, ItemRecord};
use curio_core::{
    AssetStore, Collection, Guid, GuidSource, Item, KindId, KindRegistry, RegistrySnapshot,
    StoreError,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct MemoryStore {
    collections: HashMap<Guid, CollectionRecord>,
    items: HashMap<Guid, ItemRecord>,
    paths: HashMap<PathBuf, Guid>,
    registry: Option<RegistrySnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an out-of-band asset deletion. Returns whether anything was
    /// removed.
    pub fn remove_asset(&mut self, guid: &Guid) -> bool {
        let removed =
            self.collections.remove(guid).is_some() | self.items.remove(guid).is_some();
        if removed {
            self.paths.retain(|_, mapped| mapped != guid);
        }
        removed
    }

    /// Associate an asset path with a GUID, as the file store's import step
    /// would.
    pub fn assign_path(&mut self, path: impl Into<PathBuf>, guid: Guid) {
        self.paths.insert(path.into(), guid);
    }

    fn path_of(&self, guid: &Guid) -> Option<PathBuf> {
        self.paths
            .iter()
            .find(|(_, mapped)| *mapped == guid)
            .map(|(path, _)| path.clone())
    }

    fn remap_path(&mut self, path: Option<&Path>, guid: &Guid) {
        if let Some(path) = path {
            if let Some(old) = self.paths.insert(path.to_path_buf(), guid.clone()) {
                if &old != guid {
                    self.collections.remove(&old);
                    self.items.remove(&old);
                }
            }
        }
    }
}

impl GuidSource for MemoryStore {
    fn guid_for_path(&self, path: &Path) -> Option<Guid> {
        self.paths.get(path).cloned()
    }
}

impl AssetStore for MemoryStore {
    fn find_assets(&self, kind: KindId, kinds: &KindRegistry) -> Vec<Guid> {
        let name = kinds.name(kind);
        let mut found: Vec<Guid> = self
            .collections
            .iter()
            .filter(|(_, record)| record.kind == name)
            .map(|(guid, _)| guid.clone())
            .chain(
                self.items
                    .iter()
                    .filter(|(_, record)| record.kind == name)
                    .map(|(guid, _)| guid.clone()),
            )
            .collect();
        found.sort();
        found
    }

    fn contains(&self, guid: &Guid) -> bool {
        self.collections.contains_key(guid) || self.items.contains_key(guid)
    }

    fn load_collection(
        &self,
        guid: &Guid,
        kinds: &KindRegistry,
    ) -> Result<Collection, StoreError> {
        let record = self
            .collections
            .get(guid)
            .ok_or_else(|| StoreError::Missing { guid: guid.clone() })?
            .clone();

        let kind = kinds
            .kind_by_name(&record.kind)
            .ok_or(StoreError::UnknownKind { name: record.kind })?;
        let item_kind = kinds
            .kind_by_name(&record.item_kind)
            .ok_or(StoreError::UnknownKind {
                name: record.item_kind,
            })?;

        let mut items = Vec::with_capacity(record.items.len());
        for item_guid in &record.items {
            match self.load_item(item_guid, kinds) {
                Ok(item) => items.push(item),
                Err(error) => {
                    tracing::warn!(collection = %record.name, item = %item_guid, %error,
                        "skipping unloadable item reference");
                }
            }
        }

        Ok(Collection::from_parts(
            guid.clone(),
            record.name,
            kind,
            item_kind,
            record.automatically_loaded,
            items,
            self.path_of(guid),
        ))
    }

    fn load_item(&self, guid: &Guid, kinds: &KindRegistry) -> Result<Item, StoreError> {
        let record = self
            .items
            .get(guid)
            .ok_or_else(|| StoreError::Missing { guid: guid.clone() })?
            .clone();
        record.into_item(guid.clone(), self.path_of(guid), kinds)
    }

    fn save_collection(
        &mut self,
        collection: &Collection,
        kinds: &KindRegistry,
    ) -> Result<(), StoreError> {
        let record = CollectionRecord::from_collection(collection, kinds);
        self.remap_path(collection.asset_path(), collection.guid());
        self.collections.insert(collection.guid().clone(), record);
        Ok(())
    }

    fn save_item(&mut self, item: &Item, kinds: &KindRegistry) -> Result<(), StoreError> {
        let record = ItemRecord::from_item(item, kinds);
        self.remap_path(item.asset_path(), item.guid());
        self.items.insert(item.guid().clone(), record);
        Ok(())
    }

    fn load_registry(&self) -> Result<Option<RegistrySnapshot>, StoreError> {
        Ok(self.registry.clone())
    }

    fn save_registry(&mut self, snapshot: &RegistrySnapshot) -> Result<(), StoreError> {
        self.registry = Some(snapshot.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
