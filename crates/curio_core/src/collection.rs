//! Collections
//!
//! A named, typed grouping of items, itself a persisted asset. A collection
//! exclusively owns its ordered item list; the registry owns the directory
//! of collections.

use crate::guid::Guid;
use crate::item::{GuidSource, Item};
use crate::kind::{KindId, KindRegistry};
use crate::store::{AssetStore, StoreError};
use std::path::{Path, PathBuf};

/// A named, typed grouping of items.
#[derive(Debug, Clone)]
pub struct Collection {
    guid: Guid,
    name: String,
    kind: KindId,
    item_kind: KindId,
    automatically_loaded: bool,
    items: Vec<Item>,
    asset_path: Option<PathBuf>,
    dirty: bool,
}

impl Collection {
    /// A fresh collection of the given collection kind, accepting items of
    /// `item_kind`. Automatically loaded by default, GUID nil until synced.
    pub fn new(name: impl Into<String>, kind: KindId, item_kind: KindId) -> Self {
        Self {
            guid: Guid::nil(),
            name: name.into(),
            kind,
            item_kind,
            automatically_loaded: true,
            items: Vec::new(),
            asset_path: None,
            dirty: false,
        }
    }

    /// Rebuild a collection from its persisted parts. Used by store loaders.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        guid: Guid,
        name: String,
        kind: KindId,
        item_kind: KindId,
        automatically_loaded: bool,
        items: Vec<Item>,
        asset_path: Option<PathBuf>,
    ) -> Self {
        Self {
            guid,
            name,
            kind,
            item_kind,
            automatically_loaded,
            items,
            asset_path,
            dirty: false,
        }
    }

    pub fn guid(&self) -> &Guid {
        &self.guid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// This collection's own asset kind (a collection subtype).
    pub fn kind(&self) -> KindId {
        self.kind
    }

    /// Declared element kind of the items this collection accepts.
    pub fn item_kind(&self) -> KindId {
        self.item_kind
    }

    pub fn automatically_loaded(&self) -> bool {
        self.automatically_loaded
    }

    pub fn set_automatically_loaded(&mut self, value: bool) {
        if self.automatically_loaded != value {
            self.automatically_loaded = value;
            self.dirty = true;
        }
    }

    pub fn asset_path(&self) -> Option<&Path> {
        self.asset_path.as_deref()
    }

    pub fn set_asset_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.asset_path.as_deref() != Some(path.as_path()) {
            self.asset_path = Some(path);
            self.dirty = true;
        }
    }

    /// Lazily assign a GUID, path-derived when the store knows this
    /// collection's asset path. Returns true when an assignment happened.
    pub fn sync_guid(&mut self, source: &dyn GuidSource) -> bool {
        if !self.guid.is_nil() {
            return false;
        }
        self.guid = self
            .asset_path
            .as_deref()
            .and_then(|path| source.guid_for_path(path))
            .unwrap_or_else(Guid::random);
        self.dirty = true;
        true
    }

    /// Identity reset used by the registry's collision repair.
    pub fn generate_new_guid(&mut self) {
        self.guid = Guid::random();
        self.dirty = true;
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [Item] {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains_item(&self, guid: &Guid) -> bool {
        self.items.iter().any(|item| item.guid() == guid)
    }

    pub fn item_by_guid(&self, guid: &Guid) -> Option<&Item> {
        self.items.iter().find(|item| item.guid() == guid)
    }

    /// Append an item, wiring its back-reference to this collection.
    pub fn add_item(&mut self, mut item: Item) {
        item.set_collection_guid(self.guid.clone());
        self.items.push(item);
        self.dirty = true;
    }

    pub fn remove_item(&mut self, guid: &Guid) -> Option<Item> {
        let index = self.items.iter().position(|item| item.guid() == guid)?;
        self.dirty = true;
        Some(self.items.remove(index))
    }

    /// Deterministic order: lexicographic by item GUID.
    pub fn sort_items(&mut self) {
        self.items.sort();
    }

    /// Re-read every item from the store, dropping references whose backing
    /// asset has disappeared out-of-band. Returns the number of dropped
    /// items.
    pub fn refresh(&mut self, store: &dyn AssetStore, kinds: &KindRegistry) -> usize {
        let before = self.items.len();
        let mut refreshed = Vec::with_capacity(before);
        for item in self.items.drain(..) {
            match store.load_item(item.guid(), kinds) {
                Ok(loaded) => refreshed.push(loaded),
                Err(StoreError::Missing { guid }) => {
                    tracing::warn!(
                        collection = %self.name,
                        item = %guid,
                        "dropping item reference with no backing asset"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        collection = %self.name,
                        item = %item.guid(),
                        %error,
                        "dropping unloadable item reference"
                    );
                }
            }
        }
        self.items = refreshed;
        let dropped = before - self.items.len();
        if dropped > 0 {
            self.dirty = true;
        }
        dropped
    }

    /// Drop items whose backing asset no longer exists, without reloading
    /// the survivors.
    pub fn clear_bad_items(&mut self, store: &dyn AssetStore) -> usize {
        let before = self.items.len();
        self.items
            .retain(|item| !item.guid().is_nil() && store.contains(item.guid()));
        let dropped = before - self.items.len();
        if dropped > 0 {
            self.dirty = true;
        }
        dropped
    }

    /// Item-level GUID repair: assign identities to unsynchronized items,
    /// then regenerate the later of any case-insensitive duplicate pair.
    pub fn validate_item_guids(&mut self) {
        for item in &mut self.items {
            if item.guid().is_nil() {
                item.generate_new_guid();
                self.dirty = true;
            }
        }
        for i in 0..self.items.len() {
            for j in (i + 1)..self.items.len() {
                if self.items[i].guid().eq_ignore_case(self.items[j].guid()) {
                    let name = self.items[j].name().to_owned();
                    self.items[j].generate_new_guid();
                    self.dirty = true;
                    tracing::warn!(
                        collection = %self.name,
                        item = %name,
                        "duplicated item GUID, regenerated"
                    );
                }
            }
        }
    }

    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items.clear();
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}
