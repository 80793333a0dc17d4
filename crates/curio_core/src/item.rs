//! Collection items
//!
//! A unit record: a lazily-synchronized GUID, a weak back-reference (by
//! GUID) to the owning collection, and an opaque serialized payload.

use crate::guid::Guid;
use crate::kind::KindId;
use serde_json::Value;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Path-based identity lookup, provided by the asset store.
///
/// Split out of the store trait so items can synchronize their GUID without
/// this crate depending on the persistence layer.
pub trait GuidSource {
    /// The stable GUID the store associates with an asset path, if any.
    fn guid_for_path(&self, path: &Path) -> Option<Guid>;
}

/// A single persisted record belonging to exactly one collection.
#[derive(Debug, Clone)]
pub struct Item {
    guid: Guid,
    kind: KindId,
    name: String,
    collection_guid: Option<Guid>,
    asset_path: Option<PathBuf>,
    payload: Value,
    dirty: bool,
}

impl Item {
    /// A fresh, unsynchronized item of the given concrete kind.
    pub fn new(name: impl Into<String>, kind: KindId) -> Self {
        Self {
            guid: Guid::nil(),
            kind,
            name: name.into(),
            collection_guid: None,
            asset_path: None,
            payload: Value::Null,
            dirty: false,
        }
    }

    /// Rebuild an item from its persisted parts. Used by store loaders.
    pub fn from_parts(
        guid: Guid,
        kind: KindId,
        name: String,
        collection_guid: Option<Guid>,
        asset_path: Option<PathBuf>,
        payload: Value,
    ) -> Self {
        Self {
            guid,
            kind,
            name,
            collection_guid,
            asset_path,
            payload,
            dirty: false,
        }
    }

    /// Current GUID; nil until the first [`Item::sync_guid`].
    pub fn guid(&self) -> &Guid {
        &self.guid
    }

    pub fn kind(&self) -> KindId {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
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

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: Value) {
        self.payload = payload;
        self.dirty = true;
    }

    /// Stored owning-collection GUID, if the back-reference has been set or
    /// resolved.
    pub fn collection_guid(&self) -> Option<&Guid> {
        self.collection_guid.as_ref()
    }

    /// Point this item at its owning collection.
    pub fn set_collection_guid(&mut self, guid: Guid) {
        self.collection_guid = Some(guid);
        self.dirty = true;
    }

    pub fn clear_collection_guid(&mut self) {
        self.collection_guid = None;
    }

    /// Lazily assign a GUID: derived from the backing asset path when the
    /// store can resolve one, otherwise freshly generated. Returns true when
    /// an assignment happened.
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

    /// Explicit identity reset, used by the collision repair protocol.
    ///
    /// Always generates a fresh random GUID: re-deriving from the asset path
    /// would reproduce the colliding identifier.
    pub fn generate_new_guid(&mut self) {
        self.guid = Guid::random();
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clears the dirty flag, returning whether it was set. Called after a
    /// successful persist.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

// Identity, not structure: two items are the same item when their GUIDs
// match, and items order lexicographically by GUID string so sorts are
// deterministic across reloads.
impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.guid == other.guid
    }
}

impl Eq for Item {}

impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Item {
    fn cmp(&self, other: &Self) -> Ordering {
        self.guid.cmp(&other.guid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::KindRegistry;
    use std::collections::HashMap;

    struct FakeSource(HashMap<PathBuf, Guid>);

    impl GuidSource for FakeSource {
        fn guid_for_path(&self, path: &Path) -> Option<Guid> {
            self.0.get(path).cloned()
        }
    }

    fn item_kind() -> KindId {
        let mut kinds = KindRegistry::new();
        kinds.register("Potion", kinds.item_root())
    }

    #[test]
    fn test_sync_prefers_path_guid() {
        let path_guid = Guid::random();
        let source = FakeSource(HashMap::from([(PathBuf::from("a/b.item.json"), path_guid.clone())]));

        let mut item = Item::new("healing", item_kind());
        item.set_asset_path("a/b.item.json");
        assert!(item.sync_guid(&source));
        assert_eq!(item.guid(), &path_guid);
        assert!(item.is_dirty());
    }

    #[test]
    fn test_sync_falls_back_to_random() {
        let source = FakeSource(HashMap::new());
        let mut item = Item::new("healing", item_kind());
        assert!(item.sync_guid(&source));
        assert!(!item.guid().is_nil());
    }

    #[test]
    fn test_sync_is_idempotent() {
        let source = FakeSource(HashMap::new());
        let mut item = Item::new("healing", item_kind());
        item.sync_guid(&source);
        let first = item.guid().clone();
        assert!(!item.sync_guid(&source));
        assert_eq!(item.guid(), &first);
    }

    #[test]
    fn test_generate_new_guid_changes_identity() {
        let source = FakeSource(HashMap::new());
        let mut item = Item::new("healing", item_kind());
        item.sync_guid(&source);
        let before = item.guid().clone();
        item.generate_new_guid();
        assert_ne!(item.guid(), &before);
        assert!(!item.guid().is_nil());
    }

    #[test]
    fn test_set_asset_path_marks_dirty_on_change() {
        let mut item = Item::new("healing", item_kind());
        assert!(!item.is_dirty());

        item.set_asset_path("a/b.item.json");
        assert!(item.is_dirty());

        // Re-assigning the same path is not a change.
        item.take_dirty();
        item.set_asset_path("a/b.item.json");
        assert!(!item.is_dirty());
    }

    #[test]
    fn test_sort_order_matches_guid_strings() {
        let kind = item_kind();
        let mut items: Vec<Item> = ["c0ffee", "0ddba11", "beefed"]
            .iter()
            .map(|g| {
                Item::from_parts(Guid::from(*g), kind, g.to_string(), None, None, Value::Null)
            })
            .collect();
        items.sort();
        let sorted: Vec<&str> = items.iter().map(|i| i.guid().as_str()).collect();
        assert_eq!(sorted, vec!["0ddba11", "beefed", "c0ffee"]);
    }
}
