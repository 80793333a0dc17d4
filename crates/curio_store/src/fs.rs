//! File-backed asset store
//!
//! A root directory scanned recursively for `*.collection.json` and
//! `*.item.json` records. Every asset file gets a `.meta` sidecar holding
//! its GUID, written on first scan (the import step), so identity survives
//! renames of the record contents and re-opens of the store.

use crate::records::{CollectionRecord, ItemRecord};
use curio_core::{
    AssetStore, Collection, Guid, GuidSource, Item, KindId, KindRegistry, RegistrySnapshot,
    StoreError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const COLLECTION_SUFFIX: &str = ".collection.json";
const ITEM_SUFFIX: &str = ".item.json";
const META_SUFFIX: &str = ".meta";
const REGISTRY_FILE: &str = "registry.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetType {
    Collection,
    Item,
}

struct Entry {
    rel_path: PathBuf,
    kind: String,
    asset_type: AssetType,
}

#[derive(Serialize, Deserialize)]
struct MetaRecord {
    guid: Guid,
}

pub struct FsStore {
    root: PathBuf,
    entries: HashMap<Guid, Entry>,
    path_index: HashMap<PathBuf, Guid>,
}

impl FsStore {
    /// Open (creating if necessary) a store rooted at `root` and index its
    /// contents.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let mut store = Self {
            root,
            entries: HashMap::new(),
            path_index: HashMap::new(),
        };
        store.refresh_index()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-walk the root directory, picking up assets created, deleted, or
    /// moved out-of-band. Sidecars are created for newly seen files; a file
    /// whose sidecar GUID collides with an already-indexed asset (a raw file
    /// copy) gets a fresh identity.
    pub fn refresh_index(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        self.path_index.clear();

        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut children: Vec<PathBuf> = fs::read_dir(&dir)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .collect();
            children.sort();

            for path in children {
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Some(asset_type) = asset_type_of(&path) else {
                    continue;
                };
                if let Err(error) = self.index_file(&path, asset_type) {
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable asset");
                }
            }
        }
        Ok(())
    }

    fn index_file(&mut self, path: &Path, asset_type: AssetType) -> Result<(), StoreError> {
        let text = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        let kind = value
            .get("kind")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_owned();

        let mut guid = self.read_or_create_meta(path)?;
        if self.entries.contains_key(&guid) {
            // Two files share a sidecar GUID (raw copy); re-import the later
            // one under a fresh identity.
            tracing::warn!(path = %path.display(), %guid, "duplicate sidecar GUID, reassigning");
            guid = Guid::random();
            write_meta(path, &guid)?;
        }

        let rel_path = self.relative(path);
        self.path_index.insert(rel_path.clone(), guid.clone());
        self.entries.insert(
            guid,
            Entry {
                rel_path,
                kind,
                asset_type,
            },
        );
        Ok(())
    }

    fn read_or_create_meta(&self, path: &Path) -> Result<Guid, StoreError> {
        let meta_path = meta_path_of(path);
        if meta_path.exists() {
            let record: MetaRecord = serde_json::from_str(&fs::read_to_string(&meta_path)?)?;
            if !record.guid.is_nil() {
                return Ok(record.guid);
            }
        }
        let guid = Guid::random();
        write_meta(path, &guid)?;
        Ok(guid)
    }

    /// Unique kind names of collection assets currently on disk. Lets tools
    /// without compile-time kind knowledge populate a flat kind table.
    pub fn discovered_collection_kinds(&self) -> Vec<String> {
        self.discovered_kinds(AssetType::Collection)
    }

    /// Unique kind names of item assets currently on disk.
    pub fn discovered_item_kinds(&self) -> Vec<String> {
        self.discovered_kinds(AssetType::Item)
    }

    fn discovered_kinds(&self, asset_type: AssetType) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.asset_type == asset_type && !entry.kind.is_empty())
            .map(|entry| entry.kind.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }

    fn absolute(&self, rel_path: &Path) -> PathBuf {
        self.root.join(rel_path)
    }

    fn entry(&self, guid: &Guid, expected: AssetType) -> Result<&Entry, StoreError> {
        let entry = self
            .entries
            .get(guid)
            .ok_or_else(|| StoreError::Missing { guid: guid.clone() })?;
        if entry.asset_type != expected {
            return Err(StoreError::WrongAssetType {
                guid: guid.clone(),
                expected: match expected {
                    AssetType::Collection => "collection",
                    AssetType::Item => "item",
                },
            });
        }
        Ok(entry)
    }

    fn write_asset(
        &mut self,
        rel_path: &Path,
        guid: &Guid,
        kind: String,
        asset_type: AssetType,
        json: String,
    ) -> Result<(), StoreError> {
        let path = self.absolute(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, json)?;
        write_meta(&path, guid)?;

        if let Some(old) = self.path_index.insert(rel_path.to_path_buf(), guid.clone()) {
            if &old != guid {
                self.entries.remove(&old);
            }
        }
        self.entries.insert(
            guid.clone(),
            Entry {
                rel_path: rel_path.to_path_buf(),
                kind,
                asset_type,
            },
        );
        Ok(())
    }
}

fn asset_type_of(path: &Path) -> Option<AssetType> {
    let name = path.file_name()?.to_str()?;
    if name.ends_with(COLLECTION_SUFFIX) {
        Some(AssetType::Collection)
    } else if name.ends_with(ITEM_SUFFIX) {
        Some(AssetType::Item)
    } else {
        None
    }
}

fn meta_path_of(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(META_SUFFIX);
    path.with_file_name(name)
}

fn write_meta(path: &Path, guid: &Guid) -> Result<(), StoreError> {
    let record = MetaRecord { guid: guid.clone() };
    fs::write(meta_path_of(path), serde_json::to_string_pretty(&record)?)?;
    Ok(())
}

impl GuidSource for FsStore {
    fn guid_for_path(&self, path: &Path) -> Option<Guid> {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        self.path_index.get(rel).cloned()
    }
}

impl AssetStore for FsStore {
    fn find_assets(&self, kind: KindId, kinds: &KindRegistry) -> Vec<Guid> {
        let name = kinds.name(kind);
        let mut found: Vec<(&PathBuf, &Guid)> = self
            .path_index
            .iter()
            .filter_map(|(path, guid)| {
                let entry = self.entries.get(guid)?;
                (entry.kind == name).then_some((path, guid))
            })
            .collect();
        found.sort();
        found.into_iter().map(|(_, guid)| guid.clone()).collect()
    }

    fn contains(&self, guid: &Guid) -> bool {
        self.entries.contains_key(guid)
    }

    fn load_collection(
        &self,
        guid: &Guid,
        kinds: &KindRegistry,
    ) -> Result<Collection, StoreError> {
        let entry = self.entry(guid, AssetType::Collection)?;
        let text = fs::read_to_string(self.absolute(&entry.rel_path))?;
        let record: CollectionRecord = serde_json::from_str(&text)?;

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
            Some(entry.rel_path.clone()),
        ))
    }

    fn load_item(&self, guid: &Guid, kinds: &KindRegistry) -> Result<Item, StoreError> {
        let entry = self.entry(guid, AssetType::Item)?;
        let text = fs::read_to_string(self.absolute(&entry.rel_path))?;
        let record: ItemRecord = serde_json::from_str(&text)?;
        record.into_item(guid.clone(), Some(entry.rel_path.clone()), kinds)
    }

    fn save_collection(
        &mut self,
        collection: &Collection,
        kinds: &KindRegistry,
    ) -> Result<(), StoreError> {
        let record = CollectionRecord::from_collection(collection, kinds);
        let rel_path = collection
            .asset_path()
            .map(|p| self.relative(p))
            .unwrap_or_else(|| PathBuf::from(format!("{}{}", collection.name(), COLLECTION_SUFFIX)));
        let json = serde_json::to_string_pretty(&record)?;
        self.write_asset(
            &rel_path,
            collection.guid(),
            record.kind,
            AssetType::Collection,
            json,
        )
    }

    fn save_item(&mut self, item: &Item, kinds: &KindRegistry) -> Result<(), StoreError> {
        let record = ItemRecord::from_item(item, kinds);
        let rel_path = item
            .asset_path()
            .map(|p| self.relative(p))
            .unwrap_or_else(|| PathBuf::from(format!("{}{}", item.name(), ITEM_SUFFIX)));
        let json = serde_json::to_string_pretty(&record)?;
        self.write_asset(&rel_path, item.guid(), record.kind, AssetType::Item, json)
    }

    fn load_registry(&self) -> Result<Option<RegistrySnapshot>, StoreError> {
        let path = self.root.join(REGISTRY_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let snapshot: RegistrySnapshot = serde_json::from_str(&fs::read_to_string(path)?)?;
        Ok(Some(snapshot))
    }

    fn save_registry(&mut self, snapshot: &RegistrySnapshot) -> Result<(), StoreError> {
        fs::write(
            self.root.join(REGISTRY_FILE),
            serde_json::to_string_pretty(snapshot)?,
        )?;
        Ok(())
    }

    // Writes land synchronously; the save point has nothing left to do.
    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curio_core::KindRegistry;

    fn kinds() -> (KindRegistry, KindId, KindId) {
        let mut kinds = KindRegistry::new();
        let collection_kind = kinds.register("TileCollection", kinds.collection_root());
        let item_kind = kinds.register("Tile", kinds.item_root());
        (kinds, collection_kind, item_kind)
    }

    fn saved_fixture(root: &Path) -> (KindRegistry, Guid, Guid) {
        let (kinds, collection_kind, item_kind) = kinds();
        let mut store = FsStore::open(root).unwrap();

        let mut item = Item::new("grass", item_kind);
        item.generate_new_guid();
        let mut collection = Collection::new("tiles", collection_kind, item_kind);
        collection.generate_new_guid();
        collection.add_item(item.clone());

        store.save_item(&item, &kinds).unwrap();
        store.save_collection(&collection, &kinds).unwrap();
        (kinds, collection.guid().clone(), item.guid().clone())
    }

    #[test]
    fn test_save_then_reopen_preserves_guids() {
        let dir = tempfile::tempdir().unwrap();
        let (kinds, collection_guid, item_guid) = saved_fixture(dir.path());

        let reopened = FsStore::open(dir.path()).unwrap();
        assert!(reopened.contains(&collection_guid));
        assert!(reopened.contains(&item_guid));

        let loaded = reopened.load_collection(&collection_guid, &kinds).unwrap();
        assert_eq!(loaded.name(), "tiles");
        assert_eq!(loaded.items()[0].guid(), &item_guid);
    }

    #[test]
    fn test_sidecar_assigns_guid_to_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loose.item.json");
        fs::write(&path, r#"{"name":"loose","kind":"Tile"}"#).unwrap();

        let store = FsStore::open(dir.path()).unwrap();
        let guid = store.guid_for_path(Path::new("loose.item.json")).unwrap();
        assert!(!guid.is_nil());

        // Identity is stable across re-opens.
        let reopened = FsStore::open(dir.path()).unwrap();
        assert_eq!(
            reopened.guid_for_path(Path::new("loose.item.json")),
            Some(guid)
        );
    }

    #[test]
    fn test_duplicate_sidecar_reassigned_on_scan() {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, item_guid) = saved_fixture(dir.path());

        // Raw file copy including the sidecar.
        fs::copy(
            dir.path().join("grass.item.json"),
            dir.path().join("copy.item.json"),
        )
        .unwrap();
        fs::copy(
            dir.path().join("grass.item.json.meta"),
            dir.path().join("copy.item.json.meta"),
        )
        .unwrap();

        let store = FsStore::open(dir.path()).unwrap();
        let copy_guid = store.guid_for_path(Path::new("copy.item.json")).unwrap();
        let original_guid = store.guid_for_path(Path::new("grass.item.json")).unwrap();
        assert_ne!(copy_guid, original_guid);
        assert!(copy_guid == item_guid || original_guid == item_guid);
    }

    #[test]
    fn test_refresh_index_sees_out_of_band_delete() {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, item_guid) = saved_fixture(dir.path());

        let mut store = FsStore::open(dir.path()).unwrap();
        assert!(store.contains(&item_guid));

        fs::remove_file(dir.path().join("grass.item.json")).unwrap();
        store.refresh_index().unwrap();
        assert!(!store.contains(&item_guid));
    }

    #[test]
    fn test_discovered_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let (_, _, _) = saved_fixture(dir.path());

        let store = FsStore::open(dir.path()).unwrap();
        assert_eq!(store.discovered_collection_kinds(), vec!["TileCollection"]);
        assert_eq!(store.discovered_item_kinds(), vec!["Tile"]);
    }

    #[test]
    fn test_registry_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsStore::open(dir.path()).unwrap();
        assert!(store.load_registry().unwrap().is_none());

        let snapshot = RegistrySnapshot {
            collections: vec![Guid::random(), Guid::random()],
        };
        store.save_registry(&snapshot).unwrap();
        assert_eq!(store.load_registry().unwrap(), Some(snapshot));
    }
}
