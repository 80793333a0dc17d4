//! On-disk record formats
//!
//! Kinds persist by name (the kind table only exists in memory), item
//! membership persists as an ordered GUID list. GUIDs themselves live in the
//! store's path index, not inside the records.

use curio_core::{Collection, Guid, Item, KindRegistry, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_true() -> bool {
    true
}

/// Persisted form of a [`Collection`], minus its identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub name: String,
    pub kind: String,
    pub item_kind: String,
    #[serde(default = "default_true")]
    pub automatically_loaded: bool,
    #[serde(default)]
    pub items: Vec<Guid>,
}

impl CollectionRecord {
    pub fn from_collection(collection: &Collection, kinds: &KindRegistry) -> Self {
        Self {
            name: collection.name().to_owned(),
            kind: kinds.name(collection.kind()).to_owned(),
            item_kind: kinds.name(collection.item_kind()).to_owned(),
            automatically_loaded: collection.automatically_loaded(),
            items: collection
                .items()
                .iter()
                .map(|item| item.guid().clone())
                .collect(),
        }
    }
}

/// Persisted form of an [`Item`], minus its identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<Guid>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl ItemRecord {
    pub fn from_item(item: &Item, kinds: &KindRegistry) -> Self {
        Self {
            name: item.name().to_owned(),
            kind: kinds.name(item.kind()).to_owned(),
            collection: item.collection_guid().cloned(),
            payload: item.payload().clone(),
        }
    }

    /// Rehydrate with the identity the store tracks for this record.
    pub fn into_item(
        self,
        guid: Guid,
        asset_path: Option<std::path::PathBuf>,
        kinds: &KindRegistry,
    ) -> Result<Item, StoreError> {
        let kind = kinds
            .kind_by_name(&self.kind)
            .ok_or(StoreError::UnknownKind { name: self.kind })?;
        Ok(Item::from_parts(
            guid,
            kind,
            self.name,
            self.collection,
            asset_path,
            self.payload,
        ))
    }
}
