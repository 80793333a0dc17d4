//! Asset store seam
//!
//! The host's persistent object store, abstracted: something that can
//! enumerate live assets by declared kind, load and save collection and item
//! records, and map asset paths to stable GUIDs. Implementations live in
//! `curio_store`.

use crate::collection::Collection;
use crate::guid::Guid;
use crate::item::{GuidSource, Item};
use crate::kind::{KindId, KindRegistry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("asset {guid} not found in store")]
    Missing { guid: Guid },

    #[error("asset {guid} is not a {expected}")]
    WrongAssetType { guid: Guid, expected: &'static str },

    #[error("unknown kind '{name}' (not registered in the kind table)")]
    UnknownKind { name: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Persisted registry snapshot: the ordered set of collection GUIDs the
/// registry should embed at build time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub collections: Vec<Guid>,
}

/// Host persistence substrate. The registry only observes and indexes what
/// the store reports; it never owns the underlying storage.
pub trait AssetStore: GuidSource {
    /// GUIDs of every live asset whose declared kind is exactly `kind`.
    fn find_assets(&self, kind: KindId, kinds: &KindRegistry) -> Vec<Guid>;

    /// Whether an asset with this GUID currently exists.
    fn contains(&self, guid: &Guid) -> bool;

    fn load_collection(
        &self,
        guid: &Guid,
        kinds: &KindRegistry,
    ) -> Result<Collection, StoreError>;

    fn load_item(&self, guid: &Guid, kinds: &KindRegistry) -> Result<Item, StoreError>;

    fn save_collection(
        &mut self,
        collection: &Collection,
        kinds: &KindRegistry,
    ) -> Result<(), StoreError>;

    fn save_item(&mut self, item: &Item, kinds: &KindRegistry) -> Result<(), StoreError>;

    /// Last persisted registry snapshot, if one exists.
    fn load_registry(&self) -> Result<Option<RegistrySnapshot>, StoreError>;

    fn save_registry(&mut self, snapshot: &RegistrySnapshot) -> Result<(), StoreError>;

    /// Explicit save point. Pending writes must be durable afterwards.
    fn flush(&mut self) -> Result<(), StoreError>;
}
