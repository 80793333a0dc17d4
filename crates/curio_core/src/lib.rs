//! Curio Core
//!
//! Fundamental catalogue types:
//! - GUID identity (32-hex string identifiers)
//! - Kind table (registered type hierarchy with assignability queries)
//! - Items and collections

pub mod collection;
pub mod guid;
pub mod item;
pub mod kind;
pub mod store;

pub use collection::Collection;
pub use guid::Guid;
pub use item::{GuidSource, Item};
pub use kind::{KindId, KindRegistry};
pub use store::{AssetStore, RegistrySnapshot, StoreError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
