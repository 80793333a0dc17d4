//! Curio Registry
//!
//! The process-wide directory of collections: registration, lookup by
//! name/GUID/item kind, GUID collision repair, bulk reindexing against the
//! asset store, and the pre/post-build pack-unpack pair.
//!
//! The registry is an explicit context object owned by the embedding editor
//! session, not an ambient global.

pub mod registry;
pub mod reload;

pub use registry::CollectionsRegistry;
pub use reload::ReloadReport;
