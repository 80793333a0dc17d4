//! Curio Store
//!
//! Implementations of the `curio_core::AssetStore` seam:
//! - `FsStore`: a directory of JSON asset records with `.meta` GUID sidecars
//! - `MemoryStore`: HashMap-backed store for tests and headless embedding

pub mod fs;
pub mod memory;
pub mod records;

pub use fs::FsStore;
pub use memory::MemoryStore;
pub use records::{CollectionRecord, ItemRecord};
