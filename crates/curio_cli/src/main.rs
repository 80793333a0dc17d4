//! Curio CLI
//!
//! Opens a store directory, reconciles the registry against it (repairing
//! GUID collisions along the way), prints the catalogue, and persists any
//! repairs.

use anyhow::{Context, Result};
use curio_core::KindRegistry;
use curio_editor::EditorSession;
use curio_store::FsStore;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let root = std::env::args().nth(1).unwrap_or_else(|| ".".to_owned());
    tracing::info!("Curio v{}", curio_core::VERSION);

    let store = FsStore::open(&root).with_context(|| format!("opening asset store at {root}"))?;

    // No compile-time kind knowledge here: build a flat kind table from
    // whatever the store reports on disk.
    let mut kinds = KindRegistry::new();
    let collection_root = kinds.collection_root();
    let item_root = kinds.item_root();
    for name in store.discovered_collection_kinds() {
        kinds.register(&name, collection_root);
    }
    for name in store.discovered_item_kinds() {
        kinds.register(&name, item_root);
    }

    let mut session = EditorSession::new(store, kinds);
    let report = session.on_load().context("reloading registry")?;
    tracing::info!(
        added = report.added.len(),
        removed = report.removed.len(),
        "registry reconciled"
    );

    for collection in session.registry().collections() {
        println!(
            "{} [{}] ({}, {} items, auto-load: {})",
            collection.name(),
            collection.guid(),
            session.kinds().name(collection.kind()),
            collection.len(),
            collection.automatically_loaded(),
        );
        for item in collection.items() {
            println!("  {} {}", item.guid(), item.name());
        }
    }

    if session.save().context("persisting repairs")? {
        tracing::info!("persisted GUID repairs");
    }

    Ok(())
}
