//! Curio Editor
//!
//! Editor-side glue over the registry: the session object that owns the
//! store, kind table, and registry for one editor process, plus the fold-out
//! state cache backing inspector UIs.

pub mod foldout;
pub mod session;

pub use foldout::FoldoutCache;
pub use session::EditorSession;
