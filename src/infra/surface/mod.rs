//! Rendering surface adapters.

mod directory;
mod inspect;
mod memory;

pub use directory::{DirectorySurface, INDEX_FILE};
pub use inspect::{ElementEntry, LoadedDocument};
pub use memory::{LoadBehavior, MemorySurface};
