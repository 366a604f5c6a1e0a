pub mod index;
pub mod progress;
pub mod rebuild;
pub mod trash;

pub use index::{IndexEntry, IndexStats, LibraryIndex};
pub use progress::{ProgressState, ProgressStore, RunStats};
pub use rebuild::{rebuild_index, RebuildStats};
pub use trash::{Trash, TrashRecord};
