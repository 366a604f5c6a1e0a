pub mod analyze;
pub mod config;
pub mod criteria;
pub mod dates;
pub mod delete;
pub mod error;
pub mod remote;
pub mod store;
pub mod sync;
pub mod util;

pub use analyze::{DuplicateGroup, QualityAnalyzer, QualityReport};
pub use config::{AnalyzeConfig, Config, DeleteConfig, SyncConfig};
pub use criteria::{default_rules, evaluate, CandidateReport, DeletionCandidate, Rule};
pub use delete::{DeletionExecutor, DeletionPlan, DeletionReport, ExecutorState};
pub use error::{MiraError, Result};
pub use remote::{rclone::RcloneRemote, ItemKind, RemoteError, RemoteItem, RemoteLibrary};
pub use store::{
    rebuild_index, IndexEntry, IndexStats, LibraryIndex, ProgressState, ProgressStore,
    RebuildStats, RunStats, Trash, TrashRecord,
};
pub use sync::{refresh::refresh_metadata, SyncEngine, SyncOptions, SyncReport, Termination};
pub use util::interrupt::CancelToken;
