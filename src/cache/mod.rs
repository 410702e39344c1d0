// Cache module for the incremental lines-of-code accounting.
// Stores per-repository commit counts and line totals so unchanged repositories are not re-scanned.

pub mod paths;
pub mod reconcile;
pub mod store;

pub use paths::{cache_dir, cache_file_path, identity_hash};
pub use reconcile::{RebuildReason, rebuild_reason};
pub use store::{
    CacheFile, RepoCache, RepositoryRecord, ScanTotals, flush, read_text, write_text,
};
