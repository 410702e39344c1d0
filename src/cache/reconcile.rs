// Incremental lines-of-code reconciliation.
// Pairs live repositories with cached records and re-scans only what changed.

use std::fmt;

use tracing::{info, warn};

use crate::error::Result;
use crate::github::{QueryCount, RepoSummary, Transport};
use crate::guard::CrashGuard;
use crate::history::scan_repository;

use super::store::{CacheFile, RepoCache, RepositoryRecord, ScanTotals};

/// Why the cached records could not be reused as they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    /// No usable cache file (missing or corrupt).
    Missing,
    /// The caller asked for a full refresh.
    Forced,
    /// Repositories were added or removed.
    CountChanged { cached: usize, live: usize },
    /// Same count, but the repository at `position` is not the one cached there.
    IdentityMismatch { position: usize },
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildReason::Missing => write!(f, "no usable cache"),
            RebuildReason::Forced => write!(f, "refresh forced"),
            RebuildReason::CountChanged { cached, live } => {
                write!(f, "repository count changed from {} to {}", cached, live)
            }
            RebuildReason::IdentityMismatch { position } => {
                write!(f, "repository at position {} changed identity", position)
            }
        }
    }
}

/// Decide whether `cached` can be paired positionally with `repos`.
pub fn rebuild_reason(
    cached: Option<&CacheFile>,
    repos: &[RepoSummary],
    force_refresh: bool,
) -> Option<RebuildReason> {
    if force_refresh {
        return Some(RebuildReason::Forced);
    }
    let Some(cached) = cached else {
        return Some(RebuildReason::Missing);
    };
    if cached.records.len() != repos.len() {
        return Some(RebuildReason::CountChanged {
            cached: cached.records.len(),
            live: repos.len(),
        });
    }
    repos
        .iter()
        .zip(&cached.records)
        .position(|(repo, record)| repo.identity_hash() != record.hash)
        .map(|position| RebuildReason::IdentityMismatch { position })
}

impl RepoCache {
    /// Bring the cache in line with `repos` and fold it into totals.
    ///
    /// Repositories whose live commit count matches their record are taken from the
    /// cache; the rest are re-scanned for commits by `author_id`. Repositories must be
    /// given in the remote's listing order, which has to be stable between runs for
    /// the positional pairing to hold.
    pub async fn reconcile<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        counter: &mut QueryCount,
        repos: &[RepoSummary],
        author_id: &str,
        force_refresh: bool,
        guard: &CrashGuard,
    ) -> Result<ScanTotals> {
        let cached = if force_refresh { None } else { self.load()? };
        let reason = rebuild_reason(cached.as_ref(), repos, force_refresh);

        let mut file = match (cached, reason) {
            (Some(file), None) => file,
            (_, reason) => {
                let reason = reason.unwrap_or(RebuildReason::Missing);
                info!(repos = repos.len(), "rebuilding lines-of-code cache: {}", reason);
                let records = repos
                    .iter()
                    .map(|repo| RepositoryRecord::unscanned(repo.identity_hash()))
                    .collect();
                CacheFile::new(self.comment_block()?, records)
            }
        };
        file.interrupted_at = None;
        guard.checkpoint(&file);

        let mut fully_cached = true;
        for (index, repo) in repos.iter().enumerate() {
            let record = &mut file.records[index];
            let live_count = match repo.commit_count {
                None => {
                    if !record.is_zero() {
                        warn!(
                            repo = %repo.name_with_owner,
                            "repository lists no history, resetting its record"
                        );
                        record.reset();
                    }
                    continue;
                }
                Some(count) if count == record.commit_count => continue,
                Some(count) => count,
            };

            fully_cached = false;
            info!(
                repo = %repo.name_with_owner,
                cached = record.commit_count,
                live = live_count,
                "scanning commit history"
            );
            let scan = scan_repository(
                &mut *transport,
                counter,
                repo.owner(),
                repo.name(),
                author_id,
                guard,
            )
            .await?;

            let record = &mut file.records[index];
            match scan {
                Some(scan) => record.update(live_count, &scan),
                None => {
                    warn!(
                        repo = %repo.name_with_owner,
                        commits = live_count,
                        "listed commits but history is unreachable, resetting its record"
                    );
                    record.reset();
                }
            }
            guard.checkpoint(&file);
        }

        self.save(&file)?;
        guard.checkpoint(&file);

        let totals = file.totals(fully_cached);
        info!(
            added = totals.lines_added,
            deleted = totals.lines_deleted,
            fully_cached = totals.was_fully_cached,
            "lines of code reconciled"
        );
        Ok(totals)
    }
}
