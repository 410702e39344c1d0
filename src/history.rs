// Commit history scanner.
// Walks one repository's default branch and sums the lines authored by one account.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::Result;
use crate::github::queries;
use crate::github::types::{CommitNode, HistoryRepository, RepositoryEnvelope};
use crate::github::{Page, PageSource, QueryCount, QueryKind, Transport, walk_pages};
use crate::guard::CrashGuard;

/// Lines and commits credited to the scanning identity in one repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepoScan {
    pub additions: u64,
    pub deletions: u64,
    pub matching_commits: u64,
}

impl RepoScan {
    /// Fold the commits authored by `author_id`.
    pub fn from_commits<'c>(
        commits: impl IntoIterator<Item = &'c CommitNode>,
        author_id: &str,
    ) -> Self {
        commits
            .into_iter()
            .filter(|commit| commit.author_id() == Some(author_id))
            .fold(Self::default(), |mut scan, commit| {
                scan.additions += commit.additions;
                scan.deletions += commit.deletions;
                scan.matching_commits += 1;
                scan
            })
    }
}

/// Paged default-branch history of one repository.
struct CommitHistory<'a, T: ?Sized> {
    transport: &'a mut T,
    owner: &'a str,
    name: &'a str,
    /// The repository or its default branch could not be resolved.
    missing: bool,
}

#[async_trait(?Send)]
impl<'a, T: Transport + ?Sized> PageSource for CommitHistory<'a, T> {
    type Item = CommitNode;

    fn kind(&self) -> QueryKind {
        QueryKind::CommitHistory
    }

    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page<CommitNode>> {
        let variables = json!({
            "owner": self.owner,
            "repo_name": self.name,
            "cursor": cursor,
        });
        let data = self
            .transport
            .execute(&queries::COMMIT_HISTORY, variables)
            .await?;
        let envelope: RepositoryEnvelope<HistoryRepository> = serde_json::from_value(data)?;

        let history = envelope
            .repository
            .and_then(|repo| repo.default_branch_ref)
            .and_then(|branch| branch.target)
            .and_then(|target| target.history);

        match history {
            Some(history) => Ok(Page::from(history)),
            None => {
                self.missing = true;
                Ok(Page::empty())
            }
        }
    }
}

/// Scan `owner/name` for commits by `author_id`.
///
/// Returns `None` when the repository has no default branch (an empty repository, or
/// one whose branch disappeared mid-scan). On a failed page fetch the guard flushes its
/// last checkpoint before the error is returned, and nothing from the partial scan is
/// credited.
pub async fn scan_repository<T: Transport + ?Sized>(
    transport: &mut T,
    counter: &mut QueryCount,
    owner: &str,
    name: &str,
    author_id: &str,
    guard: &CrashGuard,
) -> Result<Option<RepoScan>> {
    let mut history = CommitHistory {
        transport,
        owner,
        name,
        missing: false,
    };

    let commits = match walk_pages(&mut history, counter).await {
        Ok(commits) => commits,
        Err(err) => {
            warn!(repo = %format!("{}/{}", owner, name), "history scan failed: {}", err);
            if let Err(flush_err) = guard.flush() {
                warn!("could not flush cache after failed scan: {}", flush_err);
            }
            return Err(err);
        }
    };

    if history.missing {
        debug!(owner, name, "no default branch");
        return Ok(None);
    }

    let scan = RepoScan::from_commits(&commits, author_id);
    debug!(
        owner,
        name,
        commits = commits.len(),
        matching = scan.matching_commits,
        "scanned history"
    );
    Ok(Some(scan))
}
