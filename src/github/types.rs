// GitHub GraphQL response types.
// Defines structs for deserializing GraphQL payloads and the repository listing entry.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::cache::identity_hash;

/// Top-level GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

/// One entry of the GraphQL `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}

impl GraphQlError {
    pub fn is_rate_limited(&self) -> bool {
        self.error_type.as_deref() == Some("RATE_LIMITED")
    }
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimit {
    pub limit: u64,
    /// `None` when the last response carried no quota header.
    pub remaining: Option<u64>,
    pub reset: u64,
    pub retry_after: Option<u64>,
}

impl RateLimit {
    /// Whether the last response said the quota is spent or asked us to back off.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0) || self.retry_after.is_some()
    }

    /// Human-readable reset time, or the retry-after delay when that is all we have.
    pub fn reset_display(&self) -> String {
        if let Some(secs) = self.retry_after {
            return format!("+{}s", secs);
        }
        DateTime::from_timestamp(self.reset as i64, 0)
            .filter(|_| self.reset > 0)
            .map(|dt| dt.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Relay-style page information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// Relay-style paginated connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Connection<T> {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    pub fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|edge| edge.node).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: u64,
}

/// Wrapper for queries rooted at `user(login:)`.
#[derive(Debug, Deserialize)]
pub struct UserEnvelope<T> {
    pub user: Option<T>,
}

/// Wrapper for queries rooted at `repository(owner:, name:)`.
#[derive(Debug, Deserialize)]
pub struct RepositoryEnvelope<T> {
    pub repository: Option<T>,
}

/// The account whose statistics are collected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNode {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct FollowersNode {
    pub followers: TotalCount,
}

#[derive(Debug, Deserialize)]
pub struct RepositoriesNode<T> {
    pub repositories: Connection<T>,
}

/// Repository entry of the stars/count listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoStarsNode {
    pub name_with_owner: String,
    pub stargazers: TotalCount,
}

/// Repository entry of the lines-of-code listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoListNode {
    pub name_with_owner: String,
    pub default_branch_ref: Option<BranchRef<HistoryTotal>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchRef<T> {
    pub target: Option<T>,
}

/// A `... on Commit` target; non-commit targets deserialize with no history.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryTotal {
    #[serde(default)]
    pub history: Option<TotalCount>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRepository {
    pub default_branch_ref: Option<BranchRef<HistoryPage>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub history: Option<Connection<CommitNode>>,
}

/// One commit on the default branch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitNode {
    pub committed_date: Option<DateTime<Utc>>,
    pub author: Option<CommitAuthor>,
    pub additions: u64,
    pub deletions: u64,
}

impl CommitNode {
    /// Node id of the GitHub user linked to the commit author, if any.
    pub fn author_id(&self) -> Option<&str> {
        self.author
            .as_ref()
            .and_then(|a| a.user.as_ref())
            .map(|u| u.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    pub user: Option<AuthorUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorUser {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsNode {
    pub contributions_collection: ContributionsCollection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsCollection {
    pub contribution_calendar: ContributionCalendar,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionCalendar {
    pub total_contributions: u64,
}

/// A live repository as seen by the lines-of-code listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSummary {
    /// `owner/name`.
    pub name_with_owner: String,
    /// Commits on the default branch; `None` when no history is retrievable.
    pub commit_count: Option<u64>,
}

impl RepoSummary {
    pub fn new(name_with_owner: impl Into<String>, commit_count: Option<u64>) -> Self {
        Self {
            name_with_owner: name_with_owner.into(),
            commit_count,
        }
    }

    pub fn owner(&self) -> &str {
        self.name_with_owner
            .split_once('/')
            .map(|(owner, _)| owner)
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.name_with_owner
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.name_with_owner)
    }

    /// Stable cache key for this repository.
    pub fn identity_hash(&self) -> String {
        identity_hash(&self.name_with_owner)
    }
}

impl From<RepoListNode> for RepoSummary {
    fn from(node: RepoListNode) -> Self {
        let commit_count = node
            .default_branch_ref
            .and_then(|branch| branch.target)
            .and_then(|target| target.history)
            .map(|history| history.total_count);
        Self {
            name_with_owner: node.name_with_owner,
            commit_count,
        }
    }
}
