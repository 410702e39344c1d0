// In-memory GitHub GraphQL stand-in for tests.
// Serves paginated canned repositories and commits, and records every history request.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{Result, StatError};

use super::transport::{Query, QueryKind, Transport};

#[derive(Debug, Clone)]
pub struct FakeCommit {
    pub author_id: Option<String>,
    pub additions: u64,
    pub deletions: u64,
}

impl FakeCommit {
    pub fn by(author_id: &str, additions: u64, deletions: u64) -> Self {
        Self {
            author_id: Some(author_id.to_string()),
            additions,
            deletions,
        }
    }

    /// A commit whose author email is not linked to any account.
    pub fn unlinked(additions: u64, deletions: u64) -> Self {
        Self {
            author_id: None,
            additions,
            deletions,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeRepo {
    pub name_with_owner: String,
    pub stars: u64,
    pub commits: Vec<FakeCommit>,
    pub has_default_branch: bool,
    /// Listing reports a commit count but the history query finds no branch.
    pub history_vanishes: bool,
}

impl FakeRepo {
    pub fn new(name_with_owner: &str) -> Self {
        Self {
            name_with_owner: name_with_owner.to_string(),
            stars: 0,
            commits: Vec::new(),
            has_default_branch: true,
            history_vanishes: false,
        }
    }

    pub fn stars(mut self, stars: u64) -> Self {
        self.stars = stars;
        self
    }

    pub fn commits(mut self, commits: Vec<FakeCommit>) -> Self {
        self.commits = commits;
        self
    }

    /// A repository with no default branch.
    pub fn empty(mut self) -> Self {
        self.has_default_branch = false;
        self.commits.clear();
        self
    }

    fn listing_node(&self) -> Value {
        let branch = if self.has_default_branch {
            json!({ "target": { "history": { "totalCount": self.commits.len() } } })
        } else {
            Value::Null
        };
        json!({
            "nameWithOwner": self.name_with_owner,
            "stargazers": { "totalCount": self.stars },
            "defaultBranchRef": branch,
        })
    }
}

/// Fake GitHub account with repositories.
#[derive(Debug, Clone)]
pub struct FakeGitHub {
    pub login: String,
    pub user_id: String,
    pub followers: u64,
    pub contributions: u64,
    pub repos: Vec<FakeRepo>,
    pub repo_page_size: usize,
    pub history_page_size: usize,
    /// Fail history requests for `owner/name` once this many of its pages were served.
    pub fail_history_after: Option<(String, u32)>,
    /// Like `fail_history_after`, but the request never completes.
    pub stall_history_after: Option<(String, u32)>,
    /// History round-trips per `owner/name`.
    pub history_calls: HashMap<String, u32>,
}

impl FakeGitHub {
    pub fn new(login: &str, user_id: &str) -> Self {
        Self {
            login: login.to_string(),
            user_id: user_id.to_string(),
            followers: 0,
            contributions: 0,
            repos: Vec::new(),
            repo_page_size: 60,
            history_page_size: 100,
            fail_history_after: None,
            stall_history_after: None,
            history_calls: HashMap::new(),
        }
    }

    pub fn add_repo(&mut self, repo: FakeRepo) {
        self.repos.push(repo);
    }

    pub fn repo_mut(&mut self, name_with_owner: &str) -> &mut FakeRepo {
        self.repos
            .iter_mut()
            .find(|r| r.name_with_owner == name_with_owner)
            .expect("unknown fake repository")
    }

    pub fn history_calls_for(&self, name_with_owner: &str) -> u32 {
        self.history_calls
            .get(name_with_owner)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_history_calls(&self) -> u32 {
        self.history_calls.values().sum()
    }

    pub fn reset_calls(&mut self) {
        self.history_calls.clear();
    }

    fn user(&self, variables: &Value, body: Value) -> Value {
        if variables["login"] == self.login.as_str() {
            json!({ "user": body })
        } else {
            json!({ "user": null })
        }
    }

    fn page_bounds(cursor: &Value, len: usize, size: usize) -> (usize, usize) {
        let start = cursor
            .as_str()
            .and_then(|c| c.parse::<usize>().ok())
            .unwrap_or(0);
        (start, (start + size).min(len))
    }

    fn repositories(&self, variables: &Value) -> Value {
        let (start, end) = Self::page_bounds(
            &variables["cursor"],
            self.repos.len(),
            self.repo_page_size,
        );
        let edges: Vec<Value> = self.repos[start..end]
            .iter()
            .map(|repo| json!({ "node": repo.listing_node() }))
            .collect();
        self.user(
            variables,
            json!({
                "repositories": {
                    "totalCount": self.repos.len(),
                    "edges": edges,
                    "pageInfo": {
                        "endCursor": end.to_string(),
                        "hasNextPage": end < self.repos.len(),
                    }
                }
            }),
        )
    }

    /// Count a history request, returning the repository and its 1-based request number.
    fn record_history_call(&mut self, variables: &Value) -> (String, u32) {
        let name_with_owner = format!(
            "{}/{}",
            variables["owner"].as_str().unwrap_or_default(),
            variables["repo_name"].as_str().unwrap_or_default()
        );
        let calls = self
            .history_calls
            .entry(name_with_owner.clone())
            .or_insert(0);
        *calls += 1;
        let calls = *calls;
        (name_with_owner, calls)
    }

    fn trips(rule: &Option<(String, u32)>, name_with_owner: &str, call: u32) -> bool {
        rule.as_ref()
            .is_some_and(|(name, served)| name == name_with_owner && call > *served)
    }

    fn history(&self, name_with_owner: &str, variables: &Value) -> Result<Value> {

        let Some(repo) = self
            .repos
            .iter()
            .find(|r| r.name_with_owner == name_with_owner)
        else {
            return Ok(json!({ "repository": null }));
        };
        if !repo.has_default_branch || repo.history_vanishes {
            return Ok(json!({ "repository": { "defaultBranchRef": null } }));
        }

        let (start, end) = Self::page_bounds(
            &variables["cursor"],
            repo.commits.len(),
            self.history_page_size,
        );
        let edges: Vec<Value> = repo.commits[start..end]
            .iter()
            .map(|commit| {
                let user = match &commit.author_id {
                    Some(id) => json!({ "id": id }),
                    None => Value::Null,
                };
                json!({
                    "node": {
                        "committedDate": "2024-05-01T12:00:00Z",
                        "author": { "user": user },
                        "additions": commit.additions,
                        "deletions": commit.deletions,
                    }
                })
            })
            .collect();

        Ok(json!({
            "repository": {
                "defaultBranchRef": {
                    "target": {
                        "history": {
                            "totalCount": repo.commits.len(),
                            "edges": edges,
                            "pageInfo": {
                                "endCursor": end.to_string(),
                                "hasNextPage": end < repo.commits.len(),
                            }
                        }
                    }
                }
            }
        }))
    }
}

#[async_trait(?Send)]
impl Transport for FakeGitHub {
    async fn execute(&mut self, query: &Query, variables: Value) -> Result<Value> {
        match query.kind {
            QueryKind::User => Ok(self.user(
                &variables,
                json!({ "id": self.user_id, "createdAt": "2015-03-04T05:06:07Z" }),
            )),
            QueryKind::Followers => Ok(self.user(
                &variables,
                json!({ "followers": { "totalCount": self.followers } }),
            )),
            QueryKind::Contributions => Ok(self.user(
                &variables,
                json!({
                    "contributionsCollection": {
                        "contributionCalendar": { "totalContributions": self.contributions }
                    }
                }),
            )),
            QueryKind::RepoStats | QueryKind::RepoList => Ok(self.repositories(&variables)),
            QueryKind::CommitHistory => {
                let (name_with_owner, call) = self.record_history_call(&variables);
                if Self::trips(&self.stall_history_after, &name_with_owner, call) {
                    std::future::pending::<()>().await;
                }
                if Self::trips(&self.fail_history_after, &name_with_owner, call) {
                    return Err(StatError::RateLimited {
                        reset_at: "12:34:56".to_string(),
                    });
                }
                self.history(&name_with_owner, &variables)
            }
        }
    }
}
