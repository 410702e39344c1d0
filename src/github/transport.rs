// Transport seam between the statistics engine and the GitHub GraphQL endpoint.
// Also tracks how many round-trips each kind of query has issued.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// Which query a round-trip belongs to, for request accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QueryKind {
    User,
    Followers,
    RepoStats,
    RepoList,
    CommitHistory,
    Contributions,
}

impl QueryKind {
    pub fn label(&self) -> &'static str {
        match self {
            QueryKind::User => "user",
            QueryKind::Followers => "followers",
            QueryKind::RepoStats => "repo_stats",
            QueryKind::RepoList => "repo_list",
            QueryKind::CommitHistory => "commit_history",
            QueryKind::Contributions => "contributions",
        }
    }
}

/// A GraphQL query document and the kind it is accounted under.
#[derive(Debug, Clone, Copy)]
pub struct Query {
    pub kind: QueryKind,
    pub text: &'static str,
}

impl Query {
    pub fn name(&self) -> &'static str {
        self.kind.label()
    }
}

/// Executes GraphQL queries and returns the `data` payload.
///
/// Implementations classify failures (unauthorized, rate limited, other) but never
/// retry; the engine treats every failure as fatal for the current run.
#[async_trait(?Send)]
pub trait Transport {
    async fn execute(&mut self, query: &Query, variables: Value) -> Result<Value>;
}

/// Execute a query and decode its payload into `T`.
pub async fn execute_as<T, D>(
    transport: &mut T,
    counter: &mut QueryCount,
    query: &Query,
    variables: Value,
) -> Result<D>
where
    T: Transport + ?Sized,
    D: DeserializeOwned,
{
    counter.record(query.kind);
    let data = transport.execute(query, variables).await?;
    Ok(serde_json::from_value(data)?)
}

/// Round-trips issued during a run, broken down by query kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryCount {
    by_kind: BTreeMap<QueryKind, u64>,
}

impl QueryCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: QueryKind) {
        *self.by_kind.entry(kind).or_insert(0) += 1;
    }

    pub fn get(&self, kind: QueryKind) -> u64 {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.by_kind.values().sum()
    }
}

impl fmt::Display for QueryCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} GitHub GraphQL API calls", self.total())?;
        for (kind, count) in &self.by_kind {
            write!(f, "\n  {:<16}{:>6}", format!("{}:", kind.label()), count)?;
        }
        Ok(())
    }
}
