// Typed GitHub GraphQL operations.
// Single round-trip queries plus the paginated repository listings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::error::{Result, StatError};

use super::paginate::{Page, PageSource, walk_pages};
use super::queries;
use super::transport::{Query, QueryCount, QueryKind, Transport, execute_as};
use super::types::{
    ContributionsNode, FollowersNode, RepoListNode, RepoStarsNode, RepoSummary, RepositoriesNode,
    UserEnvelope, UserNode,
};

/// Repository ownership filter understood by `ownerAffiliations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Affiliation {
    Owner,
    Collaborator,
    OrganizationMember,
}

impl Affiliation {
    /// Every affiliation, used for contributed repositories and lines of code.
    pub const ALL: [Affiliation; 3] = [
        Affiliation::Owner,
        Affiliation::Collaborator,
        Affiliation::OrganizationMember,
    ];
}

fn missing_user(query: &Query, login: &str) -> StatError {
    StatError::GraphQl {
        query: query.name(),
        message: format!("no user named {}", login),
    }
}

/// Look up the account id and creation date for `login`.
pub async fn fetch_user<T: Transport + ?Sized>(
    transport: &mut T,
    counter: &mut QueryCount,
    login: &str,
) -> Result<UserNode> {
    let envelope: UserEnvelope<UserNode> =
        execute_as(transport, counter, &queries::USER, json!({ "login": login })).await?;
    envelope
        .user
        .ok_or_else(|| missing_user(&queries::USER, login))
}

/// Number of followers of `login`.
pub async fn fetch_followers<T: Transport + ?Sized>(
    transport: &mut T,
    counter: &mut QueryCount,
    login: &str,
) -> Result<u64> {
    let envelope: UserEnvelope<FollowersNode> = execute_as(
        transport,
        counter,
        &queries::FOLLOWERS,
        json!({ "login": login }),
    )
    .await?;
    envelope
        .user
        .map(|user| user.followers.total_count)
        .ok_or_else(|| missing_user(&queries::FOLLOWERS, login))
}

/// Total contributions of `login` between two instants (at most one year apart).
pub async fn fetch_contributions<T: Transport + ?Sized>(
    transport: &mut T,
    counter: &mut QueryCount,
    login: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<u64> {
    let variables = json!({
        "login": login,
        "start_date": from.to_rfc3339(),
        "end_date": to.to_rfc3339(),
    });
    let envelope: UserEnvelope<ContributionsNode> =
        execute_as(transport, counter, &queries::CONTRIBUTIONS, variables).await?;
    envelope
        .user
        .map(|user| {
            user.contributions_collection
                .contribution_calendar
                .total_contributions
        })
        .ok_or_else(|| missing_user(&queries::CONTRIBUTIONS, login))
}

/// Repository count and star total for a set of affiliations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepoStats {
    pub repositories: u64,
    pub stars: u64,
}

/// Paged `user.repositories` listing for the given query document.
pub struct RepositoryPages<'a, T: ?Sized, N> {
    transport: &'a mut T,
    query: &'static Query,
    login: &'a str,
    affiliations: &'a [Affiliation],
    total_count: u64,
    _node: std::marker::PhantomData<N>,
}

impl<'a, T: ?Sized, N> RepositoryPages<'a, T, N> {
    pub fn new(
        transport: &'a mut T,
        query: &'static Query,
        login: &'a str,
        affiliations: &'a [Affiliation],
    ) -> Self {
        Self {
            transport,
            query,
            login,
            affiliations,
            total_count: 0,
            _node: std::marker::PhantomData,
        }
    }
}

#[async_trait(?Send)]
impl<'a, T, N> PageSource for RepositoryPages<'a, T, N>
where
    T: Transport + ?Sized,
    N: serde::de::DeserializeOwned,
{
    type Item = N;

    fn kind(&self) -> QueryKind {
        self.query.kind
    }

    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page<N>> {
        let variables = json!({
            "login": self.login,
            "owner_affiliation": self.affiliations,
            "cursor": cursor,
        });
        let data = self.transport.execute(self.query, variables).await?;
        let envelope: UserEnvelope<RepositoriesNode<N>> = serde_json::from_value(data)?;
        let repositories = envelope
            .user
            .ok_or_else(|| missing_user(self.query, self.login))?
            .repositories;
        self.total_count = repositories.total_count;
        Ok(Page::from(repositories))
    }
}

/// Count repositories and sum their stars across every page of the listing.
pub async fn fetch_repo_stats<T: Transport + ?Sized>(
    transport: &mut T,
    counter: &mut QueryCount,
    login: &str,
    affiliations: &[Affiliation],
) -> Result<RepoStats> {
    let mut pages: RepositoryPages<'_, T, RepoStarsNode> =
        RepositoryPages::new(transport, &queries::REPO_STATS, login, affiliations);
    let repos = walk_pages(&mut pages, counter).await?;
    Ok(RepoStats {
        repositories: pages.total_count.max(repos.len() as u64),
        stars: repos.iter().map(|repo| repo.stargazers.total_count).sum(),
    })
}

/// Every repository visible through `affiliations`, in listing order.
pub async fn fetch_repo_list<T: Transport + ?Sized>(
    transport: &mut T,
    counter: &mut QueryCount,
    login: &str,
    affiliations: &[Affiliation],
) -> Result<Vec<RepoSummary>> {
    let mut pages: RepositoryPages<'_, T, RepoListNode> =
        RepositoryPages::new(transport, &queries::REPO_LIST, login, affiliations);
    let nodes = walk_pages(&mut pages, counter).await?;
    Ok(nodes.into_iter().map(RepoSummary::from).collect())
}
