// Aggregate collector.
// Gathers every profile statistic, routing lines of code through the incremental cache.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::cache::{RepoCache, ScanTotals};
use crate::error::Result;
use crate::github::endpoints::{
    fetch_contributions, fetch_followers, fetch_repo_list, fetch_repo_stats, fetch_user,
};
use crate::github::{Affiliation, QueryCount, Transport, UserNode};
use crate::guard::CrashGuard;

/// Window covered by the contribution count.
const CONTRIBUTION_WINDOW_DAYS: i64 = 365;

/// How long one collection phase took.
#[derive(Debug, Clone)]
pub struct PhaseTiming {
    pub label: &'static str,
    pub elapsed: Duration,
}

/// Everything rendered into the profile.
#[derive(Debug, Clone)]
pub struct ProfileStats {
    pub user: UserNode,
    pub loc: ScanTotals,
    pub stars: u64,
    pub repositories: u64,
    pub contributed_repositories: u64,
    pub followers: u64,
    /// Contributions over the trailing year.
    pub contributions: u64,
    pub timings: Vec<PhaseTiming>,
}

/// Inputs that shape a collection run.
#[derive(Debug, Clone)]
pub struct CollectOptions<'a> {
    pub login: &'a str,
    pub loc_affiliations: &'a [Affiliation],
    pub force_refresh: bool,
    pub now: DateTime<Utc>,
}

async fn timed<T, F>(timings: &mut Vec<PhaseTiming>, label: &'static str, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let value = work.await?;
    let elapsed = start.elapsed();
    info!(phase = label, elapsed_ms = elapsed.as_millis() as u64, "phase complete");
    timings.push(PhaseTiming { label, elapsed });
    Ok(value)
}

/// Collect all statistics for `options.login`.
///
/// Requests are issued one at a time. Lines of code come from `cache`, which only
/// re-scans repositories whose commit count moved since the previous run.
pub async fn collect<T: Transport + ?Sized>(
    transport: &mut T,
    counter: &mut QueryCount,
    cache: &RepoCache,
    guard: &CrashGuard,
    options: &CollectOptions<'_>,
) -> Result<ProfileStats> {
    let login = options.login;
    let mut timings = Vec::new();

    let user = timed(
        &mut timings,
        "account data",
        fetch_user(&mut *transport, &mut *counter, login),
    )
    .await?;

    let loc = timed(&mut timings, "lines of code", async {
        let repos = fetch_repo_list(
            &mut *transport,
            &mut *counter,
            login,
            options.loc_affiliations,
        )
        .await?;
        info!(repos = repos.len(), "listed repositories");
        cache
            .reconcile(
                &mut *transport,
                &mut *counter,
                &repos,
                &user.id,
                options.force_refresh,
                guard,
            )
            .await
    })
    .await?;

    let owned = timed(
        &mut timings,
        "stars and repositories",
        fetch_repo_stats(&mut *transport, &mut *counter, login, &[Affiliation::Owner]),
    )
    .await?;

    let contributed = timed(
        &mut timings,
        "contributed repositories",
        fetch_repo_stats(&mut *transport, &mut *counter, login, &Affiliation::ALL),
    )
    .await?;

    let followers = timed(
        &mut timings,
        "followers",
        fetch_followers(&mut *transport, &mut *counter, login),
    )
    .await?;

    let from = options.now - chrono::Duration::days(CONTRIBUTION_WINDOW_DAYS);
    let contributions = timed(
        &mut timings,
        "contributions",
        fetch_contributions(&mut *transport, &mut *counter, login, from, options.now),
    )
    .await?;

    Ok(ProfileStats {
        user,
        loc,
        stars: owned.stars,
        repositories: owned.repositories,
        contributed_repositories: contributed.repositories,
        followers,
        contributions,
        timings,
    })
}
