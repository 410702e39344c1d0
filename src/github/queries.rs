// GraphQL query documents.
// Page sizes are fixed in the documents: larger pages time out upstream, smaller ones
// multiply round-trips until secondary rate limits kick in.

use super::transport::{Query, QueryKind};

/// Commits fetched per history round-trip.
pub const HISTORY_PAGE_SIZE: u32 = 100;

/// Repositories fetched per lines-of-code listing round-trip.
pub const REPO_LIST_PAGE_SIZE: u32 = 60;

pub const USER: Query = Query {
    kind: QueryKind::User,
    text: r#"
query ($login: String!) {
    user(login: $login) {
        id
        createdAt
    }
}
"#,
};

pub const FOLLOWERS: Query = Query {
    kind: QueryKind::Followers,
    text: r#"
query ($login: String!) {
    user(login: $login) {
        followers {
            totalCount
        }
    }
}
"#,
};

pub const REPO_STATS: Query = Query {
    kind: QueryKind::RepoStats,
    text: r#"
query ($owner_affiliation: [RepositoryAffiliation], $login: String!, $cursor: String) {
    user(login: $login) {
        repositories(first: 100, after: $cursor, ownerAffiliations: $owner_affiliation) {
            totalCount
            edges {
                node {
                    nameWithOwner
                    stargazers {
                        totalCount
                    }
                }
            }
            pageInfo {
                endCursor
                hasNextPage
            }
        }
    }
}
"#,
};

pub const REPO_LIST: Query = Query {
    kind: QueryKind::RepoList,
    text: r#"
query ($owner_affiliation: [RepositoryAffiliation], $login: String!, $cursor: String) {
    user(login: $login) {
        repositories(first: 60, after: $cursor, ownerAffiliations: $owner_affiliation) {
            edges {
                node {
                    nameWithOwner
                    defaultBranchRef {
                        target {
                            ... on Commit {
                                history {
                                    totalCount
                                }
                            }
                        }
                    }
                }
            }
            pageInfo {
                endCursor
                hasNextPage
            }
        }
    }
}
"#,
};

pub const COMMIT_HISTORY: Query = Query {
    kind: QueryKind::CommitHistory,
    text: r#"
query ($repo_name: String!, $owner: String!, $cursor: String) {
    repository(name: $repo_name, owner: $owner) {
        defaultBranchRef {
            target {
                ... on Commit {
                    history(first: 100, after: $cursor) {
                        totalCount
                        edges {
                            node {
                                committedDate
                                author {
                                    user {
                                        id
                                    }
                                }
                                deletions
                                additions
                            }
                        }
                        pageInfo {
                            endCursor
                            hasNextPage
                        }
                    }
                }
            }
        }
    }
}
"#,
};

pub const CONTRIBUTIONS: Query = Query {
    kind: QueryKind::Contributions,
    text: r#"
query ($start_date: DateTime!, $end_date: DateTime!, $login: String!) {
    user(login: $login) {
        contributionsCollection(from: $start_date, to: $end_date) {
            contributionCalendar {
                totalContributions
            }
        }
    }
}
"#,
};
