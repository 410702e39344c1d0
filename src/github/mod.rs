// GitHub API module.
// Provides the GraphQL transport, query documents, pagination and response types.

pub mod client;
pub mod endpoints;
pub mod paginate;
pub mod queries;
pub mod transport;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use client::GitHubClient;
pub use endpoints::{Affiliation, RepoStats};
pub use paginate::{Page, PageCursor, PageSource, walk_pages};
pub use transport::{Query, QueryCount, QueryKind, Transport};
pub use types::*;
