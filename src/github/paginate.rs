// Cursor pagination over GraphQL connections.
// Walks pages until the remote reports no further pages, accumulating items in order.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, StatError};

use super::transport::{QueryCount, QueryKind};
use super::types::{Connection, PageInfo};

/// Continuation state returned with each page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCursor {
    pub token: Option<String>,
    pub has_more: bool,
}

impl From<PageInfo> for PageCursor {
    fn from(info: PageInfo) -> Self {
        Self {
            token: info.end_cursor,
            has_more: info.has_next_page,
        }
    }
}

/// One fetched page of items.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: PageCursor,
}

impl<T> Page<T> {
    /// A terminal page with no items.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            cursor: PageCursor::default(),
        }
    }
}

impl<T> From<Connection<T>> for Page<T> {
    fn from(connection: Connection<T>) -> Self {
        let cursor = PageCursor::from(connection.page_info.clone());
        Self {
            items: connection.into_nodes(),
            cursor,
        }
    }
}

/// Something that can fetch one page given the previous page's cursor.
#[async_trait(?Send)]
pub trait PageSource {
    type Item;

    /// Query kind each fetch is accounted under.
    fn kind(&self) -> QueryKind;

    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page<Self::Item>>;
}

/// Fetch every page from `source` and concatenate the items.
///
/// Page sizes are not assumed and empty pages in the middle of a sequence are fine.
/// Fetch failures are returned as-is; retry policy belongs to the transport.
pub async fn walk_pages<S>(source: &mut S, counter: &mut QueryCount) -> Result<Vec<S::Item>>
where
    S: PageSource + ?Sized,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0u32;

    loop {
        counter.record(source.kind());
        let page = source.fetch_page(cursor.as_deref()).await?;
        pages += 1;
        items.extend(page.items);

        if !page.cursor.has_more {
            break;
        }
        match page.cursor.token {
            Some(token) => cursor = Some(token),
            None => return Err(StatError::MissingCursor(source.kind().label())),
        }
    }

    debug!(kind = source.kind().label(), pages, items = items.len(), "pagination complete");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves canned pages and records the cursors it was asked for.
    struct CannedPages {
        pages: Vec<Vec<u32>>,
        seen: Vec<Option<String>>,
        fail_at: Option<usize>,
        drop_cursor_at: Option<usize>,
    }

    impl CannedPages {
        fn new(pages: Vec<Vec<u32>>) -> Self {
            Self {
                pages,
                seen: Vec::new(),
                fail_at: None,
                drop_cursor_at: None,
            }
        }
    }

    #[async_trait(?Send)]
    impl PageSource for CannedPages {
        type Item = u32;

        fn kind(&self) -> QueryKind {
            QueryKind::RepoList
        }

        async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page<u32>> {
            self.seen.push(cursor.map(str::to_string));
            let index = cursor.map(|c| c.parse::<usize>().unwrap()).unwrap_or(0);
            if self.fail_at == Some(index) {
                return Err(StatError::RateLimited {
                    reset_at: "12:00:00".to_string(),
                });
            }
            let has_more = index + 1 < self.pages.len();
            let token = if self.drop_cursor_at == Some(index) {
                None
            } else {
                Some((index + 1).to_string())
            };
            Ok(Page {
                items: self.pages[index].clone(),
                cursor: PageCursor { token, has_more },
            })
        }
    }

    #[tokio::test]
    async fn test_walk_concatenates_in_order() {
        let mut source = CannedPages::new(vec![vec![1, 2, 3], vec![], vec![4], vec![5, 6]]);
        let mut counter = QueryCount::new();

        let items = walk_pages(&mut source, &mut counter).await.unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(
            source.seen,
            vec![
                None,
                Some("1".to_string()),
                Some("2".to_string()),
                Some("3".to_string())
            ]
        );
        assert_eq!(counter.get(QueryKind::RepoList), 4);
    }

    #[tokio::test]
    async fn test_walk_single_empty_page() {
        let mut source = CannedPages::new(vec![vec![]]);
        let mut counter = QueryCount::new();

        let items = walk_pages(&mut source, &mut counter).await.unwrap();

        assert!(items.is_empty());
        assert_eq!(counter.total(), 1);
    }

    #[tokio::test]
    async fn test_walk_surfaces_fetch_failure() {
        let mut source = CannedPages::new(vec![vec![1], vec![2], vec![3]]);
        source.fail_at = Some(1);
        let mut counter = QueryCount::new();

        let err = walk_pages(&mut source, &mut counter).await.unwrap_err();

        assert!(matches!(err, StatError::RateLimited { .. }));
        // The failed round-trip still counts
        assert_eq!(counter.get(QueryKind::RepoList), 2);
    }

    #[tokio::test]
    async fn test_walk_rejects_missing_cursor() {
        let mut source = CannedPages::new(vec![vec![1], vec![2]]);
        source.drop_cursor_at = Some(0);
        let mut counter = QueryCount::new();

        let err = walk_pages(&mut source, &mut counter).await.unwrap_err();
        assert!(matches!(err, StatError::MissingCursor("repo_list")));
    }
}
