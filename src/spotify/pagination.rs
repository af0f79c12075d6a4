use std::{future::Future, marker::PhantomData};

use futures::future::join_all;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::SpotifyClient;
use crate::{error::Result, types::Page, utils};

/// Items gathered from every page of a collection.
#[derive(Debug, Clone)]
pub struct Aggregate<T> {
    pub items: Vec<T>,
    /// Total announced by the first page.
    pub total: u32,
    /// Pages that failed and were skipped.
    pub failed_pages: usize,
}

impl<T> Aggregate<T> {
    /// False when a page was skipped; `items` may then be an undercount.
    pub fn is_complete(&self) -> bool {
        self.failed_pages == 0
    }
}

/// Fetches a whole paginated collection.
///
/// The first page is fetched alone to learn the total. The remaining pages are
/// then requested concurrently; a failing page is logged and skipped, so the
/// result may hold fewer items than `total`. An error on the first page is
/// returned as is.
pub async fn fetch_all<T, F, Fut>(page_size: u32, fetch_page: F) -> Result<Aggregate<T>>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let first = fetch_page(0).await?;
    let total = first.total;
    let mut items = first.items;

    let fetched = items.len() as u32;
    if fetched >= total || page_size == 0 {
        return Ok(Aggregate {
            items,
            total,
            failed_pages: 0,
        });
    }

    let pages = utils::remaining_pages(total - fetched, page_size);
    let offsets: Vec<u32> = (1..=pages).map(|page| page * page_size).collect();
    let results = join_all(offsets.iter().map(|&offset| fetch_page(offset))).await;

    let mut failed_pages = 0;
    for (offset, result) in offsets.iter().zip(results) {
        match result {
            Ok(page) => items.extend(page.items),
            Err(e) => {
                failed_pages += 1;
                warn!(offset, error = %e, "skipping page that failed to load");
            }
        }
    }

    Ok(Aggregate {
        items,
        total,
        failed_pages,
    })
}

/// Lazy, restartable cursor over a paginated endpoint.
///
/// Pages are only requested when asked for; [`PageCursor::rewind`] starts
/// over from the first page.
pub struct PageCursor<'a, T> {
    client: &'a SpotifyClient,
    endpoint: String,
    limit: u32,
    offset: u32,
    total: Option<u32>,
    exhausted: bool,
    _item: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> PageCursor<'a, T> {
    pub fn new(client: &'a SpotifyClient, endpoint: impl Into<String>, limit: u32) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            limit: limit.max(1),
            offset: 0,
            total: None,
            exhausted: false,
            _item: PhantomData,
        }
    }

    /// Total announced by the last fetched page, if any page was fetched.
    pub fn total(&self) -> Option<u32> {
        self.total
    }

    /// Fetches the page starting at `offset` without moving the cursor.
    pub async fn page_at(&self, offset: u32) -> Result<Page<T>> {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        let endpoint = format!(
            "{endpoint}{separator}limit={limit}&offset={offset}",
            endpoint = self.endpoint,
            limit = self.limit,
        );
        self.client.get(&endpoint).await
    }

    /// Next page of items, or `None` once the collection is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        if self.exhausted || self.total.is_some_and(|total| self.offset >= total) {
            return Ok(None);
        }

        let page = self.page_at(self.offset).await?;
        self.total = Some(page.total);
        self.offset += self.limit;
        if page.items.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }
        Ok(Some(page.items))
    }

    pub fn rewind(&mut self) {
        self.offset = 0;
        self.total = None;
        self.exhausted = false;
    }

    /// Aggregates every page with [`fetch_all`].
    pub async fn collect_all(&self) -> Result<Aggregate<T>> {
        fetch_all(self.limit, |offset| self.page_at(offset)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    fn numbers(offset: u32, limit: u32, total: u32) -> Page<u32> {
        Page {
            items: (offset..(offset + limit).min(total)).collect(),
            total,
            next: None,
        }
    }

    #[tokio::test]
    async fn single_page_returns_early() {
        let result = fetch_all(50, |offset| async move { Ok(numbers(offset, 50, 20)) })
            .await
            .unwrap();
        assert_eq!(result.items.len(), 20);
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn gathers_remaining_pages_in_offset_order() {
        let result = fetch_all(10, |offset| async move { Ok(numbers(offset, 10, 35)) })
            .await
            .unwrap();
        assert_eq!(result.items, (0..35).collect::<Vec<u32>>());
        assert_eq!(result.total, 35);
    }

    #[tokio::test]
    async fn failed_page_is_skipped() {
        let result = fetch_all(10, |offset| async move {
            if offset == 10 {
                Err(SyncError::Upstream { status: 502 })
            } else {
                Ok(numbers(offset, 10, 30))
            }
        })
        .await
        .unwrap();

        assert_eq!(result.items.len(), 20);
        assert_eq!(result.failed_pages, 1);
        assert!(!result.is_complete());
    }

    #[tokio::test]
    async fn first_page_error_propagates() {
        let result: Result<Aggregate<u32>> =
            fetch_all(10, |_| async { Err(SyncError::Timeout(30)) }).await;
        assert_eq!(result.unwrap_err(), SyncError::Timeout(30));
    }
}
