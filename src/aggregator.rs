//! Page aggregation
//!
//! [`Aggregator::fetch_all`] reads page 1 to learn how many pages exist, then fetches the
//! rest concurrently. The fan-out is bounded by the transport's connection ceiling and fails
//! fast: the first page that cannot be fetched aborts the whole call, and dropping the
//! pending stream cancels every sibling request still in flight. Partial results are never
//! returned.

use futures::{StreamExt, TryStreamExt, stream};

use crate::error::{Error, Result};
use crate::fetcher::PageFetcher;
use crate::types::{PageResult, Record};

/// Collects every record for one query key
#[derive(Clone)]
pub struct Aggregator {
    fetcher: PageFetcher,
    max_in_flight: usize,
}

impl Aggregator {
    /// Create an aggregator whose fan-out matches the transport's connection ceiling
    pub fn new(fetcher: PageFetcher) -> Self {
        let max_in_flight = fetcher.transport().max_in_flight().max(1);
        Self {
            fetcher,
            max_in_flight,
        }
    }

    /// Maximum number of pages fetched at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Fetch and concatenate all pages for `key`
    ///
    /// Records are ordered by page number (page 1 first), keeping each page's own order,
    /// no matter which request finished first.
    ///
    /// # Errors
    /// Any [`PageFetcher::fetch`] error for any page, or
    /// [`Error::InconsistentPagination`] if a page disagrees with page 1 on `total_pages`.
    pub async fn fetch_all(&self, key: &str) -> Result<Vec<Record>> {
        let first = self.fetcher.fetch(key, 1).await?;
        let total_pages = first.total_pages;
        let total_items = first.total_items;

        if total_pages == 1 {
            check_total(key, total_items, first.records.len());
            return Ok(first.records);
        }

        tracing::debug!(
            key,
            total_pages,
            max_in_flight = self.max_in_flight,
            "fetching remaining pages"
        );

        // buffer_unordered yields in completion order, so try_collect stops on the first
        // failure instead of waiting behind slower pages; the stream is dropped right after
        let mut rest: Vec<(u32, PageResult)> = stream::iter(2..=total_pages)
            .map(|page| self.fetch_consistent(key, page, total_pages))
            .buffer_unordered(self.max_in_flight)
            .try_collect()
            .await
            .inspect_err(|e| {
                tracing::error!(key, error = %e, "aggregation aborted, in-flight pages cancelled");
            })?;

        rest.sort_unstable_by_key(|(page, _)| *page);

        let capacity = first.records.len()
            + rest.iter().map(|(_, p)| p.records.len()).sum::<usize>();
        let mut records = Vec::with_capacity(capacity);
        records.extend(first.records);
        for (_, page) in rest {
            records.extend(page.records);
        }

        check_total(key, total_items, records.len());
        tracing::info!(key, pages = total_pages, records = records.len(), "aggregated all pages");
        Ok(records)
    }

    async fn fetch_consistent(
        &self,
        key: &str,
        page: u32,
        expected_pages: u32,
    ) -> Result<(u32, PageResult)> {
        let result = self.fetcher.fetch(key, page).await?;

        if result.total_pages != expected_pages {
            return Err(Error::InconsistentPagination {
                key: key.to_string(),
                page,
                expected: expected_pages,
                actual: result.total_pages,
            });
        }

        Ok((page, result))
    }
}

// The API's item count is advisory; only total_pages drives aggregation
fn check_total(key: &str, reported: u32, collected: usize) {
    if !total_matches(reported, collected) {
        tracing::warn!(
            key,
            reported,
            collected,
            "record count differs from the total reported by the API"
        );
    }
}

fn total_matches(reported: u32, collected: usize) -> bool {
    usize::try_from(reported) == Ok(collected)
}
