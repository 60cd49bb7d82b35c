use std::collections::HashSet;

use chrono::{DateTime, Utc};
use ledger_api::{PAGE_LIMIT, PageRequest, Query, Record, RecordSource, SortOrder, TransportError};

// ═══════════════════════════════════════════════════════════════
//  Page scan outcome
// ═══════════════════════════════════════════════════════════════

/// Result of scanning one page, checked by the outer page loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    /// Every record was inside the window; the next page may be fetched.
    Continue,
    /// A record past `end_time` was seen; no further page is fetched.
    Halt,
}

// ═══════════════════════════════════════════════════════════════
//  WindowedCollector
// ═══════════════════════════════════════════════════════════════

/// Walks a `RecordSource` page by page with an ascending cursor and keeps
/// the records of one counterparty inside the query window.
///
/// Pages are fetched strictly one after another: the cursor of page N+1 is
/// the `created_at` of the last record of page N, inclusive, so a record
/// sitting exactly on a page boundary is fetched twice. Such repeats are
/// returned as-is unless [`with_dedup`](Self::with_dedup) is enabled.
pub struct WindowedCollector<S> {
    source: S,
    page_limit: usize,
    dedup: bool,
}

impl<S: RecordSource> WindowedCollector<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            page_limit: PAGE_LIMIT,
            dedup: false,
        }
    }

    /// Override the page size. Values below 1 are clamped to 1.
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit.max(1);
        self
    }

    /// Skip records whose id was already collected in this run.
    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn page_limit(&self) -> usize {
        self.page_limit
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Collect every record of `query.counterparty_id` from `query.start_time`
    /// up to the first record created after `query.end_time`.
    ///
    /// The first failed fetch aborts the run; records gathered so far are
    /// dropped with it.
    pub async fn collect(&self, query: &Query) -> Result<Vec<Record>, TransportError> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = query.cursor_start();
        let mut pages = 0usize;
        let mut fetched = 0usize;

        loop {
            let request = PageRequest {
                asset_id: query.asset_id.clone(),
                after: cursor,
                order: SortOrder::Asc,
                limit: self.page_limit,
            };
            let page = self
                .source
                .fetch_page(&request)
                .await
                .map_err(|e| e.with_context(format!("page {} after {}", pages + 1, cursor.to_rfc3339())))?;
            pages += 1;
            fetched += page.len();

            tracing::debug!(
                page = pages,
                cursor = %cursor.to_rfc3339(),
                size = page.len(),
                "fetched page"
            );

            let full = page.len() >= self.page_limit;
            let next_cursor = page.last().map(|r| r.created_at);

            if self.scan_page(query, page, &mut result, &mut seen) == Scan::Halt {
                tracing::debug!(page = pages, "end of window reached");
                break;
            }
            if !full {
                break;
            }
            cursor = match next_cursor {
                Some(next) => self.advance(cursor, next)?,
                None => break,
            };
        }

        tracing::info!(
            asset = %query.asset_id,
            counterparty = %query.counterparty_id,
            pages,
            fetched,
            kept = result.len(),
            "collection finished"
        );

        Ok(result)
    }

    /// Inner scan. The end-time check runs on every record before the
    /// counterparty filter, so a foreign record past the window halts too.
    fn scan_page(
        &self,
        query: &Query,
        page: Vec<Record>,
        result: &mut Vec<Record>,
        seen: &mut HashSet<String>,
    ) -> Scan {
        for record in page {
            if query.is_past_end(&record.created_at) {
                return Scan::Halt;
            }
            if record.counterparty_id != query.counterparty_id {
                continue;
            }
            if self.dedup && !seen.insert(record.id.clone()) {
                tracing::trace!(id = %record.id, "skipping repeated record");
                continue;
            }
            result.push(record);
        }
        Scan::Continue
    }

    /// A full page whose last record sits on the current cursor would be
    /// requested again forever.
    fn advance(
        &self,
        cursor: DateTime<Utc>,
        next: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, TransportError> {
        if next <= cursor {
            return Err(TransportError::status(format!(
                "cursor stalled at {}: a full page of {} records shares one timestamp",
                cursor.to_rfc3339(),
                self.page_limit
            )));
        }
        Ok(next)
    }
}
