mod error;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use error::{ErrorKind, TransportError};

/// Page size requested from the ledger. A page shorter than this is the last one.
pub const PAGE_LIMIT: usize = 500;

// ════════════════════════════════════════════════════════════════
//  Records
// ════════════════════════════════════════════════════════════════

/// One ledger transfer entry, immutable once fetched.
///
/// Field names on the wire follow the ledger's snapshot payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque, unique per ledger.
    #[serde(rename = "snapshot_id")]
    pub id: String,
    pub asset_id: String,
    #[serde(rename = "opponent_id", default)]
    pub counterparty_id: String,
    /// Signed amount, kept as an exact decimal.
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub memo: String,
}

// ════════════════════════════════════════════════════════════════
//  Queries
// ════════════════════════════════════════════════════════════════

/// What the user asked for: one asset, one counterparty, an optional window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub asset_id: String,
    pub counterparty_id: String,
    /// Inclusive lower bound. `None` means the Unix epoch.
    pub start_time: Option<DateTime<Utc>>,
    /// Records created strictly after this instant stop the collection.
    pub end_time: Option<DateTime<Utc>>,
}

impl Query {
    pub fn new(asset_id: impl Into<String>, counterparty_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            counterparty_id: counterparty_id.into(),
            start_time: None,
            end_time: None,
        }
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn ending_at(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    /// Cursor for the first page.
    pub fn cursor_start(&self) -> DateTime<Utc> {
        self.start_time.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// True when `at` lies past the end of the window.
    pub fn is_past_end(&self, at: &DateTime<Utc>) -> bool {
        self.end_time.is_some_and(|end| *at > end)
    }
}

/// Сортировка страницы по `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Parameters of one `fetch_page` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub asset_id: String,
    /// Records at exactly this instant are included.
    pub after: DateTime<Utc>,
    pub order: SortOrder,
    pub limit: usize,
}

// ════════════════════════════════════════════════════════════════
//  RecordSource
// ════════════════════════════════════════════════════════════════

/// Remote, time-ordered record stream read in bounded pages.
///
/// Contract relied on by the collector:
/// - records come back ordered by `created_at` as requested;
/// - `after` is inclusive;
/// - exactly `limit` records are returned unless this is the final page.
pub trait RecordSource: Send + Sync {
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>, TransportError>> + Send + '_>>;
}

impl<S: RecordSource + ?Sized> RecordSource for Arc<S> {
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>, TransportError>> + Send + '_>> {
        (**self).fetch_page(request)
    }
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>, TransportError>> + Send + '_>> {
        (**self).fetch_page(request)
    }
}
