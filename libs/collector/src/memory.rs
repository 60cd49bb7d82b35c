use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, RwLock};

use ledger_api::{PageRequest, Record, RecordSource, SortOrder, TransportError};

// ═══════════════════════════════════════════════════════════════
//  MemorySource
// ═══════════════════════════════════════════════════════════════

/// In-memory `RecordSource` with the same page contract as the ledger:
/// inclusive `after`, ordered by `created_at`, at most `limit` records.
///
/// Records every request it serves so callers can check cursors and
/// fetch counts. Can be armed to fail on the N-th call.
pub struct MemorySource {
    records: RwLock<Vec<Record>>,
    requests: Mutex<Vec<PageRequest>>,
    calls: AtomicUsize,
    failure: Option<(usize, TransportError)>,
}

impl MemorySource {
    pub fn new(mut records: Vec<Record>) -> Self {
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Self {
            records: RwLock::new(records),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            failure: None,
        }
    }

    /// Fail the `call`-th fetch (1-based) with `error`.
    pub fn fail_on(mut self, call: usize, error: TransportError) -> Self {
        self.failure = Some((call, error));
        self
    }

    /// Append records, keeping the store ordered.
    pub async fn insert(&self, new: impl IntoIterator<Item = Record>) {
        let mut buf = self.records.write().await;
        buf.extend(new);
        buf.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().await.clone()
    }
}

impl RecordSource for MemorySource {
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Record>, TransportError>> + Send + '_>> {
        let request = request.clone();
        Box::pin(async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.requests.lock().await.push(request.clone());

            if let Some((fail_at, error)) = &self.failure {
                if call == *fail_at {
                    return Err(error.clone());
                }
            }

            let buf = self.records.read().await;
            let matching = buf.iter().filter(|r| r.asset_id == request.asset_id);
            let page: Vec<Record> = match request.order {
                SortOrder::Asc => matching
                    .filter(|r| r.created_at >= request.after)
                    .take(request.limit)
                    .cloned()
                    .collect(),
                SortOrder::Desc => {
                    let mut older: Vec<Record> = matching
                        .filter(|r| r.created_at <= request.after)
                        .cloned()
                        .collect();
                    older.reverse();
                    older.truncate(request.limit);
                    older
                }
            };

            Ok(page)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;

    fn at(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap() + Duration::minutes(i)
    }

    fn rec(i: i64) -> Record {
        Record {
            id: i.to_string(),
            asset_id: "asset".into(),
            counterparty_id: "peer".into(),
            amount: Decimal::ONE,
            created_at: at(i),
            memo: String::new(),
        }
    }

    fn req(after: DateTime<Utc>, order: SortOrder, limit: usize) -> PageRequest {
        PageRequest { asset_id: "asset".into(), after, order, limit }
    }

    #[tokio::test]
    async fn ascending_page_is_inclusive_and_bounded() {
        let source = MemorySource::new((0..10).rev().map(rec).collect());

        let page = source.fetch_page(&req(at(3), SortOrder::Asc, 4)).await.unwrap();

        let ids: Vec<_> = page.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["3", "4", "5", "6"]);
    }

    #[tokio::test]
    async fn descending_page_walks_backwards() {
        let source = MemorySource::new((0..10).map(rec).collect());

        let page = source.fetch_page(&req(at(3), SortOrder::Desc, 10)).await.unwrap();

        let ids: Vec<_> = page.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["3", "2", "1", "0"]);
    }

    #[tokio::test]
    async fn insert_keeps_order_and_failure_fires_once() {
        let source = MemorySource::new(vec![rec(5)]).fail_on(1, TransportError::auth("denied"));
        source.insert([rec(1), rec(9)]).await;

        assert!(source.fetch_page(&req(at(0), SortOrder::Asc, 10)).await.is_err());
        let page = source.fetch_page(&req(at(0), SortOrder::Asc, 10)).await.unwrap();

        let ids: Vec<_> = page.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "5", "9"]);
        assert_eq!(source.fetch_count(), 2);
        assert_eq!(source.requests().await.len(), 2);
    }
}
