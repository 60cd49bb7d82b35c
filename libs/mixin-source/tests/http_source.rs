//! HttpSource against a mocked ledger API.

use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use collector::{WindowedCollector, aggregate};
use ledger_api::{ErrorKind, PageRequest, Query, RecordSource, SortOrder};
use mixin_source::{HttpSource, SourceConfig, exchange_code};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ASSET: &str = "c6d0c728-2624-429b-8e0d-d9d19b6592fa";
const PEER: &str = "7b3f0a95-3ee9-4c1b-8ae9-170e3877d909";
const STRANGER: &str = "e8e8cd79-cd40-4796-8c54-3a13cfe50115";

fn t(i: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(i)
}

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn snapshot(i: i64, opponent: &str) -> Value {
    json!({
        "type": "snapshot",
        "snapshot_id": format!("snap-{i:05}"),
        "asset_id": ASSET,
        "opponent_id": opponent,
        "amount": "0.01",
        "created_at": ts(t(i)),
        "memo": "",
    })
}

fn source(server: &MockServer) -> HttpSource {
    HttpSource::new(SourceConfig::new("secret-token").with_base_url(server.uri())).unwrap()
}

#[tokio::test]
async fn sends_cursor_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/snapshots"))
        .and(header("authorization", "Bearer secret-token"))
        .and(query_param("asset", ASSET))
        .and(query_param("offset", "2021-01-01T00:00:05.000000000Z"))
        .and(query_param("order", "ASC"))
        .and(query_param("limit", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [snapshot(5, PEER), snapshot(6, STRANGER)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = source(&server)
        .fetch_page(&PageRequest {
            asset_id: ASSET.into(),
            after: t(5),
            order: SortOrder::Asc,
            limit: 500,
        })
        .await
        .unwrap();

    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, "snap-00005");
    assert_eq!(page[0].counterparty_id, PEER);
    assert_eq!(page[1].created_at, t(6));
}

#[tokio::test]
async fn rejected_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/snapshots"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "error": { "status": 202, "code": 401, "description": "Unauthorized, maybe invalid token." }
        })))
        .mount(&server)
        .await;

    let collector = WindowedCollector::new(source(&server));
    let err = collector.collect(&Query::new(ASSET, PEER)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Auth);
}

#[tokio::test]
async fn collects_across_pages_until_window_closes() {
    let server = MockServer::start().await;

    let page1: Vec<Value> = (0..500).map(|i| snapshot(i, if i % 2 == 0 { PEER } else { STRANGER })).collect();
    let page2: Vec<Value> = (499..999).map(|i| snapshot(i, if i % 2 == 0 { PEER } else { STRANGER })).collect();

    Mock::given(method("GET"))
        .and(path("/snapshots"))
        .and(query_param("offset", ts(DateTime::<Utc>::UNIX_EPOCH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": page1 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/snapshots"))
        .and(query_param("offset", ts(t(499))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": page2 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/snapshots"))
        .and(query_param("offset", ts(t(998))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let collector = WindowedCollector::new(source(&server));
    let out = collector
        .collect(&Query::new(ASSET, PEER).ending_at(t(700)))
        .await
        .unwrap();

    // Even seconds 0..=700.
    assert_eq!(out.len(), 351);
    assert!(out.iter().all(|r| r.created_at <= t(700)));

    let summary = aggregate(&out);
    assert_eq!(summary.count, 351);
    assert_eq!(summary.total, Decimal::new(351, 2));
}

#[tokio::test]
async fn exchanges_code_for_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_json(json!({
            "client_id": "cid",
            "client_secret": "csecret",
            "code": "abc123",
            "code_verifier": "",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "access_token": "granted", "scope": "SNAPSHOTS:READ PROFILE:READ" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = exchange_code(&reqwest::Client::new(), &server.uri(), "cid", "csecret", " abc123\n")
        .await
        .unwrap();

    assert_eq!(token, "granted");
}
