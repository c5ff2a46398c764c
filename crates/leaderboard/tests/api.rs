mod support;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::balance_api::FetchError;
use leaderboard::roster::AddressRoster;
use serde_json::Value;
use std::sync::Arc;
use support::{record, test_app, FakeBalances};
use tokio::sync::Notify;
use tower::ServiceExt;

async fn call(app: &axum::Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn addresses(page: &Value) -> Vec<String> {
    page["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["address"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _session) = test_app(FakeBalances::new(vec![]), AddressRoster::user_entered(), 10);
    let (status, json) = call(&app, Method::GET, "/api/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["uptime_secs"].as_i64().unwrap() >= 0);
}

#[tokio::test]
async fn test_empty_leaderboard_before_first_refresh() {
    let (app, _session) = test_app(FakeBalances::new(vec![]), AddressRoster::user_entered(), 10);
    let (status, json) = call(&app, Method::GET, "/api/leaderboard", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pageNumber"], 1);
    assert_eq!(json["totalPages"], 0);
    assert!(json["rows"].as_array().unwrap().is_empty());
    assert!(json["refreshedAt"].is_null());
}

#[tokio::test]
async fn test_enter_addresses_then_paginate() {
    let fetcher = FakeBalances::new(vec![Ok(vec![
        record("A", 1.0),
        record("B", 5.0),
        record("C", 3.0),
        record("D", 3.0),
        record("E", 0.5),
    ])]);
    let (app, _session) = test_app(fetcher, AddressRoster::user_entered(), 2);

    let (status, json) = call(&app, Method::PUT, "/api/addresses", "A\nB\nC\n\nD\nE\n").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["addresses"], 5);

    let (_, page) = call(&app, Method::GET, "/api/leaderboard", "").await;
    assert_eq!(page["totalPages"], 3);
    assert_eq!(addresses(&page), vec!["B", "C"]);
    assert_eq!(page["rows"][0]["rank"], 1);

    let (_, page) = call(&app, Method::POST, "/api/leaderboard/next", "").await;
    assert_eq!(addresses(&page), vec!["D", "A"]);
    assert_eq!(page["rows"][1]["sponsorTag"], "X");
    assert_eq!(page["rows"][1]["handle"], "@a");

    let (_, page) = call(&app, Method::POST, "/api/leaderboard/next", "").await;
    assert_eq!(addresses(&page), vec!["E"]);
    assert_eq!(page["hasNext"], false);

    let (_, page) = call(&app, Method::GET, "/api/leaderboard?page=9", "").await;
    assert_eq!(page["pageNumber"], 3);

    let (_, page) = call(&app, Method::POST, "/api/leaderboard/prev", "").await;
    assert_eq!(page["pageNumber"], 2);
}

#[tokio::test]
async fn test_blank_addresses_rejected() {
    let (app, _session) = test_app(FakeBalances::new(vec![]), AddressRoster::user_entered(), 10);
    let (status, json) = call(&app, Method::PUT, "/api/addresses", "  \n\n").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "no wallet addresses entered");
}

#[tokio::test]
async fn test_fixed_roster_rejects_address_entry() {
    let roster = AddressRoster::from_config(&["A".to_string()]);
    let (app, _session) = test_app(FakeBalances::new(vec![]), roster, 10);
    let (status, _) = call(&app, Method::PUT, "/api/addresses", "B").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_failed_refresh_is_bad_gateway_and_keeps_board() {
    let fetcher = FakeBalances::new(vec![
        Ok(vec![record("A", 2.0)]),
        Err(FetchError::Backend {
            status: 500,
            body: "boom".into(),
        }),
    ]);
    let roster = AddressRoster::from_config(&["A".to_string()]);
    let (app, _session) = test_app(fetcher, roster, 10);

    let (status, page) = call(&app, Method::POST, "/api/refresh", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(addresses(&page), vec!["A"]);

    let (status, json) = call(&app, Method::POST, "/api/refresh", "").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("500"));

    let (_, page) = call(&app, Method::GET, "/api/leaderboard", "").await;
    assert_eq!(addresses(&page), vec!["A"]);

    let (_, status) = call(&app, Method::GET, "/api/status", "").await;
    assert_eq!(status["entries"], 1);
    assert_eq!(status["rosterMode"], "fixed");
    assert_eq!(status["lastFailure"]["kind"], "backend");
}

async fn wait_until_refreshing(session: &leaderboard::session::LeaderboardSession<FakeBalances>) {
    while !session.status().await.refreshing {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_refresh_while_refreshing_is_conflict() {
    let gate = Arc::new(Notify::new());
    let fetcher = FakeBalances::new(vec![Ok(vec![record("A", 1.0)])]).gated(Arc::clone(&gate));
    let roster = AddressRoster::from_config(&["A".to_string()]);
    let (app, session) = test_app(fetcher, roster, 10);

    let first = tokio::spawn({
        let app = app.clone();
        async move { call(&app, Method::POST, "/api/refresh", "").await }
    });
    wait_until_refreshing(&session).await;

    let (status, json) = call(&app, Method::POST, "/api/refresh", "").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "a refresh is already in flight");

    gate.notify_one();
    let (status, page) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(addresses(&page), vec!["A"]);
}

#[tokio::test]
async fn test_refresh_discarded_by_teardown_is_unavailable() {
    let gate = Arc::new(Notify::new());
    let fetcher = FakeBalances::new(vec![Ok(vec![record("A", 1.0)])]).gated(Arc::clone(&gate));
    let roster = AddressRoster::from_config(&["A".to_string()]);
    let (app, session) = test_app(fetcher, roster, 10);

    let pending = tokio::spawn({
        let app = app.clone();
        async move { call(&app, Method::POST, "/api/refresh", "").await }
    });
    wait_until_refreshing(&session).await;

    session.teardown().await;
    gate.notify_one();

    let (status, json) = pending.await.unwrap();
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "refresh result discarded after teardown");

    let (_, page) = call(&app, Method::GET, "/api/leaderboard", "").await;
    assert!(page["rows"].as_array().unwrap().is_empty());
}
