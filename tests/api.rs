mod common;

use alloy_primitives::U256;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::{json, Value};
use split_aggr::router::router::create_api_router;
use split_aggr::venues::VenueId;
use tower::ServiceExt;

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn hex(amount: U256) -> String {
    format!("{amount:#x}")
}

#[tokio::test]
async fn health_and_metrics_are_served() {
    let (router, _) = router_with(vec![ScriptedVenue::new(9_970).info("a")]).await;
    let app = create_api_router(router);

    let resp = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn deposit_quote_and_swap_over_http() {
    let (router, _) = router_with(vec![
        ScriptedVenue::new(9_970).info("a"),
        ScriptedVenue::new(9_900).info("b"),
    ])
    .await;
    let app = create_api_router(router.clone());

    let resp = app
        .clone()
        .oneshot(post(
            "/api/v1/deposit",
            json!({ "account": caller(), "token": token_in(), "amount": hex(ether(2)) }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(post(
            "/api/v1/quote",
            json!({
                "token_in": token_in(),
                "token_out": token_out(),
                "amount_in": hex(ether(1)),
                "optimize_for_gas": true,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let quote = json_body(resp).await;
    assert_eq!(quote["routes"].as_array().unwrap().len(), 2);

    let resp = app
        .clone()
        .oneshot(post(
            "/api/v1/swap",
            json!({
                "caller": caller(),
                "request": {
                    "token_in": token_in(),
                    "token_out": token_out(),
                    "amount_in": hex(ether(1)),
                    "min_amount_out": quote["amount_out"],
                    "recipient": recipient(),
                    "deadline": NOW + 300,
                },
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let receipt = json_body(resp).await;
    assert_eq!(receipt["amount_out"], quote["amount_out"]);

    let uri = format!("/api/v1/balance?account=treasury&token={}", token_out());
    let resp = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let balance = json_body(resp).await;
    assert_eq!(balance["balance"], receipt["fee_amount"]);

    let resp = app.oneshot(get("/api/v1/stats")).await.unwrap();
    let stats = json_body(resp).await;
    assert_eq!(stats["swaps"]["swap_count"], 1);
    assert_eq!(stats["quotes_served"], 1);
}

#[tokio::test]
async fn swap_errors_map_to_status_codes() {
    let (router, _) = router_with(vec![ScriptedVenue::new(9_970).info("a")]).await;
    let app = create_api_router(router);

    let resp = app
        .clone()
        .oneshot(post(
            "/api/v1/swap",
            json!({
                "caller": caller(),
                "request": {
                    "token_in": token_in(),
                    "token_out": token_in(),
                    "amount_in": hex(ether(1)),
                    "min_amount_out": hex(U256::from(1)),
                    "recipient": recipient(),
                    "deadline": NOW + 300,
                },
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["kind"], "identical_tokens");
    assert_eq!(body["class"], "input");

    let resp = app
        .oneshot(get("/api/v1/balance?account=nobody&token=0x0000000000000000000000000000000000000001"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn venues_can_be_listed_and_toggled() {
    let (router, _) = router_with(vec![
        ScriptedVenue::new(9_970).info("a"),
        ScriptedVenue::new(9_900).info("b"),
    ])
    .await;
    let app = create_api_router(router.clone());

    let resp = app
        .clone()
        .oneshot(post("/api/v1/venues/b/enabled", json!({ "enabled": false })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(post("/api/v1/venues/missing/enabled", json!({ "enabled": false })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.oneshot(get("/api/v1/venues")).await.unwrap();
    let venues = json_body(resp).await;
    let enabled: Vec<(String, bool)> = venues
        .as_array()
        .unwrap()
        .iter()
        .map(|v| {
            (
                v["id"].as_str().unwrap().to_string(),
                v["enabled"].as_bool().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        enabled,
        vec![("a".to_string(), true), ("b".to_string(), false)]
    );

    let quote = router
        .quote(token_in(), token_out(), ether(1), true)
        .await
        .unwrap();
    assert_eq!(quote.routes.len(), 1);
    assert_eq!(quote.routes[0].steps[0].venue_id, VenueId::new("a"));
}
