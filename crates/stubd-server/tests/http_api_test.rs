//! End-to-end tests driving the server over real HTTP connections.

use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::Request;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::{json, Value};

use stubd_server::{AppState, HttpServer};

async fn start_server() -> SocketAddr {
    let state = Arc::new(AppState::in_memory("localhost"));
    let server = HttpServer::new(state, 4);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    addr
}

async fn send_raw(
    method: &str,
    addr: SocketAddr,
    path: &str,
    body: String,
    headers: &[(&str, &str)],
) -> (u16, Value) {
    let client: Client<_, Full<Bytes>> = Client::builder(TokioExecutor::new()).build_http();
    let mut builder = Request::builder()
        .method(method)
        .uri(format!("http://{}{}", addr, path))
        .header("Host", "localhost")
        .header("Content-Type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let req = builder.body(Full::new(Bytes::from(body))).unwrap();

    let res = client.request(req).await.unwrap();
    assert!(
        res.headers().get("x-stubd-version").is_some(),
        "every response carries the version header"
    );
    let status = res.status().as_u16();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn send(method: &str, addr: SocketAddr, path: &str, body: Value) -> (u16, Value) {
    send_raw(method, addr, path, body.to_string(), &[]).await
}

async fn create_scenario(addr: SocketAddr, name: &str) {
    let (status, _) = send("PUT", addr, "/api/v2/scenarios", json!({"scenario": name})).await;
    assert_eq!(status, 201);
}

async fn begin_session(addr: SocketAddr, scenario: &str, session: &str, mode: &str) {
    let (status, _) = send(
        "POST",
        addr,
        &format!("/api/v2/scenarios/objects/{}/action", scenario),
        json!({"begin": null, "session": session, "mode": mode}),
    )
    .await;
    assert_eq!(status, 200);
}

async fn put_stub(addr: SocketAddr, session: &str, matcher: &str, response: &str) {
    let (status, _) = send(
        "PUT",
        addr,
        &format!("/api/put/stub?session={}", session),
        json!({
            "request": {"bodyPatterns": [matcher]},
            "response": {"body": response},
        }),
    )
    .await;
    assert_eq!(status, 201);
}

async fn end_session(addr: SocketAddr, scenario: &str, session: &str) {
    let (status, _) = send(
        "POST",
        addr,
        &format!("/api/v2/scenarios/objects/{}/action", scenario),
        json!({"end": null, "session": session}),
    )
    .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_create_scenario() {
    let addr = start_server().await;
    let (status, payload) =
        send("PUT", addr, "/api/v2/scenarios", json!({"scenario": "demo"})).await;
    assert_eq!(status, 201);
    assert_eq!(payload["data"]["name"], json!("localhost:demo"));
    assert_eq!(
        payload["data"]["scenarioRef"],
        json!("/api/v2/scenarios/objects/localhost:demo")
    );
    assert!(payload["version"].is_string());
}

#[tokio::test]
async fn test_create_scenario_empty_body_is_415() {
    let addr = start_server().await;
    let (status, payload) = send_raw("PUT", addr, "/api/v2/scenarios", String::new(), &[]).await;
    assert_eq!(status, 415);
    assert_eq!(payload["error"]["code"], json!(415));
    assert_eq!(payload["error"]["message"], json!("No JSON body found"));
}

#[tokio::test]
async fn test_create_scenario_missing_name_is_400() {
    let addr = start_server().await;
    let (status, payload) = send("PUT", addr, "/api/v2/scenarios", json!({"nope": 1})).await;
    assert_eq!(status, 400);
    assert_eq!(payload["error"]["message"], json!("Scenario name not supplied"));
}

#[tokio::test]
async fn test_create_duplicate_scenario_is_422() {
    let addr = start_server().await;
    create_scenario(addr, "demo").await;
    let (status, payload) =
        send("PUT", addr, "/api/v2/scenarios", json!({"scenario": "demo"})).await;
    assert_eq!(status, 422);
    assert!(payload["error"]["message"]
        .as_str()
        .unwrap()
        .contains("localhost:demo"));
}

#[tokio::test]
async fn test_illegal_scenario_name_is_echoed() {
    let addr = start_server().await;
    let (status, payload) =
        send("PUT", addr, "/api/v2/scenarios", json!({"scenario": "@foo"})).await;
    assert_eq!(status, 400);
    assert!(payload["error"]["message"].as_str().unwrap().contains("@foo"));
}

#[tokio::test]
async fn test_delete_missing_scenario_is_412() {
    let addr = start_server().await;
    let (status, _) = send(
        "DELETE",
        addr,
        "/api/v2/scenarios/objects/ghost",
        json!({}),
    )
    .await;
    assert_eq!(status, 412);
}

#[tokio::test]
async fn test_detail_rejects_other_methods() {
    let addr = start_server().await;
    let (status, payload) = send("POST", addr, "/api/v2/scenarios/detail", json!({})).await;
    assert_eq!(status, 405);
    assert_eq!(payload["error"]["code"], json!(405));
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let addr = start_server().await;
    let (status, payload) = send("GET", addr, "/api/v2/nothing", json!({})).await;
    assert_eq!(status, 404);
    assert!(payload["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Unknown path"));
}

#[tokio::test]
async fn test_record_playback_round_trip() {
    let addr = start_server().await;
    create_scenario(addr, "orders").await;
    begin_session(addr, "orders", "rec", "record").await;
    put_stub(addr, "rec", "<order>42</order>", "<status>shipped</status>").await;
    end_session(addr, "orders", "rec").await;
    begin_session(addr, "orders", "play", "playback").await;

    let (status, payload) = send_raw(
        "POST",
        addr,
        "/api/get/response",
        "<request><order>42</order></request>".to_string(),
        &[("stubd-request-session", "play")],
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(payload["data"], json!("<status>shipped</status>"));
}

#[tokio::test]
async fn test_get_response_with_legacy_headers() {
    let addr = start_server().await;
    create_scenario(addr, "orders").await;
    begin_session(addr, "orders", "rec", "record").await;
    put_stub(addr, "rec", "<a/>", "<response/>").await;
    end_session(addr, "orders", "rec").await;
    // Legacy clients address sessions as <scenario>_<session>.
    begin_session(addr, "orders", "orders_play", "playback").await;

    let (status, payload) = send_raw(
        "POST",
        addr,
        "/api/get/response",
        "<a/>".to_string(),
        &[("stb_session", "play"), ("stb_scenario", "orders")],
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(payload["data"], json!("<response/>"));
}

#[tokio::test]
async fn test_get_response_without_session_is_400() {
    let addr = start_server().await;
    let (status, payload) =
        send_raw("POST", addr, "/api/get/response", "<a/>".to_string(), &[]).await;
    assert_eq!(status, 400);
    assert_eq!(
        payload["error"]["message"],
        json!("session not supplied in headers.")
    );
}

#[tokio::test]
async fn test_end_all_sessions() {
    let addr = start_server().await;
    create_scenario(addr, "demo").await;
    for session in ["s1", "s2", "s3"] {
        begin_session(addr, "demo", session, "record").await;
    }

    let (status, payload) = send(
        "POST",
        addr,
        "/api/v2/scenarios/objects/demo/action",
        json!({"end": "sessions"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(payload["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_delay_policy_lifecycle() {
    let addr = start_server().await;
    let policy = json!({"name": "slow", "delay_type": "fixed", "milliseconds": 100});

    let (status, payload) = send("PUT", addr, "/api/v2/delay-policy", policy.clone()).await;
    assert_eq!(status, 201);
    assert_eq!(payload["data"]["status"], json!("new"));

    let (status, payload) = send("PUT", addr, "/api/v2/delay-policy", policy).await;
    assert_eq!(status, 200);
    assert_eq!(payload["data"]["status"], json!("updated"));

    let (status, payload) = send("GET", addr, "/api/get/delay_policy?name=slow", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(payload["data"]["milliseconds"], json!(100));

    let (status, _) = send("GET", addr, "/api/delete/delay_policy?name=slow", json!({})).await;
    assert_eq!(status, 200);
    let (status, _) = send("GET", addr, "/api/delete/delay_policy?name=slow", json!({})).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_delay_policy_parameter_conflict_is_409() {
    let addr = start_server().await;
    let (status, _) = send(
        "PUT",
        addr,
        "/api/v2/delay-policy",
        json!({"name": "slow", "delay_type": "fixed", "milliseconds": 100, "mean": 5}),
    )
    .await;
    assert_eq!(status, 409);
}

#[tokio::test]
async fn test_rename_scenario_remaps_sessions() {
    let addr = start_server().await;
    create_scenario(addr, "old").await;
    begin_session(addr, "old", "s1", "record").await;

    let (status, payload) = send(
        "POST",
        addr,
        "/api/v2/scenarios/objects/old/action",
        json!({"rename": "renamed"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(payload["data"]["new"], json!("localhost:renamed"));
    assert_eq!(payload["Remapped sessions"], json!([{"name": "s1"}]));

    let (status, _) = send("GET", addr, "/api/v2/scenarios/objects/renamed", json!({})).await;
    assert_eq!(status, 200);
    let (status, _) = send("GET", addr, "/api/v2/scenarios/objects/old", json!({})).await;
    assert_eq!(status, 404);

    // Remapped sessions come back dormant.
    let (_, payload) = send("GET", addr, "/api/get/status?scenario=renamed", json!({})).await;
    assert_eq!(
        payload["data"]["sessions"],
        json!([{"session": "s1", "status": "dormant"}])
    );
}

#[tokio::test]
async fn test_rename_missing_scenario_short_circuits() {
    let addr = start_server().await;
    let (status, payload) = send(
        "POST",
        addr,
        "/api/v2/scenarios/objects/ghost/action",
        json!({"rename": "new"}),
    )
    .await;
    assert_eq!(status, 400);
    // Bare-string error, not a structured body.
    assert!(payload["error"].is_string());
    assert!(payload["error"].as_str().unwrap().contains("Scenario not found"));
}

#[tokio::test]
async fn test_module_lifecycle() {
    let addr = start_server().await;
    let (status, _) = send_raw(
        "PUT",
        addr,
        "/api/put/module?name=mod1",
        "fn transform() {}".to_string(),
        &[],
    )
    .await;
    assert_eq!(status, 201);

    let (status, _) = send_raw(
        "PUT",
        addr,
        "/api/put/module?name=mod1",
        "fn transform() {}".to_string(),
        &[],
    )
    .await;
    assert_eq!(status, 422);

    let (_, payload) = send("GET", addr, "/api/get/modulelist", json!({})).await;
    assert_eq!(payload["data"]["modules"], json!(["mod1"]));

    let (status, payload) = send("GET", addr, "/api/delete/module?name=mod1", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(payload["data"]["deleted"], json!(["mod1"]));

    let (_, payload) = send("GET", addr, "/api/get/modulelist", json!({})).await;
    assert_eq!(payload["data"]["modules"], json!([]));
}

#[tokio::test]
async fn test_status_reports_endpoint_metrics() {
    let addr = start_server().await;
    create_scenario(addr, "demo").await;
    begin_session(addr, "demo", "s1", "record").await;

    let (status, payload) = send("GET", addr, "/api/get/status", json!({})).await;
    assert_eq!(status, 200);
    assert!(payload["data"]["uptime_ms"].is_u64());
    assert_eq!(
        payload["data"]["endpoints"]["put/scenario"]["calls"],
        json!(1)
    );
    // Action requests are counted under their refined operation label.
    assert_eq!(
        payload["data"]["endpoints"]["begin/session"]["calls"],
        json!(1)
    );
}
