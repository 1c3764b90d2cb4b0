//! Integration tests for the server's HTTP endpoints and WebSocket session channel

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use diagnosis_lib::{
    health::{components, HealthRegistry},
    observability::{DiagnosisMetrics, StructuredLogger},
    ClassifierConfig, DiagnosisCoordinator, ProcessInvoker, SessionChannel, SessionRegistry,
};
use diagnosis_server::api::{self, AppState};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Classifier stand-in: answers by the first feature value
const STAND_IN_CLASSIFIER: &str = "read rows
read cols
read c0 rest
case \"$c0\" in
  1) echo '1 0 0' ;;
  2) echo '0 1 0' ;;
  *) echo '0 0 1' ;;
esac
";

async fn setup_state(classifier: ClassifierConfig) -> Arc<AppState> {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::CLASSIFIER).await;
    health_registry.register(components::SESSION_CHANNEL).await;

    let coordinator = DiagnosisCoordinator::new(Arc::new(ProcessInvoker::new(classifier)))
        .with_health(health_registry.clone());
    let channel = SessionChannel::new(
        SessionRegistry::new(),
        coordinator,
        StructuredLogger::new("test-node"),
    );

    Arc::new(AppState::new(
        health_registry,
        DiagnosisMetrics::new(),
        channel,
    ))
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let state = setup_state(ClassifierConfig::new(
        "/nonexistent/neuralnet",
        "/nonexistent/model",
    ))
    .await;
    let router = api::create_router(state.clone());

    (router, state)
}

/// Serve a stand-in classifier on an ephemeral port
async fn spawn_relay(
    dir: &tempfile::TempDir,
) -> (SocketAddr, Arc<AppState>, tokio::task::JoinHandle<anyhow::Result<()>>) {
    let script = dir.path().join("classifier.sh");
    std::fs::write(&script, STAND_IN_CLASSIFIER).unwrap();
    let state = setup_state(
        ClassifierConfig::new("sh", dir.path().join("model"))
            .with_leading_args([script.display().to_string()]),
    )
    .await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(api::serve_on(
        listener,
        state.clone(),
        std::future::pending::<()>(),
    ));

    (addr, state, server)
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    client
}

async fn send_vector(client: &mut WsClient, c0: &str) {
    let frame = serde_json::json!({
        "event": "diagnosis request",
        "data": {"c0": c0, "c1": "2", "c2": "3", "c3": "4", "c4": "5"}
    });
    client.send(Message::Text(frame.to_string())).await.unwrap();
}

/// Next JSON text frame, skipping control frames
async fn next_event(client: &mut WsClient) -> serde_json::Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(10), client.next())
            .await
            .expect("reply timed out")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn assert_no_further_event(client: &mut WsClient) {
    let extra = tokio::time::timeout(Duration::from_millis(300), client.next()).await;
    assert!(extra.is_err(), "unexpected extra frame: {:?}", extra);
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_index_serves_diagnosis_page() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = get(app, "/").await;
    assert_eq!(status, StatusCode::OK);

    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("/ws"));
    assert!(html.contains("\"diagnosis request\""));
    for field in ["c0", "c1", "c2", "c3", "c4"] {
        assert!(html.contains(&format!("name=\"{}\"", field)));
    }
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(health["components"].get("classifier").is_some());
}

#[tokio::test]
async fn test_healthz_returns_ok_when_classifier_degraded() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .set_degraded(components::CLASSIFIER, "classifier executable not found")
        .await;

    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "degraded");
    assert_eq!(
        health["components"]["classifier"]["message"],
        "classifier executable not found"
    );
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .set_unhealthy(components::SESSION_CHANNEL, "listener closed")
        .await;

    let (status, _) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_readyz_tracks_initialization() {
    let (app, state) = setup_test_app().await;

    let (status, body) = get(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], false);

    state.health_registry.set_ready(true).await;

    let (status, body) = get(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_relay_metrics() {
    let (app, state) = setup_test_app().await;
    state.metrics.set_active_sessions(0);
    state.metrics.inc_requests("success");

    let (status, body) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("diagnosis_active_sessions"));
    assert!(text.contains("diagnosis_requests_total"));
}

#[tokio::test]
async fn test_ws_requires_upgrade() {
    let (app, _state) = setup_test_app().await;

    let (status, _) = get(app, "/ws").await;
    assert!(status.is_client_error(), "unexpected status {}", status);
}

#[tokio::test]
async fn test_serve_on_real_listener_with_graceful_shutdown() {
    let (_, state) = setup_test_app().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(api::serve_on(listener, state, async move {
        let _ = stop_rx.await;
    }));

    let response = reqwest::get(format!("http://{}/healthz", addr)).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let health: serde_json::Value = response.json().await.unwrap();
    assert_eq!(health["status"], "healthy");

    stop_tx.send(()).unwrap();
    tokio_test::assert_ok!(server.await.unwrap());
}

#[tokio::test]
async fn test_ws_request_gets_results_frame() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _state, server) = spawn_relay(&dir).await;

    let mut client = connect(addr).await;
    send_vector(&mut client, "1").await;

    let event = next_event(&mut client).await;
    assert_eq!(event["event"], "results");
    assert_eq!(event["data"]["prediction"], "1 0 0");
    assert_eq!(event["data"]["label"], "euthyroidism");
    assert_no_further_event(&mut client).await;

    server.abort();
}

#[tokio::test]
async fn test_ws_malformed_frame_keeps_connection_open() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _state, server) = spawn_relay(&dir).await;

    let mut client = connect(addr).await;
    client
        .send(Message::Text("not json".to_string()))
        .await
        .unwrap();
    client
        .send(Message::Text(r#"{"event":"vote","data":{}}"#.to_string()))
        .await
        .unwrap();
    send_vector(&mut client, "2").await;

    let event = next_event(&mut client).await;
    assert_eq!(event["data"]["prediction"], "0 1 0");
    assert_eq!(event["data"]["label"], "hyperthyroidism");

    server.abort();
}

#[tokio::test]
async fn test_ws_clients_receive_only_their_own_reply() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _state, server) = spawn_relay(&dir).await;

    let mut first = connect(addr).await;
    let mut second = connect(addr).await;
    send_vector(&mut first, "1").await;
    send_vector(&mut second, "3").await;

    assert_eq!(next_event(&mut first).await["data"]["label"], "euthyroidism");
    assert_eq!(next_event(&mut second).await["data"]["label"], "hypothyroidism");
    assert_no_further_event(&mut first).await;
    assert_no_further_event(&mut second).await;

    server.abort();
}

#[tokio::test]
async fn test_ws_close_removes_session() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, state, server) = spawn_relay(&dir).await;

    let mut client = connect(addr).await;
    send_vector(&mut client, "1").await;
    next_event(&mut client).await;
    assert_eq!(state.channel.registry().len(), 1);

    client.close(None).await.unwrap();

    let removed = tokio::time::timeout(Duration::from_secs(5), async {
        while !state.channel.registry().is_empty() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(removed.is_ok(), "session still registered after close");

    server.abort();
}
