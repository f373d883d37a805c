use std::{net::SocketAddr, sync::Arc};

use axum::{
  Router,
  body::Body,
  extract::ConnectInfo,
  http::{Request, StatusCode, header},
  response::Response,
};
use reqstats_core::{
  ABSENT, DimensionId, DimensionKind, FactId, NewRequestRecord, RecordingPolicy, ReqRespInfo,
  StatsMiddleware, StatsStore,
};
use reqstats_store_sqlite::SqliteStore;
use tower::ServiceExt;

use super::*;

const HOST: &str = "falconframework.org";
const USER_AGENT: &str = "curl/7.24.0 (x86_64-apple-darwin12.0)";

// ── Helpers ──────────────────────────────────────────────────────────────────

async fn make_state() -> StatsState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  StatsState::new(StatsMiddleware::new(Arc::new(store)))
}

fn app<S: StatsStore + 'static>(state: StatsState<S>) -> Router {
  with_stats(demo_routes(), state)
}

fn client_request(method: &str, uri: &str) -> axum::http::request::Builder {
  Request::builder()
    .method(method)
    .uri(uri)
    .header(header::HOST, HOST)
    .header(header::USER_AGENT, USER_AGENT)
}

async fn send(router: Router, builder: axum::http::request::Builder, body: Body) -> Response {
  let mut req = builder.body(body).unwrap();
  req
    .extensions_mut()
    .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 50000))));
  router.oneshot(req).await.unwrap()
}

async fn latest(state: &StatsState<SqliteStore>) -> ReqRespInfo {
  state.stats().store().latest().await.unwrap().expect("a recorded request")
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_stats_is_recorded() {
  let state = make_state().await;
  let resp = send(app(state.clone()), client_request("GET", "/stats"), Body::empty()).await;
  assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);

  let info = latest(&state).await;
  assert_eq!(info.dimensions.method, "GET");
  assert_eq!(info.dimensions.uri, "http://falconframework.org/stats");
  assert_eq!(info.dimensions.ip, "127.0.0.1");
  assert_eq!(info.dimensions.user_agent, USER_AGENT);
  assert_eq!(info.dimensions.status, "418 I'm a teapot");
  assert_eq!(info.dimensions.content_type, ABSENT);
  assert_eq!(info.content_length, None);
}

#[tokio::test]
async fn post_with_body_records_content() {
  let state = make_state().await;
  let builder = client_request("POST", "/stats")
    .header(header::CONTENT_TYPE, "text/plain");
  let resp = send(app(state.clone()), builder, Body::from("This is a test.")).await;
  assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);

  let info = latest(&state).await;
  assert_eq!(info.dimensions.method, "POST");
  assert_eq!(info.dimensions.content_type, "text/plain");
  assert_eq!(info.content_length, Some(15));
  assert_eq!(info.dimensions.status, "418 I'm a teapot");
}

#[tokio::test]
async fn unsupported_methods_are_recorded_as_405() {
  for method in ["PUT", "PATCH", "DELETE", "OPTIONS"] {
    let state = make_state().await;
    let resp = send(app(state.clone()), client_request(method, "/stats"), Body::empty()).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");

    let info = latest(&state).await;
    assert_eq!(info.dimensions.method, method);
    assert_eq!(info.dimensions.status, "405 Method Not Allowed");
    assert_eq!(info.dimensions.content_type, ABSENT);
    assert_eq!(info.content_length, None);
  }
}

#[tokio::test]
async fn head_is_recorded_with_its_own_method() {
  let state = make_state().await;
  send(app(state.clone()), client_request("HEAD", "/stats"), Body::empty()).await;

  let info = latest(&state).await;
  assert_eq!(info.dimensions.method, "HEAD");
  assert_eq!(info.dimensions.uri, "http://falconframework.org/stats");
}

#[tokio::test]
async fn unknown_route_is_recorded_as_404() {
  let state = make_state().await;
  let resp = send(app(state.clone()), client_request("GET", "/invalid"), Body::empty()).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let info = latest(&state).await;
  assert!(info.dimensions.uri.ends_with("/invalid"), "uri: {}", info.dimensions.uri);
  assert_eq!(info.dimensions.status, "404 Not Found");
}

#[tokio::test]
async fn each_request_gets_a_new_fact() {
  let state = make_state().await;
  let router = app(state.clone());
  send(router.clone(), client_request("GET", "/stats"), Body::empty()).await;
  let first = latest(&state).await;
  send(router, client_request("GET", "/stats"), Body::empty()).await;
  let second = latest(&state).await;

  assert!(second.id > first.id);
  assert_eq!(first.dimension_ids, second.dimension_ids);
}

#[tokio::test]
async fn missing_host_records_path_only() {
  let state = make_state().await;
  let req = Request::builder().uri("/stats").body(Body::empty()).unwrap();
  let resp = app(state.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);

  let info = latest(&state).await;
  assert_eq!(info.dimensions.uri, "/stats");
  assert_eq!(info.dimensions.ip, ABSENT);
  assert_eq!(info.dimensions.user_agent, ABSENT);
}

#[tokio::test]
async fn forwarded_for_is_used_without_connect_info() {
  let state = make_state().await;
  let req = Request::builder()
    .uri("/stats")
    .header(header::HOST, HOST)
    .header("x-forwarded-for", "203.0.113.9, 10.0.0.2")
    .header("x-forwarded-proto", "https")
    .body(Body::empty())
    .unwrap();
  app(state.clone()).oneshot(req).await.unwrap();

  let info = latest(&state).await;
  assert_eq!(info.dimensions.ip, "203.0.113.9");
  assert_eq!(info.dimensions.uri, "https://falconframework.org/stats");
}

#[tokio::test]
async fn configured_default_scheme_is_used() {
  let state = make_state().await.with_default_scheme("https");
  send(app(state.clone()), client_request("GET", "/stats"), Body::empty()).await;
  assert_eq!(latest(&state).await.dimensions.uri, "https://falconframework.org/stats");
}

#[tokio::test]
async fn concurrent_requests_share_a_new_user_agent_row() {
  let state = make_state().await;
  let router = app(state.clone());
  let ua = "reqstats-concurrency-probe/1.0";

  let tasks: Vec<_> = (0..16)
    .map(|_| {
      let router = router.clone();
      tokio::spawn(async move {
        let req = Request::builder()
          .uri("/stats")
          .header(header::HOST, HOST)
          .header(header::USER_AGENT, ua)
          .body(Body::empty())
          .unwrap();
        router.oneshot(req).await.unwrap().status()
      })
    })
    .collect();
  for task in tasks {
    assert_eq!(task.await.unwrap(), StatusCode::IM_A_TEAPOT);
  }

  let store = state.stats().store();
  assert_eq!(store.dimension_count(DimensionKind::UserAgent, ua).await.unwrap(), 1);
  assert_eq!(latest(&state).await.id, 16);
}

// ── Policy ───────────────────────────────────────────────────────────────────

/// Fails every write.
struct BrokenStore;

impl StatsStore for BrokenStore {
  type Error = std::io::Error;

  async fn get_or_create(&self, _: DimensionKind, _: &str) -> Result<DimensionId, Self::Error> {
    Err(std::io::Error::other("storage unavailable"))
  }

  async fn dimension_count(&self, _: DimensionKind, _: &str) -> Result<u64, Self::Error> {
    Err(std::io::Error::other("storage unavailable"))
  }

  async fn record_request(&self, _: NewRequestRecord) -> Result<ReqRespInfo, Self::Error> {
    Err(std::io::Error::other("storage unavailable"))
  }

  async fn get(&self, _: FactId) -> Result<Option<ReqRespInfo>, Self::Error> { Ok(None) }

  async fn latest(&self) -> Result<Option<ReqRespInfo>, Self::Error> { Ok(None) }
}

#[tokio::test]
async fn strict_failure_becomes_500() {
  let state = StatsState::new(StatsMiddleware::new(Arc::new(BrokenStore)));
  let resp = send(app(state), client_request("GET", "/stats"), Body::empty()).await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn lenient_failure_keeps_host_response() {
  let stats = StatsMiddleware::new(Arc::new(BrokenStore)).with_policy(RecordingPolicy::Lenient);
  let state = StatsState::new(stats);
  let resp = send(app(state), client_request("GET", "/stats"), Body::empty()).await;
  assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
}

#[tokio::test]
async fn state_from_config_applies_policy_and_scheme() {
  let config: StatsConfig = ::config::Config::builder()
    .add_source(::config::File::from_str(
      "debug = true\npolicy = \"lenient\"\ndefault_scheme = \"https\"",
      ::config::FileFormat::Toml,
    ))
    .build()
    .unwrap()
    .try_deserialize()
    .unwrap();

  let state = StatsState::from_config(Arc::new(BrokenStore), &config);
  assert_eq!(state.stats().policy(), RecordingPolicy::Lenient);
  let resp = send(app(state), client_request("GET", "/stats"), Body::empty()).await;
  assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
}
