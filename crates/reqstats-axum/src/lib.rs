//! axum adapter for request statistics.
//!
//! [`with_stats`] wraps every route of a [`Router`], including its 404 and
//! 405 fallbacks, with [`record_stats`], which drives the two lifecycle hooks
//! of a [`StatsMiddleware`] around the inner service.

pub mod backend;
pub mod config;
pub mod error;
pub mod meta;

pub use backend::Backend;
pub use config::{BackendConfig, StatsConfig};
pub use error::Error;

use std::sync::Arc;

use axum::{
  Router,
  extract::{MatchedPath, Request, State},
  http::StatusCode,
  middleware::{self, Next},
  response::{IntoResponse, Response},
  routing::get,
};
use reqstats_core::{RequestContext, ResponseMeta, StatsMiddleware, StatsStore};

// ─── Middleware state ────────────────────────────────────────────────────────

/// Shared state of the [`record_stats`] middleware.
pub struct StatsState<S> {
  stats:          Arc<StatsMiddleware<S>>,
  default_scheme: Arc<str>,
}

impl<S> Clone for StatsState<S> {
  fn clone(&self) -> Self {
    Self {
      stats:          self.stats.clone(),
      default_scheme: self.default_scheme.clone(),
    }
  }
}

impl<S: StatsStore> StatsState<S> {
  pub fn new(stats: StatsMiddleware<S>) -> Self {
    Self { stats: Arc::new(stats), default_scheme: Arc::from("http") }
  }

  /// Build the middleware for `store` with the policy and default scheme
  /// from `config`.
  pub fn from_config(store: Arc<S>, config: &StatsConfig) -> Self {
    let stats = StatsMiddleware::new(store).with_policy(config.policy);
    Self::new(stats).with_default_scheme(&config.default_scheme)
  }

  pub fn with_default_scheme(mut self, scheme: &str) -> Self {
    self.default_scheme = Arc::from(scheme);
    self
  }

  pub fn stats(&self) -> &StatsMiddleware<S> { &self.stats }
}

// ─── Router integration ──────────────────────────────────────────────────────

/// Record every request handled by `router`.
///
/// Call after all routes and fallbacks have been added.
pub fn with_stats<S, T>(router: Router<T>, state: StatsState<S>) -> Router<T>
where
  S: StatsStore + 'static,
  T: Clone + Send + Sync + 'static,
{
  router.layer(middleware::from_fn_with_state(state, record_stats::<S>))
}

/// Time the inner service and record the request once its response is final.
///
/// Under the strict policy a recording failure replaces the response with
/// `500 Internal Server Error`.
pub async fn record_stats<S>(
  State(state): State<StatsState<S>>,
  req: Request,
  next: Next,
) -> Response
where
  S: StatsStore + 'static,
{
  let mut ctx = RequestContext::default();
  state.stats.on_request_start(&mut ctx);

  let request = meta::request_meta(&req, &state.default_scheme);
  let matched = req.extensions().get::<MatchedPath>().is_some();

  let response = next.run(req).await;

  let status = response.status();
  let outcome = ResponseMeta { status: meta::status_line(status) };
  let succeeded = meta::request_succeeded(matched, status);

  match state.stats.finish(&ctx, &request, &outcome, succeeded).await {
    Ok(_) => response,
    Err(e) => {
      tracing::error!(method = %request.method, uri = %request.uri, "request stats not recorded: {e}");
      Error::Recording(e).into_response()
    }
  }
}

// ─── Demo routes ─────────────────────────────────────────────────────────────

/// `/stats`, answering GET and POST with `418 I'm a teapot`.
pub fn demo_routes() -> Router {
  Router::new().route("/stats", get(teapot).post(teapot))
}

async fn teapot() -> StatusCode { StatusCode::IM_A_TEAPOT }

#[cfg(test)]
mod tests;
