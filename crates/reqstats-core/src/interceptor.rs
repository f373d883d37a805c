//! The two-phase timing hook bound to the request lifecycle.
//!
//! [`StatsMiddleware::on_request_start`] stamps a per-request
//! [`RequestContext`]; [`StatsMiddleware::on_response_end`] computes the
//! elapsed time once the host has settled the final response and records the
//! request through the injected [`StatsStore`].

use std::{sync::Arc, time::Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  dimension::{ABSENT, Dimensions},
  record::{NewRequestRecord, ReqRespInfo},
  store::StatsStore,
  summary::{self, RequestSummary},
};

// ─── Per-request data ────────────────────────────────────────────────────────

/// Mutable per-request scratch space owned by the host for one request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
  started: Option<Instant>,
}

impl RequestContext {
  pub fn started(&self) -> Option<Instant> { self.started }
}

/// Request attributes as the host saw them once the response was final.
///
/// Optional attributes are `None` when the request did not carry them; they
/// are recorded as [`ABSENT`].
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
  pub method:         String,
  pub scheme:         String,
  pub uri:            String,
  pub remote_ip:      Option<String>,
  pub user_agent:     Option<String>,
  pub content_type:   Option<String>,
  pub content_length: Option<u64>,
}

/// Final response attributes.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
  /// Full status line, e.g. `"405 Method Not Allowed"`.
  pub status: String,
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// What [`StatsMiddleware::finish`] does when recording fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingPolicy {
  /// Surface the failure to the host.
  #[default]
  Strict,
  /// Log a warning and carry on; the host response is unaffected.
  Lenient,
}

// ─── Middleware ──────────────────────────────────────────────────────────────

/// Records one fact per request into `S`.
///
/// Construct once at startup and share it (`Arc`) between concurrent
/// requests; each request owns its own [`RequestContext`].
pub struct StatsMiddleware<S> {
  store:  Arc<S>,
  policy: RecordingPolicy,
}

impl<S: StatsStore> StatsMiddleware<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, policy: RecordingPolicy::default() }
  }

  pub fn with_policy(mut self, policy: RecordingPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn policy(&self) -> RecordingPolicy { self.policy }

  /// Stamp the start time of the request owning `ctx`.
  pub fn on_request_start(&self, ctx: &mut RequestContext) {
    ctx.started = Some(Instant::now());
  }

  /// Compute the elapsed time and record the request.
  ///
  /// Must run after the host has determined the final status, including for
  /// routing failures. Fails with [`Error::MissingStartTime`] if `ctx` was
  /// never stamped; nothing is written in that case.
  pub async fn on_response_end(
    &self,
    ctx: &RequestContext,
    request: &RequestMeta,
    response: &ResponseMeta,
    succeeded: bool,
  ) -> Result<ReqRespInfo> {
    let started = ctx.started.ok_or(Error::MissingStartTime)?;
    let processed = started.elapsed();
    let date = Utc::now();

    let dimensions = Dimensions {
      user_agent:   or_absent(request.user_agent.as_deref()),
      uri:          request.uri.clone(),
      method:       request.method.clone(),
      ip:           or_absent(request.remote_ip.as_deref()),
      content_type: or_absent(request.content_type.as_deref()),
      status:       response.status.clone(),
    };

    let record = NewRequestRecord {
      date,
      processed,
      dimensions,
      content_length: request.content_length.filter(|&n| n > 0),
    };

    let info = self
      .store
      .record_request(record)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;

    tracing::trace!(fact_id = info.id, "recorded request");

    summary::emit(&RequestSummary {
      date:           info.date,
      processed:      info.processed,
      method:         &request.method,
      scheme:         &request.scheme,
      uri:            &request.uri,
      ip:             &info.dimensions.ip,
      user_agent:     &info.dimensions.user_agent,
      content_type:   &info.dimensions.content_type,
      content_length: info.content_length,
      status:         &response.status,
      succeeded,
    });

    Ok(info)
  }

  /// [`Self::on_response_end`] with the configured [`RecordingPolicy`]
  /// applied.
  ///
  /// Under [`RecordingPolicy::Lenient`] a storage failure is logged and
  /// `Ok(None)` is returned. [`Error::MissingStartTime`] is always returned.
  pub async fn finish(
    &self,
    ctx: &RequestContext,
    request: &RequestMeta,
    response: &ResponseMeta,
    succeeded: bool,
  ) -> Result<Option<ReqRespInfo>> {
    match self.on_response_end(ctx, request, response, succeeded).await {
      Ok(info) => Ok(Some(info)),
      Err(e @ Error::Store(_)) if self.policy == RecordingPolicy::Lenient => {
        tracing::warn!(
          method = %request.method,
          uri = %request.uri,
          "failed to record request stats: {e}"
        );
        Ok(None)
      }
      Err(e) => Err(e),
    }
  }
}

fn or_absent(value: Option<&str>) -> String {
  value.unwrap_or(ABSENT).to_owned()
}
