//! Human-readable digest of a recorded request.
//!
//! Emission is best-effort: a digest that fails to format is reported at
//! `WARN` and dropped. It never affects the recording itself.

use std::{fmt::Write as _, time::Duration};

use chrono::{DateTime, Utc};

use crate::dimension::ABSENT;

/// `strftime` pattern for the `Date:` line (locale-style date and time).
pub const DATE_FORMAT: &str = "%c";

/// Raw field values of one request, as the host saw them.
#[derive(Debug, Clone)]
pub struct RequestSummary<'a> {
  pub date:           DateTime<Utc>,
  pub processed:      Duration,
  pub method:         &'a str,
  pub scheme:         &'a str,
  pub uri:            &'a str,
  pub ip:             &'a str,
  pub user_agent:     &'a str,
  pub content_type:   &'a str,
  pub content_length: Option<u64>,
  pub status:         &'a str,
  pub succeeded:      bool,
}

/// Render the fixed multi-line digest for `summary`.
pub fn format_summary(summary: &RequestSummary<'_>) -> Result<String, std::fmt::Error> {
  format_summary_with(summary, DATE_FORMAT)
}

fn format_summary_with(
  summary: &RequestSummary<'_>,
  date_format: &str,
) -> Result<String, std::fmt::Error> {
  let mut out = String::with_capacity(256);
  let millis = summary.processed.as_secs_f64() * 1000.0;

  writeln!(out)?;
  writeln!(out, "Date: {}", summary.date.format(date_format))?;
  writeln!(out, "Processing Time: {millis:.4}ms")?;
  writeln!(out, "Method: {}", summary.method)?;
  writeln!(out, "Scheme: {}", summary.scheme)?;
  writeln!(out, "URI: {}", summary.uri)?;
  writeln!(out, "IP: {}", summary.ip)?;
  writeln!(out, "User-Agent: {}", summary.user_agent)?;
  writeln!(out, "Content-Type: {}", summary.content_type)?;
  match summary.content_length {
    Some(n) => writeln!(out, "Content-Length: {n}")?,
    None => writeln!(out, "Content-Length: {ABSENT}")?,
  }
  writeln!(out, "Status: {}", summary.status)?;
  writeln!(out, "Success: {}", summary.succeeded)?;

  Ok(out)
}

/// Log the digest for `summary` at `DEBUG`.
pub fn emit(summary: &RequestSummary<'_>) {
  match format_summary(summary) {
    Ok(text) => tracing::debug!(target: "reqstats::summary", "{text}"),
    Err(e) => tracing::warn!(
      target: "reqstats::summary",
      uri = summary.uri,
      "failed to format request summary: {e}"
    ),
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  fn sample() -> RequestSummary<'static> {
    RequestSummary {
      date:           Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap(),
      processed:      Duration::from_micros(1_234_567),
      method:         "POST",
      scheme:         "http",
      uri:            "http://falconframework.org/stats",
      ip:             "127.0.0.1",
      user_agent:     "curl/7.24.0 (x86_64-apple-darwin12.0)",
      content_type:   "text/plain",
      content_length: Some(15),
      status:         "418 I'm a teapot",
      succeeded:      true,
    }
  }

  #[test]
  fn digest_has_every_line_in_order() {
    let text = format_summary(&sample()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, [
      "",
      "Date: Tue Mar  5 14:07:09 2024",
      "Processing Time: 1234.5670ms",
      "Method: POST",
      "Scheme: http",
      "URI: http://falconframework.org/stats",
      "IP: 127.0.0.1",
      "User-Agent: curl/7.24.0 (x86_64-apple-darwin12.0)",
      "Content-Type: text/plain",
      "Content-Length: 15",
      "Status: 418 I'm a teapot",
      "Success: true",
    ]);
  }

  #[test]
  fn absent_length_uses_marker() {
    let mut s = sample();
    s.content_length = None;
    let text = format_summary(&s).unwrap();
    assert!(text.contains("Content-Length: -\n"), "{text}");
  }

  #[test]
  fn bad_date_format_is_an_error_not_a_panic() {
    assert!(format_summary_with(&sample(), "%Q").is_err());
  }

  #[test]
  fn emit_swallows_format_errors() {
    // Nothing to assert beyond "does not panic"; emit has no return value.
    emit(&sample());
  }
}
