//! Extraction of [`RequestMeta`] and status lines from axum types.

use std::net::SocketAddr;

use axum::{
  body::HttpBody as _,
  extract::{ConnectInfo, Request},
  http::{HeaderMap, StatusCode, Uri, header},
};
use reqstats_core::RequestMeta;

/// Snapshot the attributes recorded for `req`.
///
/// Call before the request is handed to the inner service; the body is not
/// consumed.
pub fn request_meta(req: &Request, default_scheme: &str) -> RequestMeta {
  let headers = req.headers();

  let scheme = req
    .uri()
    .scheme_str()
    .map(str::to_owned)
    .or_else(|| first_value(headers, "x-forwarded-proto"))
    .unwrap_or_else(|| default_scheme.to_owned());

  let remote_ip = req
    .extensions()
    .get::<ConnectInfo<SocketAddr>>()
    .map(|ConnectInfo(addr)| addr.ip().to_string())
    .or_else(|| first_value(headers, "x-forwarded-for"));

  let content_length = header_str(headers, header::CONTENT_LENGTH.as_str())
    .and_then(|v| v.trim().parse::<u64>().ok())
    .or_else(|| req.body().size_hint().exact());

  RequestMeta {
    method: req.method().as_str().to_owned(),
    uri: absolute_uri(req.uri(), headers, &scheme),
    scheme,
    remote_ip,
    user_agent: header_str(headers, header::USER_AGENT.as_str()),
    content_type: header_str(headers, header::CONTENT_TYPE.as_str()),
    content_length,
  }
}

/// `"<code> <reason>"`, or just the code when it has no canonical reason.
pub fn status_line(status: StatusCode) -> String {
  match status.canonical_reason() {
    Some(reason) => format!("{} {reason}", status.as_u16()),
    None => status.as_u16().to_string(),
  }
}

/// A request succeeded unless routing failed (no route matched, or the route
/// does not accept the method) or the handler answered with a server error.
pub fn request_succeeded(route_matched: bool, status: StatusCode) -> bool {
  route_matched && status != StatusCode::METHOD_NOT_ALLOWED && !status.is_server_error()
}

/// Rebuild the URL the client asked for. Origin-form request targets are
/// combined with the `Host` header; without one only the path is kept.
fn absolute_uri(uri: &Uri, headers: &HeaderMap, scheme: &str) -> String {
  if uri.authority().is_some() {
    return uri.to_string();
  }
  let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
  match header_str(headers, header::HOST.as_str()) {
    Some(host) => format!("{scheme}://{host}{path}"),
    None => path.to_owned(),
  }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
  headers
    .get(name)
    .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

/// First comma-separated entry of a list-valued header.
fn first_value(headers: &HeaderMap, name: &str) -> Option<String> {
  let value = header_str(headers, name)?;
  let first = value.split(',').next()?.trim();
  (!first.is_empty()).then(|| first.to_owned())
}

#[cfg(test)]
mod tests {
  use axum::body::Body;

  use super::*;

  fn request(uri: &str, headers: &[(&str, &str)], body: Body) -> Request {
    let mut builder = axum::http::Request::builder().method("POST").uri(uri);
    for (k, v) in headers {
      builder = builder.header(*k, *v);
    }
    builder.body(body).unwrap()
  }

  #[test]
  fn origin_form_uses_host_header() {
    let req = request("/stats?x=1", &[("host", "falconframework.org")], Body::empty());
    let meta = request_meta(&req, "http");
    assert_eq!(meta.uri, "http://falconframework.org/stats?x=1");
    assert_eq!(meta.scheme, "http");
  }

  #[test]
  fn absolute_form_is_kept() {
    let req = request("https://example.com/a", &[], Body::empty());
    let meta = request_meta(&req, "http");
    assert_eq!(meta.uri, "https://example.com/a");
    assert_eq!(meta.scheme, "https");
  }

  #[test]
  fn no_host_keeps_path_only() {
    let req = request("/stats", &[], Body::empty());
    assert_eq!(request_meta(&req, "http").uri, "/stats");
  }

  #[test]
  fn forwarded_headers_fill_gaps() {
    let req = request(
      "/stats",
      &[
        ("host", "example.com"),
        ("x-forwarded-proto", "https"),
        ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
      ],
      Body::empty(),
    );
    let meta = request_meta(&req, "http");
    assert_eq!(meta.scheme, "https");
    assert_eq!(meta.uri, "https://example.com/stats");
    assert_eq!(meta.remote_ip.as_deref(), Some("203.0.113.7"));
  }

  #[test]
  fn connect_info_wins_over_forwarded_for() {
    let mut req = request("/stats", &[("x-forwarded-for", "203.0.113.7")], Body::empty());
    req
      .extensions_mut()
      .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))));
    assert_eq!(request_meta(&req, "http").remote_ip.as_deref(), Some("127.0.0.1"));
  }

  #[test]
  fn content_length_from_header_or_body() {
    let req = request("/", &[("content-length", "15")], Body::empty());
    assert_eq!(request_meta(&req, "http").content_length, Some(15));

    let req = request("/", &[], Body::from("This is a test."));
    assert_eq!(request_meta(&req, "http").content_length, Some(15));

    let req = request("/", &[], Body::empty());
    assert_eq!(request_meta(&req, "http").content_length, Some(0));
  }

  #[test]
  fn absent_headers_are_none() {
    let req = request("/", &[], Body::empty());
    let meta = request_meta(&req, "http");
    assert!(meta.user_agent.is_none());
    assert!(meta.content_type.is_none());
    assert!(meta.remote_ip.is_none());
  }

  #[test]
  fn status_lines() {
    assert_eq!(status_line(StatusCode::IM_A_TEAPOT), "418 I'm a teapot");
    assert_eq!(status_line(StatusCode::METHOD_NOT_ALLOWED), "405 Method Not Allowed");
    assert_eq!(status_line(StatusCode::from_u16(599).unwrap()), "599");
  }

  #[test]
  fn success_rules() {
    assert!(request_succeeded(true, StatusCode::IM_A_TEAPOT));
    assert!(!request_succeeded(false, StatusCode::NOT_FOUND));
    assert!(!request_succeeded(true, StatusCode::METHOD_NOT_ALLOWED));
    assert!(!request_succeeded(true, StatusCode::INTERNAL_SERVER_ERROR));
  }
}
