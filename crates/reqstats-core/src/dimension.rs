//! Dimension kinds: the six lookup tables a request is normalised into.
//!
//! Every dimension table has the same shape: a surrogate integer id and a
//! unique text value. Rows are created on first observation and never updated
//! or deleted, so a dimension table behaves like an accumulating dictionary.

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoStaticStr};

/// Text stored for a value the request did not carry (no `Content-Type`, no
/// `User-Agent`, unknown peer address, ...).
///
/// Absent values always resolve to a real row holding this marker; a fact
/// never carries a null foreign key.
pub const ABSENT: &str = "-";

/// Surrogate identifier of a dimension row.
pub type DimensionId = i64;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// One of the six dimension tables.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DimensionKind {
  UserAgent,
  Uri,
  Method,
  Ip,
  ContentType,
  Status,
}

impl DimensionKind {
  /// Name of the backing table. Stable across backends.
  pub fn table(self) -> &'static str {
    match self {
      Self::UserAgent => "useragent",
      Self::Uri => "uri",
      Self::Method => "method",
      Self::Ip => "ip",
      Self::ContentType => "contenttype",
      Self::Status => "httpstatus",
    }
  }

  /// Name of the foreign-key column in the `stats` table.
  pub fn fact_column(self) -> &'static str {
    match self {
      Self::UserAgent => "useragent_id",
      Self::Uri => "uri_id",
      Self::Method => "method_id",
      Self::Ip => "ip_id",
      Self::ContentType => "content_type_id",
      Self::Status => "status_id",
    }
  }

  /// Maximum length of the `text` column, in characters.
  pub fn max_len(self) -> usize {
    match self {
      Self::UserAgent | Self::Uri => 512,
      Self::Method => 10,
      // Long enough for any textual IPv6 address.
      Self::Ip => 45,
      Self::ContentType | Self::Status => 255,
    }
  }

  /// Clamp `text` to [`Self::max_len`] characters.
  ///
  /// Over-long values are cut on a character boundary so that the same input
  /// always normalises to the same row.
  pub fn normalize(self, text: &str) -> &str {
    match text.char_indices().nth(self.max_len()) {
      Some((end, _)) => &text[..end],
      None => text,
    }
  }
}

impl std::fmt::Display for DimensionKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name: &'static str = (*self).into();
    f.write_str(name)
  }
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// The raw text of all six dimensions for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
  pub user_agent:   String,
  pub uri:          String,
  pub method:       String,
  pub ip:           String,
  pub content_type: String,
  /// Full status line, e.g. `"418 I'm a teapot"`.
  pub status:       String,
}

impl Dimensions {
  pub fn get(&self, kind: DimensionKind) -> &str {
    match kind {
      DimensionKind::UserAgent => &self.user_agent,
      DimensionKind::Uri => &self.uri,
      DimensionKind::Method => &self.method,
      DimensionKind::Ip => &self.ip,
      DimensionKind::ContentType => &self.content_type,
      DimensionKind::Status => &self.status,
    }
  }

  pub fn get_mut(&mut self, kind: DimensionKind) -> &mut String {
    match kind {
      DimensionKind::UserAgent => &mut self.user_agent,
      DimensionKind::Uri => &mut self.uri,
      DimensionKind::Method => &mut self.method,
      DimensionKind::Ip => &mut self.ip,
      DimensionKind::ContentType => &mut self.content_type,
      DimensionKind::Status => &mut self.status,
    }
  }

  /// Clamp every value to its column width; see [`DimensionKind::normalize`].
  pub fn normalized(mut self) -> Self {
    for kind in <DimensionKind as strum::IntoEnumIterator>::iter() {
      let len = kind.normalize(self.get(kind)).len();
      self.get_mut(kind).truncate(len);
    }
    self
  }

  /// All six `(kind, text)` pairs, in table order.
  pub fn iter(&self) -> impl Iterator<Item = (DimensionKind, &str)> + '_ {
    <DimensionKind as strum::IntoEnumIterator>::iter()
      .map(move |kind| (kind, self.get(kind)))
  }
}

/// Resolved identifiers for all six dimensions of a single request.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct DimensionIds {
  pub user_agent:   DimensionId,
  pub uri:          DimensionId,
  pub method:       DimensionId,
  pub ip:           DimensionId,
  pub content_type: DimensionId,
  pub status:       DimensionId,
}

impl DimensionIds {
  pub fn get(&self, kind: DimensionKind) -> DimensionId {
    match kind {
      DimensionKind::UserAgent => self.user_agent,
      DimensionKind::Uri => self.uri,
      DimensionKind::Method => self.method,
      DimensionKind::Ip => self.ip,
      DimensionKind::ContentType => self.content_type,
      DimensionKind::Status => self.status,
    }
  }

  pub fn set(&mut self, kind: DimensionKind, id: DimensionId) {
    let slot = match kind {
      DimensionKind::UserAgent => &mut self.user_agent,
      DimensionKind::Uri => &mut self.uri,
      DimensionKind::Method => &mut self.method,
      DimensionKind::Ip => &mut self.ip,
      DimensionKind::ContentType => &mut self.content_type,
      DimensionKind::Status => &mut self.status,
    };
    *slot = id;
  }
}
