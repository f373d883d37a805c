//! SQL schema for the SQLite stats store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Dimension tables share one shape. `text` is `UNIQUE` so get-or-create can
/// rely on `ON CONFLICT` instead of a read-then-write race.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS useragent (
    id   INTEGER PRIMARY KEY,
    text TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS uri (
    id   INTEGER PRIMARY KEY,
    text TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS method (
    id   INTEGER PRIMARY KEY,
    text TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS ip (
    id   INTEGER PRIMARY KEY,
    text TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS contenttype (
    id   INTEGER PRIMARY KEY,
    text TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS httpstatus (
    id   INTEGER PRIMARY KEY,
    text TEXT NOT NULL UNIQUE
);

-- One row per request. Strictly append-only.
-- AUTOINCREMENT keeps ids monotonic and never reused.
CREATE TABLE IF NOT EXISTS stats (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    date            TEXT    NOT NULL,   -- RFC 3339 UTC; response completion
    processed       INTEGER NOT NULL CHECK (processed >= 0),  -- microseconds
    useragent_id    INTEGER NOT NULL REFERENCES useragent(id),
    uri_id          INTEGER NOT NULL REFERENCES uri(id),
    method_id       INTEGER NOT NULL REFERENCES method(id),
    ip_id           INTEGER NOT NULL REFERENCES ip(id),
    content_type_id INTEGER NOT NULL REFERENCES contenttype(id),
    status_id       INTEGER NOT NULL REFERENCES httpstatus(id),
    contentlength   INTEGER
);

CREATE INDEX IF NOT EXISTS stats_date_idx ON stats(date);

PRAGMA user_version = 1;
";

/// Columns selected by every fact read, joined back to dimension text.
/// Callers append a `WHERE`/`ORDER BY` clause.
pub const SELECT_FACT: &str = "
SELECT
    s.id, s.date, s.processed, s.contentlength,
    s.useragent_id,    ua.text,
    s.uri_id,          u.text,
    s.method_id,       m.text,
    s.ip_id,           i.text,
    s.content_type_id, ct.text,
    s.status_id,       st.text
FROM stats s
JOIN useragent   ua ON ua.id = s.useragent_id
JOIN uri         u  ON u.id  = s.uri_id
JOIN method      m  ON m.id  = s.method_id
JOIN ip          i  ON i.id  = s.ip_id
JOIN contenttype ct ON ct.id = s.content_type_id
JOIN httpstatus  st ON st.id = s.status_id
";
