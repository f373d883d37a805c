//! SQL schema for the PostgreSQL stats store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// `VARCHAR` widths match [`reqstats_core::DimensionKind::max_len`]; values
/// are clamped before they reach the database.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS useragent (
    id   BIGSERIAL PRIMARY KEY,
    text VARCHAR(512) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS uri (
    id   BIGSERIAL PRIMARY KEY,
    text VARCHAR(512) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS method (
    id   BIGSERIAL PRIMARY KEY,
    text VARCHAR(10) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS ip (
    id   BIGSERIAL PRIMARY KEY,
    text VARCHAR(45) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS contenttype (
    id   BIGSERIAL PRIMARY KEY,
    text VARCHAR(255) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS httpstatus (
    id   BIGSERIAL PRIMARY KEY,
    text VARCHAR(255) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS stats (
    id              BIGSERIAL   PRIMARY KEY,
    date            TIMESTAMPTZ NOT NULL,
    processed       BIGINT      NOT NULL CHECK (processed >= 0),
    useragent_id    BIGINT      NOT NULL REFERENCES useragent(id),
    uri_id          BIGINT      NOT NULL REFERENCES uri(id),
    method_id       BIGINT      NOT NULL REFERENCES method(id),
    ip_id           BIGINT      NOT NULL REFERENCES ip(id),
    content_type_id BIGINT      NOT NULL REFERENCES contenttype(id),
    status_id       BIGINT      NOT NULL REFERENCES httpstatus(id),
    contentlength   BIGINT
);

CREATE INDEX IF NOT EXISTS stats_date_idx ON stats(date);
";

pub const INSERT_FACT: &str = "
INSERT INTO stats (
    date, processed,
    useragent_id, uri_id, method_id, ip_id, content_type_id, status_id,
    contentlength
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
RETURNING id
";

/// Columns selected by every fact read. Callers append a clause.
pub const SELECT_FACT: &str = "
SELECT
    s.id, s.date, s.processed, s.contentlength,
    s.useragent_id,    ua.text AS useragent,
    s.uri_id,          u.text  AS uri,
    s.method_id,       m.text  AS method,
    s.ip_id,           i.text  AS ip,
    s.content_type_id, ct.text AS contenttype,
    s.status_id,       st.text AS httpstatus
FROM stats s
JOIN useragent   ua ON ua.id = s.useragent_id
JOIN uri         u  ON u.id  = s.uri_id
JOIN method      m  ON m.id  = s.method_id
JOIN ip          i  ON i.id  = s.ip_id
JOIN contenttype ct ON ct.id = s.content_type_id
JOIN httpstatus  st ON st.id = s.status_id
";
