//! Store schema and migrations.

/// Migrations applied in order on open.
///
/// The `schema_version` table records how many of them have run.
pub const MIGRATIONS: &[&str] = &[
    // v1: delivered articles keyed by lowercased ID
    r#"
CREATE TABLE articles (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,           -- JSON snapshot of the article
    stored_at   TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v2: lookup by delivery time for auditing
    r#"
CREATE INDEX idx_articles_stored_at ON articles(stored_at);
"#,
];
