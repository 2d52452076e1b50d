//! SQL migration definitions for the intake database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: caller profiles with optimistic versioning",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One accumulated profile per caller
CREATE TABLE IF NOT EXISTS profiles (
    caller_id    TEXT PRIMARY KEY,
    profile_json TEXT NOT NULL,
    version      INTEGER NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Per-call history with scores and profile snapshots",
            sql: r#"
CREATE TABLE IF NOT EXISTS call_records (
    id           TEXT PRIMARY KEY,
    caller_id    TEXT NOT NULL,
    stage        INTEGER NOT NULL,
    completeness INTEGER NOT NULL,
    confidence   INTEGER NOT NULL,
    augmentation TEXT NOT NULL,
    profile_json TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_call_records_caller ON call_records(caller_id, created_at);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
