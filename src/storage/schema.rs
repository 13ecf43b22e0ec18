//! Forward-only, numbered sqlite migrations (C7, spec.md §4.6). Each
//! migration runs inside its own transaction; WAL mode is set once at
//! connection open, the same pragma discipline the teacher's
//! `storage/persistence.rs` uses for its own store file. A migration
//! failure is the one error class that is fatal at startup (spec.md §7f).

use crate::error::{StorageError, StorageResult};
use rusqlite::Connection;
use std::path::Path;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Opens (creating if necessary) the sqlite store at `path`, applies WAL
/// mode, and runs any outstanding migrations.
pub fn open(path: &Path) -> StorageResult<Connection> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let conn = Connection::open(path).map_err(|e| StorageError::Sqlite { operation: "open".to_string(), source: e })?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| StorageError::Sqlite { operation: "set journal_mode=WAL".to_string(), source: e })?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| StorageError::Sqlite { operation: "set foreign_keys=ON".to_string(), source: e })?;
    migrate(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> StorageResult<Connection> {
    let conn = Connection::open_in_memory().map_err(|e| StorageError::Sqlite { operation: "open_in_memory".to_string(), source: e })?;
    migrate(&conn)?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")
        .map_err(|e| StorageError::Sqlite { operation: "create schema_version".to_string(), source: e })?;

    let current: u32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))
        .unwrap_or(0);

    for version in (current + 1)..=CURRENT_SCHEMA_VERSION {
        run_migration(conn, version)?;
    }
    Ok(())
}

fn run_migration(conn: &Connection, version: u32) -> StorageResult<()> {
    let sql = migration_sql(version).ok_or_else(|| StorageError::MigrationFailed {
        version,
        reason: "no migration registered for this version".to_string(),
    })?;

    conn.execute_batch("BEGIN;")
        .map_err(|e| StorageError::MigrationFailed { version, reason: e.to_string() })?;

    let result = conn.execute_batch(sql).and_then(|_| {
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
        conn.execute_batch("COMMIT;")
    });

    if let Err(e) = result {
        let _ = conn.execute_batch("ROLLBACK;");
        return Err(StorageError::MigrationFailed { version, reason: e.to_string() });
    }
    Ok(())
}

fn migration_sql(version: u32) -> Option<&'static str> {
    match version {
        1 => Some(MIGRATION_1),
        _ => None,
    }
}

const MIGRATION_1: &str = r#"
CREATE TABLE cards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    flow TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    card_type TEXT NOT NULL,
    source_files TEXT NOT NULL,
    source_repos TEXT NOT NULL,
    tags TEXT NOT NULL,
    identifiers TEXT NOT NULL,
    valid_branches TEXT,
    commit_sha TEXT,
    stale INTEGER NOT NULL DEFAULT 0,
    usage_count INTEGER NOT NULL DEFAULT 0,
    specificity_score REAL NOT NULL DEFAULT 0,
    verified_at INTEGER,
    verification_count INTEGER NOT NULL DEFAULT 0,
    content_hash TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX idx_cards_flow ON cards(flow);
CREATE INDEX idx_cards_stale ON cards(stale);
CREATE INDEX idx_cards_content_hash ON cards(content_hash);

CREATE TABLE card_embeddings (
    card_id INTEGER PRIMARY KEY REFERENCES cards(id) ON DELETE CASCADE,
    dim INTEGER NOT NULL,
    vector BLOB NOT NULL
);

CREATE TABLE card_title_embeddings (
    card_id INTEGER PRIMARY KEY REFERENCES cards(id) ON DELETE CASCADE,
    dim INTEGER NOT NULL,
    vector BLOB NOT NULL
);

CREATE TABLE file_index (
    path TEXT NOT NULL,
    repo TEXT NOT NULL,
    branch TEXT NOT NULL,
    commit_sha TEXT NOT NULL,
    parsed_data_blob BLOB,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (path, repo, branch)
);

CREATE TABLE graph_edges (
    source_file TEXT NOT NULL,
    target_file TEXT NOT NULL,
    relation TEXT NOT NULL,
    weight REAL NOT NULL,
    repo TEXT NOT NULL,
    metadata TEXT,
    PRIMARY KEY (source_file, target_file, relation)
);

CREATE TABLE metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    dev_id TEXT,
    query TEXT NOT NULL,
    query_embedding BLOB,
    response_cards TEXT NOT NULL,
    cache_hit INTEGER NOT NULL DEFAULT 0,
    latency_ms INTEGER NOT NULL DEFAULT 0,
    branch TEXT
);
CREATE INDEX idx_metrics_timestamp ON metrics(timestamp);

CREATE TABLE branch_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    branch TEXT NOT NULL,
    ticket_id TEXT,
    context_hint TEXT,
    epic_branch TEXT,
    sync_level TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE project_docs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repo TEXT NOT NULL,
    doc_type TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    stale INTEGER NOT NULL DEFAULT 0,
    source_file_paths TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    UNIQUE(repo, doc_type)
);

CREATE TABLE repo_profiles (
    repo TEXT PRIMARY KEY,
    gc_in_progress INTEGER NOT NULL DEFAULT 0,
    last_synced_at INTEGER,
    default_branch TEXT
);

CREATE TABLE card_interactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    card_id INTEGER NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    occurred_at INTEGER NOT NULL,
    signal REAL NOT NULL
);
CREATE INDEX idx_card_interactions_card ON card_interactions(card_id);

CREATE TABLE file_heat (
    path TEXT NOT NULL,
    repo TEXT NOT NULL,
    heat_score REAL NOT NULL DEFAULT 0,
    PRIMARY KEY (path, repo)
);

CREATE TABLE instance_profile (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    instance_uuid TEXT NOT NULL,
    embedding_dim INTEGER NOT NULL
);

CREATE TABLE search_config (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- FTS5 index over cards.title/content/flow/source_repos/tags/identifiers.
-- Per-column BM25 weights (3.0, 1.0, 2.0, 2.0, 1.5, 4.0) are supplied at
-- query time via `bm25(cards_fts, ...)`. This is an external-content-free
-- FTS5 table keyed by an explicit `card_id` column; writers INSERT/DELETE
-- rows here directly alongside `cards` rather than relying on a trigger,
-- so a card write and its FTS row are updated in the same transaction.
CREATE VIRTUAL TABLE cards_fts USING fts5(
    card_id UNINDEXED,
    title,
    content,
    flow,
    source_repos,
    tags,
    identifiers,
    tokenize = 'porter unicode61'
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrates_fresh_store_to_current_version() {
        let conn = open_in_memory().unwrap();
        let version: u32 = conn.query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0)).unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
        conn.execute("INSERT INTO cards (flow, title, content, card_type, source_files, source_repos, tags, identifiers, content_hash, updated_at) VALUES ('f','t','c','flow','[]','[]','[]','',  'h', 0)", []).unwrap();
    }

    #[test]
    fn migrating_twice_is_a_no_op() {
        let conn = open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let count: u32 = conn.query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0)).unwrap();
        assert_eq!(count, CURRENT_SCHEMA_VERSION);
    }
}
