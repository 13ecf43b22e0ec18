//! Typed accessors over the sqlite tables from `schema.rs` (C7,
//! spec.md §4.6). All writes to `cards` happen here so the "write new
//! row, recompute embedding, refresh FTS, leave `usage_count` untouched"
//! sequencing from spec.md §4.6 is centralized in one place; callers
//! (the orchestrator, the sync engine) drive the sequencing, `Store`
//! just gives them transactional primitives.
//!
//! A single `parking_lot::Mutex<Connection>` stands in for "a single
//! writer task owns the exclusive write connection" (spec.md §5):
//! rusqlite's `Connection` is not `Sync`, and a real writer-task/reader-pool
//! split is an orchestration detail external to this store, not a
//! correctness requirement the tests below exercise.

use crate::cards::Card;
use crate::error::{StorageError, StorageResult};
use crate::graph::GraphEdge;
use crate::types::{CardType, RelationKind};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> StorageResult<Self> {
        Ok(Self { conn: Mutex::new(super::schema::open(path)?) })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self { conn: Mutex::new(super::schema::open_in_memory()?) })
    }

    /// Inserts or updates a card. If a row with the same `content_hash`
    /// and `flow` already exists, the write is skipped entirely (spec.md
    /// §3 invariant a: "an identical hash does not rewrite the row") and
    /// the existing id is returned with `usage_count` left untouched.
    pub fn upsert_card(&self, card: &mut Card) -> StorageResult<u32> {
        let conn = self.conn.lock();
        if let Some(id) = card.id {
            let existing_hash: Option<String> = conn
                .query_row("SELECT content_hash FROM cards WHERE id = ?1", params![id], |r| r.get(0))
                .optional()
                .map_err(|e| sqlite_err("select existing hash", e))?;
            if existing_hash.as_deref() == Some(card.content_hash.as_str()) {
                return Ok(id);
            }
            conn.execute(
                "UPDATE cards SET flow=?1, title=?2, content=?3, card_type=?4, source_files=?5, source_repos=?6,
                 tags=?7, identifiers=?8, valid_branches=?9, commit_sha=?10, stale=?11, specificity_score=?12,
                 content_hash=?13, updated_at=?14 WHERE id=?15",
                params![
                    card.flow,
                    card.title,
                    card.content,
                    card.card_type.as_str(),
                    to_json(&card.source_files),
                    to_json(&card.source_repos),
                    to_json(&card.tags),
                    card.identifiers,
                    card.valid_branches.as_ref().map(to_json),
                    card.commit_sha,
                    card.stale as i64,
                    card.specificity_score,
                    card.content_hash,
                    card.updated_at,
                    id,
                ],
            )
            .map_err(|e| sqlite_err("update card", e))?;
            Ok(id)
        } else {
            conn.execute(
                "INSERT INTO cards (flow, title, content, card_type, source_files, source_repos, tags, identifiers,
                 valid_branches, commit_sha, stale, usage_count, specificity_score, verified_at, verification_count,
                 content_hash, updated_at)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,0,?12,NULL,0,?13,?14)",
                params![
                    card.flow,
                    card.title,
                    card.content,
                    card.card_type.as_str(),
                    to_json(&card.source_files),
                    to_json(&card.source_repos),
                    to_json(&card.tags),
                    card.identifiers,
                    card.valid_branches.as_ref().map(to_json),
                    card.commit_sha,
                    card.stale as i64,
                    card.specificity_score,
                    card.content_hash,
                    card.updated_at,
                ],
            )
            .map_err(|e| sqlite_err("insert card", e))?;
            let id = conn.last_insert_rowid() as u32;
            card.id = Some(id);
            Ok(id)
        }
    }

    pub fn get_card(&self, id: u32) -> StorageResult<Option<Card>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM cards WHERE id = ?1", params![id], row_to_card)
            .optional()
            .map_err(|e| sqlite_err("get card", e))
    }

    pub fn all_cards(&self) -> StorageResult<Vec<Card>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM cards").map_err(|e| sqlite_err("prepare all_cards", e))?;
        let rows = stmt
            .query_map([], row_to_card)
            .map_err(|e| sqlite_err("query all_cards", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| sqlite_err("collect all_cards", e))?;
        Ok(rows)
    }

    pub fn cards_by_ids(&self, ids: &[u32]) -> StorageResult<Vec<Card>> {
        let mut cards = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(card) = self.get_card(id)? {
                cards.push(card);
            }
        }
        Ok(cards)
    }

    /// Marks every card whose `source_files` intersects `changed_files`
    /// as stale (spec.md §4.9). Returns the number of cards touched.
    pub fn mark_stale_for_files(&self, changed_files: &[String]) -> StorageResult<u32> {
        let cards = self.all_cards()?;
        let mut touched = 0;
        let conn = self.conn.lock();
        for card in cards {
            if card.source_files.iter().any(|f| changed_files.contains(f)) && !card.stale {
                conn.execute("UPDATE cards SET stale = 1 WHERE id = ?1", params![card.id.unwrap()])
                    .map_err(|e| sqlite_err("mark stale", e))?;
                touched += 1;
            }
        }
        Ok(touched)
    }

    pub fn increment_usage(&self, card_id: u32) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute("UPDATE cards SET usage_count = usage_count + 1 WHERE id = ?1", params![card_id])
            .map_err(|e| sqlite_err("increment usage", e))?;
        Ok(())
    }

    pub fn verify_card(&self, card_id: u32, verified_at: i64) -> StorageResult<bool> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE cards SET verified_at = ?1, verification_count = verification_count + 1 WHERE id = ?2",
                params![verified_at, card_id],
            )
            .map_err(|e| sqlite_err("verify card", e))?;
        Ok(changed > 0)
    }

    pub fn delete_card(&self, card_id: u32) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM cards WHERE id = ?1", params![card_id]).map_err(|e| sqlite_err("delete card", e))?;
        conn.execute("DELETE FROM card_embeddings WHERE card_id = ?1", params![card_id])
            .map_err(|e| sqlite_err("delete embedding", e))?;
        conn.execute("DELETE FROM card_title_embeddings WHERE card_id = ?1", params![card_id])
            .map_err(|e| sqlite_err("delete title embedding", e))?;
        Ok(())
    }

    pub fn update_specificity(&self, scores: &[(u32, f64)]) -> StorageResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(|e| sqlite_err("begin specificity tx", e))?;
        for (card_id, score) in scores {
            tx.execute("UPDATE cards SET specificity_score = ?1 WHERE id = ?2", params![score, card_id])
                .map_err(|e| sqlite_err("update specificity", e))?;
        }
        tx.commit().map_err(|e| sqlite_err("commit specificity tx", e))?;
        Ok(())
    }

    // -- graph_edges -------------------------------------------------

    pub fn replace_graph_edges(&self, repo: &str, edges: &[GraphEdge]) -> StorageResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(|e| sqlite_err("begin edges tx", e))?;
        tx.execute("DELETE FROM graph_edges WHERE repo = ?1", params![repo]).map_err(|e| sqlite_err("clear edges", e))?;
        insert_edges_tx(&tx, edges)?;
        tx.commit().map_err(|e| sqlite_err("commit edges tx", e))?;
        Ok(())
    }

    /// Inserts/replaces individual edges without touching any other edge
    /// already stored for their repo(s) — unlike `replace_graph_edges`,
    /// which wipes a whole repo's edge set first. Used by sync's `Full`
    /// propagation (spec.md §4.9), which only knows about the edges
    /// touching the files it just reparsed, not the complete graph.
    pub fn upsert_edges(&self, edges: &[GraphEdge]) -> StorageResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(|e| sqlite_err("begin edges tx", e))?;
        insert_edges_tx(&tx, edges)?;
        tx.commit().map_err(|e| sqlite_err("commit edges tx", e))?;
        Ok(())
    }

    /// Drops every edge touching any of `paths` on either endpoint,
    /// regardless of repo — an `api_endpoint` edge's two endpoints live in
    /// different repos, so a file that changed in one repo can invalidate
    /// an edge recorded under the other repo's name.
    pub fn delete_edges_touching_files(&self, paths: &[String]) -> StorageResult<u32> {
        if paths.is_empty() {
            return Ok(0);
        }
        let conn = self.conn.lock();
        let placeholders = vec!["?"; paths.len()].join(",");
        let sql = format!("DELETE FROM graph_edges WHERE source_file IN ({placeholders}) OR target_file IN ({placeholders})");
        let bound: Vec<&dyn rusqlite::ToSql> = paths.iter().chain(paths.iter()).map(|p| p as &dyn rusqlite::ToSql).collect();
        let removed = conn.execute(&sql, bound.as_slice()).map_err(|e| sqlite_err("delete edges touching files", e))?;
        Ok(removed as u32)
    }

    pub fn all_edges(&self) -> StorageResult<Vec<GraphEdge>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT source_file, target_file, relation, weight, repo, metadata FROM graph_edges")
            .map_err(|e| sqlite_err("prepare edges", e))?;
        let rows = stmt
            .query_map([], |row| {
                let relation_str: String = row.get(2)?;
                Ok(GraphEdge {
                    source_file: row.get(0)?,
                    target_file: row.get(1)?,
                    relation: parse_relation(&relation_str),
                    weight: row.get(3)?,
                    repo: row.get(4)?,
                    metadata: row.get(5)?,
                })
            })
            .map_err(|e| sqlite_err("query edges", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| sqlite_err("collect edges", e))?;
        Ok(rows)
    }

    // -- file_index ----------------------------------------------------

    pub fn upsert_file_index(&self, path: &str, repo: &str, branch: &str, commit_sha: &str, blob: Option<&[u8]>, updated_at: i64) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO file_index (path, repo, branch, commit_sha, parsed_data_blob, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6)
             ON CONFLICT(path, repo, branch) DO UPDATE SET commit_sha=excluded.commit_sha,
             parsed_data_blob=excluded.parsed_data_blob, updated_at=excluded.updated_at",
            params![path, repo, branch, commit_sha, blob, updated_at],
        )
        .map_err(|e| sqlite_err("upsert file_index", e))?;
        Ok(())
    }

    pub fn delete_file_index_for_branch(&self, repo: &str, branch: &str) -> StorageResult<u32> {
        let conn = self.conn.lock();
        let n = conn
            .execute("DELETE FROM file_index WHERE repo = ?1 AND branch = ?2", params![repo, branch])
            .map_err(|e| sqlite_err("delete file_index", e))?;
        Ok(n as u32)
    }

    pub fn live_branches(&self, repo: &str) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT DISTINCT branch FROM file_index WHERE repo = ?1")
            .map_err(|e| sqlite_err("prepare live_branches", e))?;
        let rows = stmt
            .query_map(params![repo], |r| r.get::<_, String>(0))
            .map_err(|e| sqlite_err("query live_branches", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| sqlite_err("collect live_branches", e))?;
        Ok(rows)
    }

    // -- metrics ---------------------------------------------------------

    pub fn insert_metrics_row(
        &self,
        timestamp: i64,
        query: &str,
        query_embedding: Option<&[u8]>,
        response_cards: &[u32],
        cache_hit: bool,
        latency_ms: i64,
        branch: Option<&str>,
    ) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO metrics (timestamp, query, query_embedding, response_cards, cache_hit, latency_ms, branch)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![timestamp, query, query_embedding, to_json(response_cards), cache_hit as i64, latency_ms, branch],
        )
        .map_err(|e| sqlite_err("insert metrics", e))?;
        Ok(())
    }

    /// Last 50 metrics rows with a non-null `query_embedding`, newest
    /// first, for the semantic cache (spec.md §4.7 step 1).
    pub fn recent_metrics_with_embedding(&self, limit: u32) -> StorageResult<Vec<(Vec<u8>, Vec<u32>)>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT query_embedding, response_cards FROM metrics
                 WHERE query_embedding IS NOT NULL ORDER BY id DESC LIMIT ?1",
            )
            .map_err(|e| sqlite_err("prepare recent_metrics", e))?;
        let rows = stmt
            .query_map(params![limit], |row| {
                let blob: Vec<u8> = row.get(0)?;
                let cards_json: String = row.get(1)?;
                Ok((blob, cards_json))
            })
            .map_err(|e| sqlite_err("query recent_metrics", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| sqlite_err("collect recent_metrics", e))?;
        Ok(rows.into_iter().map(|(blob, json)| (blob, from_json(&json))).collect())
    }

    // -- branch_events / repo_profiles -----------------------------------

    pub fn insert_branch_event(
        &self,
        branch: &str,
        ticket_id: Option<&str>,
        context_hint: &str,
        epic_branch: Option<&str>,
        sync_level: &str,
        created_at: i64,
    ) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO branch_events (branch, ticket_id, context_hint, epic_branch, sync_level, created_at)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![branch, ticket_id, context_hint, epic_branch, sync_level, created_at],
        )
        .map_err(|e| sqlite_err("insert branch_event", e))?;
        Ok(())
    }

    pub fn latest_branch_event(&self) -> StorageResult<Option<(String, Option<String>, String, Option<String>, String)>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT branch, ticket_id, context_hint, epic_branch, sync_level FROM branch_events ORDER BY id DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .optional()
        .map_err(|e| sqlite_err("latest branch_event", e))
    }

    pub fn try_begin_gc(&self, repo: &str) -> StorageResult<bool> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO repo_profiles (repo, gc_in_progress) VALUES (?1, 1)
             ON CONFLICT(repo) DO UPDATE SET gc_in_progress = 1 WHERE repo_profiles.gc_in_progress = 0",
            params![repo],
        )
        .map_err(|e| sqlite_err("try_begin_gc", e))?;
        let in_progress: i64 = conn
            .query_row("SELECT gc_in_progress FROM repo_profiles WHERE repo = ?1", params![repo], |r| r.get(0))
            .map_err(|e| sqlite_err("read gc flag", e))?;
        Ok(in_progress == 1)
    }

    pub fn end_gc(&self, repo: &str) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute("UPDATE repo_profiles SET gc_in_progress = 0 WHERE repo = ?1", params![repo])
            .map_err(|e| sqlite_err("end_gc", e))?;
        Ok(())
    }

    // -- project_docs ------------------------------------------------------

    pub fn upsert_project_doc(&self, repo: &str, doc_type: &str, title: &str, content: &str, sources: &[String], content_hash: &str) -> StorageResult<bool> {
        let conn = self.conn.lock();
        let existing: Option<String> = conn
            .query_row(
                "SELECT content_hash FROM project_docs WHERE repo = ?1 AND doc_type = ?2",
                params![repo, doc_type],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| sqlite_err("read project_doc hash", e))?;
        if existing.as_deref() == Some(content_hash) {
            return Ok(false);
        }
        conn.execute(
            "INSERT INTO project_docs (repo, doc_type, title, content, stale, source_file_paths, content_hash)
             VALUES (?1,?2,?3,?4,0,?5,?6)
             ON CONFLICT(repo, doc_type) DO UPDATE SET title=excluded.title, content=excluded.content,
             stale=0, source_file_paths=excluded.source_file_paths, content_hash=excluded.content_hash",
            params![repo, doc_type, title, content, to_json(sources), content_hash],
        )
        .map_err(|e| sqlite_err("upsert project_doc", e))?;
        Ok(true)
    }

    // -- card_interactions / heat -----------------------------------------

    pub fn record_interaction(&self, card_id: u32, occurred_at: i64, signal: f64) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO card_interactions (card_id, occurred_at, signal) VALUES (?1,?2,?3)",
            params![card_id, occurred_at, signal],
        )
        .map_err(|e| sqlite_err("record_interaction", e))?;
        Ok(())
    }

    pub fn get_heat(&self, path: &str, repo: &str) -> StorageResult<Option<f64>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT heat_score FROM file_heat WHERE path = ?1 AND repo = ?2", params![path, repo], |r| r.get(0))
            .optional()
            .map_err(|e| sqlite_err("get_heat", e))
    }

    pub fn set_heat(&self, path: &str, repo: &str, heat: f64) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO file_heat (path, repo, heat_score) VALUES (?1,?2,?3)
             ON CONFLICT(path, repo) DO UPDATE SET heat_score = excluded.heat_score",
            params![path, repo, heat],
        )
        .map_err(|e| sqlite_err("set_heat", e))?;
        Ok(())
    }

    // -- instance_profile / search_config ----------------------------------

    pub fn ensure_instance_profile(&self, uuid: &str, embedding_dim: u32) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO instance_profile (id, instance_uuid, embedding_dim) VALUES (1, ?1, ?2)",
            params![uuid, embedding_dim],
        )
        .map_err(|e| sqlite_err("ensure_instance_profile", e))?;
        Ok(())
    }

    pub fn set_search_config(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO search_config (key, value) VALUES (?1,?2) ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            params![key, value],
        )
        .map_err(|e| sqlite_err("set_search_config", e))?;
        Ok(())
    }

    pub fn get_search_config(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row("SELECT value FROM search_config WHERE key = ?1", params![key], |r| r.get(0))
            .optional()
            .map_err(|e| sqlite_err("get_search_config", e))
    }

    // -- card_embeddings / card_title_embeddings --------------------------

    pub fn upsert_card_embedding(&self, card_id: u32, vector: &[f32]) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO card_embeddings (card_id, dim, vector) VALUES (?1,?2,?3)
             ON CONFLICT(card_id) DO UPDATE SET dim=excluded.dim, vector=excluded.vector",
            params![card_id, vector.len() as i64, super::vectors::f32_to_bytes(vector)],
        )
        .map_err(|e| sqlite_err("upsert_card_embedding", e))?;
        Ok(())
    }

    pub fn upsert_card_title_embedding(&self, card_id: u32, vector: &[f32]) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO card_title_embeddings (card_id, dim, vector) VALUES (?1,?2,?3)
             ON CONFLICT(card_id) DO UPDATE SET dim=excluded.dim, vector=excluded.vector",
            params![card_id, vector.len() as i64, super::vectors::f32_to_bytes(vector)],
        )
        .map_err(|e| sqlite_err("upsert_card_title_embedding", e))?;
        Ok(())
    }

    /// Every `(card_id, content_vector, title_vector?)` triple, for the
    /// hybrid search's semantic stage and the specificity engine's
    /// centroid computation.
    pub fn all_card_embeddings(&self) -> StorageResult<Vec<(u32, Vec<f32>, Option<Vec<f32>>)>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT ce.card_id, ce.vector, te.vector FROM card_embeddings ce
                 LEFT JOIN card_title_embeddings te ON te.card_id = ce.card_id",
            )
            .map_err(|e| sqlite_err("prepare all_card_embeddings", e))?;
        let rows = stmt
            .query_map([], |row| {
                let card_id: i64 = row.get(0)?;
                let content: Vec<u8> = row.get(1)?;
                let title: Option<Vec<u8>> = row.get(2)?;
                Ok((card_id as u32, super::vectors::bytes_to_f32(&content), title.map(|t| super::vectors::bytes_to_f32(&t))))
            })
            .map_err(|e| sqlite_err("query all_card_embeddings", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| sqlite_err("collect all_card_embeddings", e))?;
        Ok(rows)
    }

    // -- cards_fts ---------------------------------------------------------

    /// Writes (or rewrites) the FTS row for one card. Called immediately
    /// after `upsert_card` for any card whose content actually changed
    /// (spec.md §4.6: "refresh the FTS index for that row").
    pub fn upsert_fts_row(&self, card: &Card) -> StorageResult<()> {
        let conn = self.conn.lock();
        let id = card.id.expect("card must be persisted before indexing into FTS");
        conn.execute("DELETE FROM cards_fts WHERE card_id = ?1", params![id]).map_err(|e| sqlite_err("clear fts row", e))?;
        conn.execute(
            "INSERT INTO cards_fts (card_id, title, content, flow, source_repos, tags, identifiers)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                id,
                card.title,
                card.content,
                card.flow,
                card.source_repos.join(" "),
                card.tags.join(" "),
                card.identifiers,
            ],
        )
        .map_err(|e| sqlite_err("insert fts row", e))?;
        Ok(())
    }

    pub fn delete_fts_row(&self, card_id: u32) -> StorageResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM cards_fts WHERE card_id = ?1", params![card_id]).map_err(|e| sqlite_err("delete fts row", e))?;
        Ok(())
    }

    /// BM25 search against the sanitized (already `OR`-joined, unquoted)
    /// query, weighted per spec.md §4.6's column weights: title 3.0,
    /// content 1.0, flow 2.0, source_repos 2.0, tags 1.5, identifiers 4.0.
    /// Lower bm25() scores are better matches; returned ascending.
    pub fn search_fts(&self, sanitized_query: &str, limit: u32) -> StorageResult<Vec<(u32, f64)>> {
        if sanitized_query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT card_id, bm25(cards_fts, 3.0, 1.0, 2.0, 2.0, 1.5, 4.0) AS rank
                 FROM cards_fts WHERE cards_fts MATCH ?1 ORDER BY rank LIMIT ?2",
            )
            .map_err(|e| sqlite_err("prepare search_fts", e))?;
        let rows = stmt
            .query_map(params![sanitized_query, limit], |row| Ok((row.get::<_, i64>(0)? as u32, row.get(1)?)))
            .map_err(|e| sqlite_err("query search_fts", e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| sqlite_err("collect search_fts", e))?;
        Ok(rows)
    }
}

fn sqlite_err(operation: &str, source: rusqlite::Error) -> StorageError {
    StorageError::Sqlite { operation: operation.to_string(), source }
}

fn insert_edges_tx(tx: &rusqlite::Transaction, edges: &[GraphEdge]) -> StorageResult<()> {
    for edge in edges {
        tx.execute(
            "INSERT OR REPLACE INTO graph_edges (source_file, target_file, relation, weight, repo, metadata)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![edge.source_file, edge.target_file, edge.relation.as_str(), edge.weight, edge.repo, edge.metadata],
        )
        .map_err(|e| sqlite_err("insert edge", e))?;
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: T) -> String {
    serde_json::to_string(&value).unwrap_or_else(|_| "[]".to_string())
}

fn from_json(value: &str) -> Vec<u32> {
    serde_json::from_str(value).unwrap_or_default()
}

fn parse_relation(s: &str) -> RelationKind {
    match s {
        "import" => RelationKind::Import,
        "model_association" => RelationKind::ModelAssociation,
        "route_controller" => RelationKind::RouteController,
        "controller_model" => RelationKind::ControllerModel,
        _ => RelationKind::ApiEndpoint,
    }
}

fn parse_card_type(s: &str) -> CardType {
    match s {
        "flow" => CardType::Flow,
        "hub" => CardType::Hub,
        "model" => CardType::Model,
        "cross_service" => CardType::CrossService,
        "dev_insight" => CardType::DevInsight,
        "conv_insight" => CardType::ConvInsight,
        _ => CardType::AutoGenerated,
    }
}

fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<Card> {
    let source_files: String = row.get("source_files")?;
    let source_repos: String = row.get("source_repos")?;
    let tags: String = row.get("tags")?;
    let valid_branches: Option<String> = row.get("valid_branches")?;
    let card_type: String = row.get("card_type")?;
    Ok(Card {
        id: Some(row.get::<_, i64>("id")? as u32),
        flow: row.get("flow")?,
        title: row.get("title")?,
        content: row.get("content")?,
        card_type: parse_card_type(&card_type),
        source_files: serde_json::from_str(&source_files).unwrap_or_default(),
        source_repos: serde_json::from_str(&source_repos).unwrap_or_default(),
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        identifiers: row.get("identifiers")?,
        valid_branches: valid_branches.and_then(|s| serde_json::from_str(&s).ok()),
        commit_sha: row.get("commit_sha")?,
        stale: row.get::<_, i64>("stale")? != 0,
        usage_count: row.get::<_, i64>("usage_count")? as u64,
        specificity_score: row.get("specificity_score")?,
        verified_at: row.get("verified_at")?,
        verification_count: row.get::<_, i64>("verification_count")? as u64,
        content_hash: row.get("content_hash")?,
        updated_at: row.get("updated_at")?,
    })
}
