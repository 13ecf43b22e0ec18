//! C11 — orchestrator. Drives one repo through the full pipeline: walk
//! -> parse (C1/C2) -> graph (C3) -> flows (C4) -> cards (C5) -> embed
//! (C6) -> store (C7) -> specificity (C9). Every other module in this
//! crate is a pure function or a thin store accessor; this is the one
//! place that owns I/O ordering and concurrency.

use crate::cards::generator::{GenerationOptions, TextGenerator};
use crate::cards::{build_cards, AssembleInputs};
use crate::config::Settings;
use crate::embedding::{EmbedMode, Embedder};
use crate::error::{CoreError, CoreResult, ParseError};
use crate::flows::detect_flows;
use crate::graph::build_edges;
use crate::indexing::FileWalker;
use crate::parsing::{parse_file, ParsedFile, ParserFactory};
use crate::specificity::{self, CardEmbedding};
use crate::storage::Store;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Wraps a `TextGenerator` in the cooperative rate limit spec.md §4.10
/// asks for: a single inter-call delay shared across every caller, so a
/// parallel card-assembly pass never bursts past the configured
/// requests-per-second budget for a real LLM provider.
pub struct RateLimitedGenerator<'a> {
    inner: &'a dyn TextGenerator,
    min_delay: Duration,
    last_call: Mutex<Instant>,
}

impl<'a> RateLimitedGenerator<'a> {
    pub fn new(inner: &'a dyn TextGenerator, min_delay: Duration) -> Self {
        Self { inner, min_delay, last_call: Mutex::new(Instant::now() - min_delay) }
    }
}

impl TextGenerator for RateLimitedGenerator<'_> {
    fn generate(&self, prompt: &str, opts: &crate::cards::generator::LlmCallOptions) -> Result<String, crate::error::GenerationError> {
        {
            let mut last_call = self.last_call.lock().unwrap();
            let elapsed = last_call.elapsed();
            if elapsed < self.min_delay {
                std::thread::sleep(self.min_delay - elapsed);
            }
            *last_call = Instant::now();
        }
        self.inner.generate(prompt, opts)
    }
}

#[derive(Debug, Default, serde::Serialize)]
pub struct IndexReport {
    pub repo: String,
    pub files_parsed: usize,
    pub files_failed: usize,
    pub edges_built: usize,
    pub flows_detected: usize,
    pub cards_written: usize,
}

pub struct Orchestrator<'a> {
    pub settings: Arc<Settings>,
    pub store: &'a Store,
    pub embedder: &'a dyn Embedder,
    pub text_generator: Option<&'a dyn TextGenerator>,
    /// Every card-generation call is routed through this rather than
    /// `text_generator` directly, so the whole run — not each caller —
    /// shares one inter-call delay (spec.md §4.5/§4.10).
    rate_limited_generator: Option<RateLimitedGenerator<'a>>,
    /// Propagates cancellation through every suspension point the run
    /// owns (spec.md §5). Checked at batch boundaries, never mid-batch:
    /// a cancelled run finishes the parse batch or card-write batch it is
    /// currently in so no row is left torn, then stops before the next one.
    pub cancel: CancellationToken,
}

impl<'a> Orchestrator<'a> {
    pub fn new(settings: Arc<Settings>, store: &'a Store, embedder: &'a dyn Embedder, text_generator: Option<&'a dyn TextGenerator>) -> Self {
        let rate_limited_generator = text_generator
            .map(|inner| RateLimitedGenerator::new(inner, Duration::from_millis(settings.llm.delay_ms)));
        Self { settings, store, embedder, text_generator, rate_limited_generator, cancel: CancellationToken::new() }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the full pipeline for one repo rooted at `root`, named
    /// `repo` in every stored record. Parse failures are logged and
    /// skipped per-file (spec.md §4.1: a bad file never aborts the run);
    /// a store migration failure is the only thing that surfaces as
    /// `Err` here, matching the public-API invariant in `crate::error`.
    pub fn index_repo(&self, repo: &str, root: &Path, now: i64) -> CoreResult<IndexReport> {
        let run_id = now.to_string();
        let _span = crate::logging::run_span(repo, &run_id, "index").entered();

        let walker = FileWalker::new(self.settings.clone());
        let paths = walker.walk(root);

        let factory = ParserFactory::new(self.settings.clone());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.indexing.parallel_threads.max(1))
            .build()
            .map_err(|e| CoreError::Other(format!("failed to build parse thread pool: {e}")))?;

        let failed = AtomicU64::new(0);
        let (files, sources): (Vec<ParsedFile>, HashMap<String, String>) = pool.install(|| {
            use rayon::prelude::*;
            let parsed: Vec<(ParsedFile, String)> = paths
                .par_iter()
                .filter_map(|path| match parse_one(&factory, path, root, repo) {
                    Ok(Some(pair)) => Some(pair),
                    Ok(None) => None,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping file that failed to parse");
                        failed.fetch_add(1, Ordering::Relaxed);
                        None
                    }
                })
                .collect();
            let mut sources = HashMap::with_capacity(parsed.len());
            let mut files = Vec::with_capacity(parsed.len());
            for (file, content) in parsed {
                sources.insert(file.path.clone(), content);
                files.push(file);
            }
            (files, sources)
        });

        if self.cancel.is_cancelled() {
            tracing::info!(repo, parsed = files.len(), "run cancelled after parse batch, skipping graph/card/store phases");
            return Ok(IndexReport { repo: repo.to_string(), files_parsed: files.len(), files_failed: failed.load(Ordering::Relaxed) as usize, ..Default::default() });
        }

        let edges = build_edges(&files);
        self.store.replace_graph_edges(repo, &edges).map_err(CoreError::Migration)?;

        let flows = detect_flows(&files, &edges, &self.settings.flows);

        let inputs = AssembleInputs { flows: &flows, files: &files, edges: &edges, sources: &sources };
        let rate_limited: Option<&dyn TextGenerator> = self
            .rate_limited_generator
            .as_ref()
            .map(|g| g as &dyn TextGenerator);
        let generation_options = GenerationOptions { text_generator: rate_limited, now };
        let mut cards = build_cards(&inputs, &generation_options);

        for card in &mut cards {
            self.store.upsert_card(card).map_err(CoreError::Migration)?;
            self.store.upsert_fts_row(card).map_err(CoreError::Migration)?;

            match self.embedder.embed(&card.content, EmbedMode::Document) {
                Ok(vector) => {
                    if let Err(e) = self.store.upsert_card_embedding(card.id.unwrap(), &vector) {
                        tracing::warn!(card = card.id.unwrap(), error = %e, "failed to persist card embedding");
                    }
                }
                Err(e) => tracing::warn!(card = card.id.unwrap(), error = %e, "failed to embed card content"),
            }
            match self.embedder.embed(&card.title, EmbedMode::Document) {
                Ok(vector) => {
                    if let Err(e) = self.store.upsert_card_title_embedding(card.id.unwrap(), &vector) {
                        tracing::warn!(card = card.id.unwrap(), error = %e, "failed to persist title embedding");
                    }
                }
                Err(e) => tracing::warn!(card = card.id.unwrap(), error = %e, "failed to embed card title"),
            }
        }

        self.recompute_specificity()?;

        Ok(IndexReport {
            repo: repo.to_string(),
            files_parsed: files.len(),
            files_failed: failed.load(Ordering::Relaxed) as usize,
            edges_built: edges.len(),
            flows_detected: flows.len(),
            cards_written: cards.len(),
        })
    }

    /// Recomputes C9 specificity for every card currently in the store.
    /// The orchestrator calls this after a full reindex; the sync engine
    /// calls it after enough embeddings changed to matter (spec.md
    /// §4.8's "full reindex, or >= 5% of embeddings changed" trigger).
    pub fn recompute_specificity(&self) -> CoreResult<()> {
        let embeddings = self.store.all_card_embeddings().map_err(CoreError::Migration)?;
        let all_cards = self.store.all_cards().map_err(CoreError::Migration)?;
        let repos_by_id: HashMap<u32, Vec<String>> =
            all_cards.into_iter().filter_map(|c| c.id.map(|id| (id, c.source_repos))).collect();

        let snapshot: Vec<CardEmbedding> = embeddings
            .into_iter()
            .map(|(id, vector, _)| CardEmbedding { card_id: id, vector, repos: repos_by_id.get(&id).cloned().unwrap_or_default() })
            .collect();

        let scores = specificity::recompute(&snapshot);
        self.store.update_specificity(&scores).map_err(CoreError::Migration)
    }

    /// `Full`-level sync propagation (spec.md §4.9): finds every flow/hub
    /// card whose `source_files` intersects the files a git event
    /// changed, reparses that flow's *entire* file set fresh off disk
    /// (not just the changed files — an unchanged file's associations are
    /// still needed to regenerate an accurate card), rebuilds the edges
    /// those files participate in, and re-runs C5 for the affected flows.
    /// Called by `crate::api::sync` instead of `crate::sync`, which has no
    /// parser/graph/card dependency of its own.
    ///
    /// A flow whose card predates this crate storing `source_files` (or
    /// whose files no longer exist on disk) is silently skipped rather
    /// than regenerated with partial data. Returns the number of cards
    /// regenerated.
    pub fn reindex_changed_files(&self, repo: &str, root: &Path, changed_files: &[String], now: i64) -> CoreResult<u32> {
        if changed_files.is_empty() {
            return Ok(0);
        }
        let changed_set: HashMap<&str, ()> = changed_files.iter().map(|f| (f.as_str(), ())).collect();

        let all_cards = self.store.all_cards().map_err(CoreError::Migration)?;
        let mut affected: HashMap<String, std::collections::BTreeSet<String>> = HashMap::new();
        for card in &all_cards {
            let in_repo = card.source_repos.iter().any(|r| r == repo);
            let is_flow_or_hub = matches!(card.card_type, crate::types::CardType::Flow | crate::types::CardType::Hub);
            if in_repo && is_flow_or_hub && card.source_files.iter().any(|f| changed_set.contains_key(f.as_str())) {
                affected.entry(card.flow.clone()).or_default().extend(card.source_files.iter().cloned());
            }
        }
        if affected.is_empty() {
            return Ok(0);
        }

        let mut all_paths: std::collections::BTreeSet<String> = affected.values().flatten().cloned().collect();
        all_paths.extend(changed_files.iter().cloned());

        let factory = ParserFactory::new(self.settings.clone());
        let mut reparsed = Vec::new();
        let mut sources = HashMap::new();
        for relative in &all_paths {
            match parse_one(&factory, &root.join(relative), root, repo) {
                Ok(Some((file, content))) => {
                    sources.insert(file.path.clone(), content);
                    reparsed.push(file);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(path = relative, error = %e, "failed to reparse file during sync propagation"),
            }
        }
        if reparsed.is_empty() {
            return Ok(0);
        }

        // Cross-repo propagation: a changed file's route/api_call may have
        // moved or disappeared, so any edge that touched it (on either
        // side, in either repo) is dropped before the within-repo edges
        // visible to this reparse are written back.
        self.store.delete_edges_touching_files(changed_files).map_err(CoreError::Migration)?;
        let edges = build_edges(&reparsed);
        self.store.upsert_edges(&edges).map_err(CoreError::Migration)?;

        let flows: Vec<crate::flows::Flow> = affected
            .into_iter()
            .map(|(name, files)| {
                let files: Vec<String> = files.into_iter().filter(|f| all_paths.contains(f)).collect();
                let edge_count = edges
                    .iter()
                    .filter(|e| files.contains(&e.source_file) && files.contains(&e.target_file))
                    .count() as u32;
                let is_hub = all_cards
                    .iter()
                    .any(|c| c.flow == name && c.card_type == crate::types::CardType::Hub);
                crate::flows::Flow { name, files, repos: vec![repo.to_string()], edge_count, is_hub }
            })
            .collect();

        let inputs = AssembleInputs { flows: &flows, files: &reparsed, edges: &edges, sources: &sources };
        let rate_limited: Option<&dyn TextGenerator> = self
            .rate_limited_generator
            .as_ref()
            .map(|g| g as &dyn TextGenerator);
        let generation_options = GenerationOptions { text_generator: rate_limited, now };
        let mut cards = build_cards(&inputs, &generation_options);

        for card in &mut cards {
            self.store.upsert_card(card).map_err(CoreError::Migration)?;
            self.store.upsert_fts_row(card).map_err(CoreError::Migration)?;
            if let Ok(vector) = self.embedder.embed(&card.content, EmbedMode::Document) {
                if let Err(e) = self.store.upsert_card_embedding(card.id.unwrap(), &vector) {
                    tracing::warn!(card = card.id.unwrap(), error = %e, "failed to persist card embedding during sync");
                }
            }
        }

        Ok(cards.len() as u32)
    }
}

/// Ratio of changed embeddings, relative to the store's total card
/// count, above which a full specificity recompute is worth the cost
/// outside of a full reindex (spec.md §4.8).
pub const SPECIFICITY_RECOMPUTE_THRESHOLD: f64 = 0.05;

fn parse_one(factory: &ParserFactory, path: &Path, root: &Path, repo: &str) -> Result<Option<(ParsedFile, String)>, ParseError> {
    let relative = path.strip_prefix(root).unwrap_or(path).to_string_lossy().replace('\\', "/");
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Read { path: path.to_path_buf(), source })?;
    let parsed = parse_file(factory, &content, &relative, repo)?;
    Ok(parsed.map(|file| (file, content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::NullEmbedder;

    fn write_clinic_repo(root: &Path) {
        std::fs::create_dir_all(root.join("app/models")).unwrap();
        std::fs::create_dir_all(root.join("app/controllers")).unwrap();
        std::fs::write(
            root.join("app/models/patient.rb"),
            "class Patient < ApplicationRecord\n  has_many :devices\nend\n",
        )
        .unwrap();
        std::fs::write(
            root.join("app/models/device.rb"),
            "class Device < ApplicationRecord\n  belongs_to :patient\nend\n",
        )
        .unwrap();
        std::fs::write(
            root.join("app/controllers/patients_controller.rb"),
            "class PatientsController < ApplicationController\n  def show\n    @patient = Patient.find(params[:id])\n  end\nend\n",
        )
        .unwrap();
    }

    #[test]
    fn index_repo_runs_the_full_pipeline_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write_clinic_repo(dir.path());

        let store = Store::open_in_memory().unwrap();
        let embedder = NullEmbedder::with_dimension(8);
        let settings = Arc::new(Settings::default());
        let orchestrator = Orchestrator::new(settings, &store, &embedder, None);

        let report = orchestrator.index_repo("clinic", dir.path(), 1000).unwrap();
        assert_eq!(report.files_parsed, 3);
        assert_eq!(report.files_failed, 0);
        assert!(report.edges_built > 0);
        assert!(report.cards_written > 0);

        let cards = store.all_cards().unwrap();
        assert!(!cards.is_empty());
        // Every written card already has specificity recomputed in [0, 1].
        for card in &cards {
            assert!(card.specificity_score >= 0.0 && card.specificity_score <= 1.0);
        }
    }

    #[test]
    fn cancelling_before_parse_completes_skips_graph_and_store_phases() {
        let dir = tempfile::tempdir().unwrap();
        write_clinic_repo(dir.path());

        let store = Store::open_in_memory().unwrap();
        let embedder = NullEmbedder::with_dimension(8);
        let settings = Arc::new(Settings::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let orchestrator = Orchestrator::new(settings, &store, &embedder, None).with_cancellation(cancel);

        let report = orchestrator.index_repo("clinic", dir.path(), 1000).unwrap();
        assert_eq!(report.files_parsed, 3, "the in-flight parse batch still completes");
        assert_eq!(report.edges_built, 0);
        assert_eq!(report.cards_written, 0);
        assert!(store.all_cards().unwrap().is_empty());
        assert!(store.all_edges().unwrap().is_empty());
    }

    struct CountingGenerator {
        calls: Mutex<Vec<Instant>>,
    }

    impl TextGenerator for CountingGenerator {
        fn generate(&self, _prompt: &str, _opts: &crate::cards::generator::LlmCallOptions) -> Result<String, crate::error::GenerationError> {
            self.calls.lock().unwrap().push(Instant::now());
            Ok("generated".to_string())
        }
    }

    #[test]
    fn index_repo_routes_card_generation_through_the_shared_rate_limiter() {
        let dir = tempfile::tempdir().unwrap();
        write_clinic_repo(dir.path());

        let store = Store::open_in_memory().unwrap();
        let embedder = NullEmbedder::with_dimension(8);
        let mut settings = Settings::default();
        settings.llm.delay_ms = 40;
        let settings = Arc::new(settings);
        let generator = CountingGenerator { calls: Mutex::new(Vec::new()) };
        let orchestrator = Orchestrator::new(settings, &store, &embedder, Some(&generator));

        orchestrator.index_repo("clinic", dir.path(), 1000).unwrap();

        let calls = generator.calls.lock().unwrap();
        assert!(calls.len() >= 2, "expected multiple LLM calls across the cards this repo generates");
        for pair in calls.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(40), "successive LLM calls must be spaced by the configured delay");
        }
    }

    #[test]
    fn reindex_changed_files_regenerates_only_the_flow_the_change_touched() {
        let dir = tempfile::tempdir().unwrap();
        write_clinic_repo(dir.path());

        let store = Store::open_in_memory().unwrap();
        let embedder = NullEmbedder::with_dimension(8);
        let settings = Arc::new(Settings::default());
        let orchestrator = Orchestrator::new(settings, &store, &embedder, None);
        orchestrator.index_repo("clinic", dir.path(), 1000).unwrap();

        let edges_before = store.all_edges().unwrap().len();
        assert!(edges_before > 0);

        // Patient picks up a new association; the card for its flow should
        // be rewritten to reflect it.
        std::fs::write(
            dir.path().join("app/models/patient.rb"),
            "class Patient < ApplicationRecord\n  has_many :devices\n  has_many :appointments\nend\n",
        )
        .unwrap();

        let indexed = orchestrator
            .reindex_changed_files("clinic", dir.path(), &["app/models/patient.rb".to_string()], 2000)
            .unwrap();
        assert!(indexed > 0, "expected at least one card regenerated for the touched flow");
    }

    #[test]
    fn reindex_changed_files_is_a_no_op_for_an_untracked_file() {
        let dir = tempfile::tempdir().unwrap();
        write_clinic_repo(dir.path());

        let store = Store::open_in_memory().unwrap();
        let embedder = NullEmbedder::with_dimension(8);
        let settings = Arc::new(Settings::default());
        let orchestrator = Orchestrator::new(settings, &store, &embedder, None);
        orchestrator.index_repo("clinic", dir.path(), 1000).unwrap();

        let indexed = orchestrator
            .reindex_changed_files("clinic", dir.path(), &["app/models/nonexistent.rb".to_string()], 2000)
            .unwrap();
        assert_eq!(indexed, 0);
    }
}
