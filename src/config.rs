//! Configuration module for CodePrism.
//!
//! A layered configuration system:
//! - built-in defaults
//! - a TOML file discovered by walking up for a `.codeprism/` directory
//! - environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables are prefixed with `CODEPRISM_` and use a double
//! underscore to separate nested levels:
//! - `CODEPRISM_INDEXING__PARALLEL_THREADS=8` sets `indexing.parallel_threads`
//! - `CODEPRISM_LLM_PROVIDER=openai` sets `llm.provider`
//! - `CODEPRISM_SEARCH__MMR_LAMBDA=0.5` sets `search.mmr_lambda`

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding the relational store, FTS index, and vector blobs.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub flows: FlowConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,

    /// Port for an external MCP/HTTP transport layered on top of this crate.
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    /// `"openai"`, `"anthropic"`, or empty to disable LLM-backed generation
    /// entirely and fall back to structural card content.
    #[serde(default)]
    pub provider: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Minimum delay between successive calls through the orchestrator's
    /// rate-limiting queue.
    #[serde(default = "default_llm_delay_ms")]
    pub delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    #[serde(default = "default_true")]
    pub include_tests: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FlowConfig {
    #[serde(default = "default_pagerank_damping")]
    pub pagerank_damping: f64,

    #[serde(default = "default_pagerank_iterations")]
    pub pagerank_iterations: u32,

    #[serde(default = "default_hub_percentile")]
    pub hub_percentile: f64,

    #[serde(default = "default_hub_min_in_degree")]
    pub hub_min_in_degree: u32,

    #[serde(default = "default_louvain_seed")]
    pub louvain_seed: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    /// Weight given to the semantic (vector) score in fusion, in `[0, 1]`.
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,

    /// Weight given to the keyword (BM25) score in fusion, in `[0, 1]`.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    /// Multiplier applied to results that score on both signals.
    #[serde(default = "default_dual_hit_boost")]
    pub dual_hit_boost: f64,

    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f64,

    /// Blend weight for the optional cross-encoder reranker.
    #[serde(default = "default_rerank_blend")]
    pub rerank_blend: f64,

    #[serde(default = "default_true")]
    pub rerank_enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LanguageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub extensions: Vec<String>,
}

fn default_version() -> u32 {
    1
}
fn default_data_dir() -> PathBuf {
    PathBuf::from(".codeprism/data")
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_true() -> bool {
    true
}
fn default_port() -> u16 {
    7878
}
fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_llm_delay_ms() -> u64 {
    250
}

/// PageRank/Louvain constants supplemented for the flow detector (C4):
/// not named by the distilled spec, pinned here so a run is reproducible.
pub const PAGERANK_DAMPING: f64 = 0.85;
pub const PAGERANK_ITERATIONS: u32 = 50;
pub const HUB_PERCENTILE: f64 = 0.90;
pub const HUB_MIN_IN_DEGREE: u32 = 5;
pub const LOUVAIN_SEED: u64 = 0xC0DE_9152;

fn default_pagerank_damping() -> f64 {
    PAGERANK_DAMPING
}
fn default_pagerank_iterations() -> u32 {
    PAGERANK_ITERATIONS
}
fn default_hub_percentile() -> f64 {
    HUB_PERCENTILE
}
fn default_hub_min_in_degree() -> u32 {
    HUB_MIN_IN_DEGREE
}
fn default_louvain_seed() -> u64 {
    LOUVAIN_SEED
}
fn default_semantic_weight() -> f64 {
    0.7
}
fn default_keyword_weight() -> f64 {
    0.3
}
fn default_dual_hit_boost() -> f64 {
    1.2
}
fn default_mmr_lambda() -> f64 {
    0.7
}
fn default_rerank_blend() -> f64 {
    0.6
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            data_dir: default_data_dir(),
            llm: LlmConfig::default(),
            indexing: IndexingConfig::default(),
            flows: FlowConfig::default(),
            search: SearchConfig::default(),
            languages: default_languages(),
            port: default_port(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            api_key: String::new(),
            model: default_llm_model(),
            delay_ms: default_llm_delay_ms(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            ignore_patterns: vec![
                "target/**".to_string(),
                "node_modules/**".to_string(),
                ".git/**".to_string(),
                "dist/**".to_string(),
                "build/**".to_string(),
                "vendor/**".to_string(),
            ],
            include_tests: true,
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            pagerank_damping: default_pagerank_damping(),
            pagerank_iterations: default_pagerank_iterations(),
            hub_percentile: default_hub_percentile(),
            hub_min_in_degree: default_hub_min_in_degree(),
            louvain_seed: default_louvain_seed(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            dual_hit_boost: default_dual_hit_boost(),
            mmr_lambda: default_mmr_lambda(),
            rerank_blend: default_rerank_blend(),
            rerank_enabled: true,
        }
    }
}

fn default_languages() -> HashMap<String, LanguageConfig> {
    let mut langs = HashMap::new();
    for (name, exts) in [
        ("rust", vec!["rs"]),
        ("python", vec!["py", "pyi"]),
        ("ruby", vec!["rb", "rake", "gemspec"]),
        ("javascript", vec!["js", "jsx", "mjs", "cjs", "vue"]),
        ("typescript", vec!["ts", "tsx", "mts", "cts"]),
    ] {
        langs.insert(
            name.to_string(),
            LanguageConfig {
                enabled: true,
                extensions: exts.into_iter().map(String::from).collect(),
            },
        );
    }
    langs
}

impl Settings {
    /// Load configuration from all sources, discovering `.codeprism/` by
    /// walking up from the current directory.
    pub fn load() -> Result<Self, figment::Error> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(".codeprism/settings.toml"));
        Self::load_from(config_path)
    }

    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(".codeprism");
            if config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }
        None
    }

    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            if ancestor.join(".codeprism").is_dir() {
                return Some(ancestor.to_path_buf());
            }
        }
        None
    }

    /// Load configuration from a specific TOML file, still layering in
    /// defaults and `CODEPRISM_`-prefixed environment variables.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CODEPRISM_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(".codeprism/settings.toml");
        if !force && config_path.exists() {
            return Err("configuration file already exists, use --force to overwrite".into());
        }
        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
