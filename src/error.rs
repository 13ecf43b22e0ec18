//! Error types for the indexing, storage, and search subsystems.
//!
//! One `thiserror`-derived enum per subsystem rather than a single
//! crate-wide error, plus `CoreError`, the type actually returned by the
//! public API (`search`, `context`, `sync`, `save_insight`, `verify_card`,
//! `list_flows`). None of the recoverable taxonomy below may surface as an
//! `Err` across that boundary — callers get a degraded but well-formed
//! `Ok`. Only a migration failure is fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from parsing a single source file. Always recoverable: the
/// caller skips the file, logs a warning, and keeps indexing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unsupported file type '{extension}' for '{path}'")]
    UnsupportedLanguage { path: PathBuf, extension: String },

    #[error("tree-sitter grammar rejected '{path}': {reason}")]
    GrammarError { path: PathBuf, reason: String },

    #[error("invalid UTF-8 in '{path}'")]
    InvalidUtf8 { path: PathBuf },
}

/// Errors from the relational/FTS/vector store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("sqlite operation failed during {operation}: {source}")]
    Sqlite {
        operation: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("migration {version} failed: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("card {id} not found")]
    CardNotFound { id: u32 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Recovery suggestions surfaced to an operator, not to library callers.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::MigrationFailed { .. } => vec![
                "the data directory may be from an incompatible version",
                "remove the store directory to rebuild from scratch",
            ],
            Self::Sqlite { .. } => vec![
                "check that the data directory is writable",
                "a forced reindex rebuilds the FTS index from the relational store",
            ],
            _ => vec![],
        }
    }
}

/// Errors from git-backed sync operations. Always logged and converted to
/// a successful-but-empty result before reaching a caller: a git hook must
/// never be blocked by a sync failure.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("sync already in progress for repo '{repo}'")]
    GcInProgress { repo: String },

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("store access failed during sync: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from embedding text. The caller skips the card from the vector
/// index; the card itself is still persisted and stays FTS-searchable.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("failed to embed text: {0}")]
    Embed(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors from an injected text generator. The caller falls back to
/// structural card content.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    RequestFailed(String),

    #[error("generation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// The error type returned by the crate's public API surface.
///
/// Constructing one of these is reserved for the fatal startup path;
/// everywhere else subsystem errors are logged and absorbed into a
/// degraded `Ok` result instead of propagated.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("store migration failed, refusing to start: {0}")]
    Migration(#[from] StorageError),

    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("{0}")]
    Other(String),
}

pub type ParseResult<T> = Result<T, ParseError>;
pub type StorageResult<T> = Result<T, StorageError>;
pub type SyncResult<T> = Result<T, SyncError>;
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;
pub type GenerationResult<T> = Result<T, GenerationError>;
pub type CoreResult<T> = Result<T, CoreError>;

/// Adds file-path context to a low-level error without discarding its source.
pub trait ErrorContext<T> {
    fn with_path(self, path: &std::path::Path) -> Result<T, ParseError>;
}

impl<T> ErrorContext<T> for Result<T, std::io::Error> {
    fn with_path(self, path: &std::path::Path) -> Result<T, ParseError> {
        self.map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}