//! codeprism: multi-repo code knowledge graph indexing and hybrid
//! retrieval for AI coding assistants.
//!
//! `orchestrator::Orchestrator::index_repo` builds the store from a
//! repo checkout; `api::search`/`api::context` are the query-time
//! surface; `sync` keeps an already-indexed store current as branches
//! change. Everything else — parsing, graph construction, flow
//! detection, card generation, embedding, specificity — is pure
//! library code these three entry points compose.

pub mod api;
pub mod cards;
pub mod config;
pub mod embedding;
pub mod error;
pub mod flows;
pub mod graph;
pub mod indexing;
pub mod logging;
pub mod orchestrator;
pub mod parsing;
pub mod roles;
pub mod search;
pub mod specificity;
pub mod storage;
pub mod sync;
pub mod types;
pub mod utils;

pub use api::{context, list_flows, save_insight, search, sync, verify_card, FlowSummary, SyncReport};
pub use cards::Card;
pub use config::Settings;
pub use error::{CoreError, CoreResult};
pub use orchestrator::{IndexReport, Orchestrator};
pub use storage::Store;
pub use types::*;
