use clap::{Parser, Subcommand};
use codeprism::embedding::{FastEmbedEmbedder, NullEmbedder};
use codeprism::orchestrator::Orchestrator;
use codeprism::search::SearchOptions;
use codeprism::types::CardType;
use codeprism::{Settings, Store};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "codeprism")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-repo code knowledge graph: indexing and hybrid retrieval for AI coding assistants")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a `.codeprism/settings.toml` configuration file
    Init {
        /// Force overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Index a repo checkout into the store
    Index {
        /// Name this repo is recorded under (cross-repo card grouping key)
        repo: String,

        /// Path to the repo's checkout
        path: PathBuf,

        /// Skip loading a real embedding model; use a deterministic fake
        #[arg(long)]
        no_embeddings: bool,
    },

    /// Hybrid search over indexed cards
    Search {
        query: String,

        /// Restrict results to cards valid for this branch
        #[arg(short, long)]
        branch: Option<String>,

        /// Maximum number of cards to return
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// HyDE-style context retrieval: a markdown bundle for a task description
    Context {
        description: String,

        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Save a developer- or conversation-authored insight as a card
    SaveInsight {
        #[arg(long)]
        flow: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        content: String,

        /// "dev_insight" or "conv_insight"
        #[arg(long, default_value = "dev_insight")]
        card_type: String,
    },

    /// Mark a card as human-verified
    VerifyCard {
        card_id: u32,
    },

    /// List detected flows and their card counts
    ListFlows,

    /// Apply a git sync event (checkout/merge/pull/rebase/save) to the store
    Sync {
        /// Name this repo is recorded under
        repo: String,

        /// Path to the repo's checkout, used to reparse changed files at `full` sync level
        path: PathBuf,

        branch: String,

        /// "checkout" | "merge" | "pull" | "rebase" | "save"
        #[arg(long, default_value = "save")]
        event: String,

        /// Repo-relative paths of files changed since the last sync
        #[arg(long = "changed", value_delimiter = ',')]
        changed_files: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    codeprism::logging::init();
    let cli = Cli::parse();
    let settings = Arc::new(Settings::load().unwrap_or_default());
    let store = Store::open(&settings.data_dir.join("codeprism.db"))?;
    let now = codeprism::utils::get_utc_timestamp() as i64;

    match cli.command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force).map_err(|e| anyhow::anyhow!(e))?;
            println!("wrote {}", path.display());
        }

        Commands::Index { repo, path, no_embeddings } => {
            if no_embeddings {
                let embedder = NullEmbedder::default();
                run_index(&settings, &store, &embedder, &repo, &path, now)?;
            } else {
                let embedder = FastEmbedEmbedder::new()?;
                run_index(&settings, &store, &embedder, &repo, &path, now)?;
            }
        }

        Commands::Search { query, branch, limit } => {
            let embedder = NullEmbedder::default();
            let options = SearchOptions { branch, limit, debug: false };
            let outcome = codeprism::search(&store, &embedder, None, &settings.search, &query, &options, now);
            if outcome.cache_hit {
                println!("(served from semantic cache)");
            }
            for card in outcome.cards {
                println!("# {} [{}]", card.title, card.card_type);
                println!("{}\n", card.content);
            }
        }

        Commands::Context { description, branch } => {
            let embedder = NullEmbedder::default();
            let bundle = codeprism::context(&store, &embedder, None, &settings.search, &description, branch.as_deref(), now);
            println!("{bundle}");
        }

        Commands::SaveInsight { flow, title, content, card_type } => {
            let card_type = match card_type.as_str() {
                "conv_insight" => CardType::ConvInsight,
                _ => CardType::DevInsight,
            };
            let card = codeprism::save_insight(&store, &flow, &title, &content, card_type, vec![], vec![], vec![], now)?;
            println!("saved card #{}", card.id.unwrap());
        }

        Commands::VerifyCard { card_id } => {
            let verified = codeprism::verify_card(&store, card_id, now)?;
            println!("{}", if verified { "verified" } else { "card not found" });
        }

        Commands::ListFlows => {
            for flow in codeprism::list_flows(&store) {
                let marker = if flow.is_hub { "hub" } else { "flow" };
                println!("{:<8} {:<30} {} cards", marker, flow.name, flow.card_count);
            }
        }

        Commands::Sync { repo, path, branch, event, changed_files } => {
            let event_type = match event.as_str() {
                "checkout" => codeprism::SyncEventType::Checkout,
                "merge" => codeprism::SyncEventType::Merge,
                "pull" => codeprism::SyncEventType::Pull,
                "rebase" => codeprism::SyncEventType::Rebase,
                _ => codeprism::SyncEventType::Save,
            };
            let embedder = NullEmbedder::default();
            let orchestrator = Orchestrator::new(settings.clone(), &store, &embedder, None);
            let report = codeprism::sync(&orchestrator, &repo, &path, &branch, event_type, &changed_files, now);
            println!("indexed {} cards, invalidated {} cards", report.indexed, report.invalidated);
        }
    }

    Ok(())
}

fn run_index(
    settings: &Arc<Settings>,
    store: &Store,
    embedder: &dyn codeprism::embedding::Embedder,
    repo: &str,
    path: &std::path::Path,
    now: i64,
) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(settings.clone(), store, embedder, None);
    let report = orchestrator.index_repo(repo, path, now)?;
    println!(
        "{}: {} files parsed ({} failed), {} edges, {} flows, {} cards",
        report.repo, report.files_parsed, report.files_failed, report.edges_built, report.flows_detected, report.cards_written
    );
    Ok(())
}
