//! Unified logging for debug output.
//!
//! Compact timestamped logging, `RUST_LOG`-controlled, quiet (`warn`) by
//! default so a library embedder doesn't get flooded on first use.
//!
//! ```bash
//! RUST_LOG=debug codeprism index
//! RUST_LOG=codeprism::sync=trace codeprism sync
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: Once = Once::new();

struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Initialize logging. Call once at startup; safe to call more than once,
/// only the first call takes effect. `RUST_LOG` always takes precedence
/// over the `warn`-level default.
pub fn init() {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new("warn")
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Opens a span correlating every log line emitted during one indexing or
/// sync run across C1-C9, so a run's output can be grepped by `run_id`.
pub fn run_span(repo: &str, run_id: &str, phase: &str) -> tracing::Span {
    tracing::info_span!("run", repo = repo, run_id = run_id, phase = phase)
}

/// Log a parse failure (error taxonomy a). Always a warning, never a panic.
#[macro_export]
macro_rules! log_parse_skip {
    ($path:expr, $reason:expr) => {
        tracing::warn!(path = %$path.display(), reason = %$reason, "skipping file, parse failed");
    };
}

/// Log a text-generation fallback (error taxonomy b).
#[macro_export]
macro_rules! log_generation_fallback {
    ($card_kind:expr, $reason:expr) => {
        tracing::warn!(card_kind = %$card_kind, reason = %$reason, "text generation failed, using structural card content");
    };
}

/// Log an embedding skip (error taxonomy c).
#[macro_export]
macro_rules! log_embedding_skip {
    ($card_id:expr, $reason:expr) => {
        tracing::warn!(card_id = %$card_id, reason = %$reason, "skipping vector index for card, FTS still available");
    };
}
