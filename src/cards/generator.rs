//! Card assembly: structural content first, optional LLM replacement
//! second, always falling back to the structural content on error or
//! absence. A card is produced in both modes; it is never omitted.

use super::templates::TruncateToCardLimit;
use super::{Card, CardContent};
use crate::error::GenerationError;
use crate::types::CardType;
use tracing::warn;

/// The injected text-generation collaborator. Errors are always
/// recoverable from the caller's point of view: `generate_card` falls
/// back to structural content.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str, opts: &LlmCallOptions) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone)]
pub struct LlmCallOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: Option<String>,
}

impl Default for LlmCallOptions {
    fn default() -> Self {
        Self { max_tokens: 512, temperature: 0.2, system_prompt: None }
    }
}

pub struct GenerationOptions<'a> {
    pub text_generator: Option<&'a dyn TextGenerator>,
    pub now: i64,
}

/// Builds the final `Card` for one structural `CardContent`: the
/// structural markdown is produced unconditionally, then replaced by an
/// LLM completion if a generator is present and succeeds.
pub fn generate_card(
    content: CardContent,
    flow: &str,
    identifiers: String,
    tags: Vec<String>,
    source_files: Vec<String>,
    source_repos: Vec<String>,
    opts: &GenerationOptions,
) -> Card {
    let structural = content.render();
    let title = content.title.clone();
    let card_type = content.card_type();

    let body = match opts.text_generator {
        Some(generator) => {
            let prompt = role_specific_prompt(&content, &structural);
            let call_opts = LlmCallOptions {
                system_prompt: Some(system_prompt_for(card_type)),
                ..Default::default()
            };
            match generator.generate(&prompt, &call_opts) {
                Ok(generated) if !generated.trim().is_empty() => generated.truncate_to_card_limit(),
                Ok(_) => {
                    warn!(card = %title, "LLM returned empty completion, falling back to structural card");
                    structural
                }
                Err(err) => {
                    warn!(card = %title, error = %err, "LLM generation failed, falling back to structural card");
                    structural
                }
            }
        }
        None => structural,
    };

    Card::new(flow, title, body, card_type, source_files, source_repos, tags, identifiers, opts.now)
}

fn system_prompt_for(card_type: CardType) -> String {
    match card_type {
        CardType::Flow => "Summarize this logical subsystem for a developer skimming unfamiliar code.".to_string(),
        CardType::Hub => "Summarize this heavily-referenced file and the flows that depend on it.".to_string(),
        CardType::Model => "Summarize this data model and its associations.".to_string(),
        CardType::CrossService => "Summarize this frontend/backend API contract.".to_string(),
        _ => "Summarize this for a developer.".to_string(),
    }
}

fn role_specific_prompt(content: &CardContent, structural: &str) -> String {
    format!(
        "Title: {}\nSummary: {}\n\nStructural draft:\n{}\n\nRewrite this as a concise, self-contained markdown card.",
        content.title, content.summary, structural
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::templates::{CardVariant, SourceRef};

    struct FailingGenerator;
    impl TextGenerator for FailingGenerator {
        fn generate(&self, _prompt: &str, _opts: &LlmCallOptions) -> Result<String, GenerationError> {
            Err(GenerationError::Timeout(std::time::Duration::from_secs(5)))
        }
    }

    struct EchoGenerator;
    impl TextGenerator for EchoGenerator {
        fn generate(&self, _prompt: &str, _opts: &LlmCallOptions) -> Result<String, GenerationError> {
            Ok("llm generated body".to_string())
        }
    }

    struct OverlongGenerator;
    impl TextGenerator for OverlongGenerator {
        fn generate(&self, _prompt: &str, _opts: &LlmCallOptions) -> Result<String, GenerationError> {
            Ok("x".repeat(5000))
        }
    }

    fn sample_content() -> CardContent {
        CardContent {
            title: "Patient flow".to_string(),
            summary: "Handles patient records.".to_string(),
            sources: vec![SourceRef { path: "a.rb".to_string(), repo: "clinic".to_string(), snippet: None }],
            relationships: vec![],
            api_contracts: vec![],
            variant: CardVariant::Flow { flow_name: "patient".to_string() },
        }
    }

    #[test]
    fn falls_back_to_structural_on_generator_error() {
        let opts = GenerationOptions { text_generator: Some(&FailingGenerator), now: 0 };
        let card = generate_card(sample_content(), "patient", "Patient".to_string(), vec![], vec![], vec![], &opts);
        assert!(card.content.contains("Handles patient records."));
    }

    #[test]
    fn uses_llm_output_when_available() {
        let opts = GenerationOptions { text_generator: Some(&EchoGenerator), now: 0 };
        let card = generate_card(sample_content(), "patient", "Patient".to_string(), vec![], vec![], vec![], &opts);
        assert_eq!(card.content, "llm generated body");
    }

    #[test]
    fn llm_output_is_truncated_to_the_card_limit() {
        let opts = GenerationOptions { text_generator: Some(&OverlongGenerator), now: 0 };
        let card = generate_card(sample_content(), "patient", "Patient".to_string(), vec![], vec![], vec![], &opts);
        assert_eq!(card.content.len(), 4000);
    }

    #[test]
    fn card_is_never_omitted_without_a_generator() {
        let opts = GenerationOptions { text_generator: None, now: 0 };
        let card = generate_card(sample_content(), "patient", "Patient".to_string(), vec![], vec![], vec![], &opts);
        assert!(!card.content.is_empty());
    }
}
