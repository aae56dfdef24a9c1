// src/core/finalizer.rs — Final answer generation and citation restoration

use std::sync::Arc;

use super::conversation::research_topic;
use super::prompts::PromptLibrary;
use super::types::{ResearchState, Source};
use crate::provider::{GenerationRequest, GenerationService, TokenUsage};

pub const ANSWER_ERROR_TEXT: &str = "Error generating final answer.";

#[derive(Debug, Clone, PartialEq)]
pub struct FinalAnswer {
    pub text: String,
    pub sources: Vec<Source>,
    pub usage: TokenUsage,
}

/// Replace every cited short id in `text` with its real URL and keep only
/// the sources that were cited, in their original order.
///
/// Longer ids are substituted first so an id that is a prefix of another
/// (`…/id/1-1` vs `…/id/1-10`) cannot rewrite part of it.
pub fn restore_citations(text: &str, sources: &[Source]) -> (String, Vec<Source>) {
    let mut by_len: Vec<(usize, &Source)> = sources
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.short_id.is_empty() && !s.url.is_empty())
        .collect();
    by_len.sort_by(|a, b| b.1.short_id.len().cmp(&a.1.short_id.len()));

    let mut out = text.to_string();
    let mut used: Vec<usize> = Vec::new();
    for (idx, source) in by_len {
        if out.contains(&source.short_id) {
            out = out.replace(&source.short_id, &source.url);
            used.push(idx);
        }
    }
    used.sort_unstable();

    let kept = used.into_iter().map(|i| sources[i].clone()).collect();
    (out, kept)
}

pub struct AnswerFinalizer {
    service: Arc<dyn GenerationService>,
    prompts: Arc<PromptLibrary>,
    model_id: String,
    temperature: f32,
}

impl AnswerFinalizer {
    pub fn new(
        service: Arc<dyn GenerationService>,
        prompts: Arc<PromptLibrary>,
        model_id: String,
        temperature: f32,
    ) -> Self {
        Self {
            service,
            prompts,
            model_id,
            temperature,
        }
    }

    /// Write the answer from everything gathered. On failure the text is a
    /// fixed error string and all gathered sources are returned unfiltered.
    pub async fn finalize(&self, state: &ResearchState) -> FinalAnswer {
        tracing::info!("Starting answer finalization");
        let fallback = || FinalAnswer {
            text: ANSWER_ERROR_TEXT.into(),
            sources: state.sources.clone(),
            usage: TokenUsage::default(),
        };

        let topic = research_topic(&state.conversation);
        let prompt = match self.prompts.answer(&topic, &state.search_results) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Failed to render answer prompt: {}", e);
                return fallback();
            }
        };
        let request =
            GenerationRequest::new(self.model_id.clone(), prompt).with_temperature(self.temperature);

        match self.service.complete(&request).await {
            Ok(completion) => {
                let (text, sources) = restore_citations(&completion.text, &state.sources);
                tracing::info!(
                    cited = sources.len(),
                    gathered = state.sources.len(),
                    "Answer finalized"
                );
                FinalAnswer {
                    text,
                    sources,
                    usage: completion.usage,
                }
            }
            Err(e) => {
                tracing::error!("Error generating final answer: {}", e);
                fallback()
            }
        }
    }
}
