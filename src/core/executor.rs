// src/core/executor.rs — One search unit: cache lookup, grounded call, citation resolution

use std::sync::Arc;

use super::citations;
use super::prompts::PromptLibrary;
use super::search_cache::{SearchCache, SearchKey};
use super::types::*;
use crate::provider::{GenerationRequest, GenerationService};

/// Research queries are sampled deterministically.
const SEARCH_TEMPERATURE: f32 = 0.0;

/// Executes search units against the generation service.
///
/// Cheap to clone: every field is shared, so each unit of a wave gets its own
/// handle onto the same service, cache and templates.
#[derive(Clone)]
pub struct SearchExecutor {
    service: Arc<dyn GenerationService>,
    cache: Arc<SearchCache>,
    prompts: Arc<PromptLibrary>,
    model_id: String,
}

impl SearchExecutor {
    pub fn new(
        service: Arc<dyn GenerationService>,
        cache: Arc<SearchCache>,
        prompts: Arc<PromptLibrary>,
        model_id: String,
    ) -> Self {
        Self {
            service,
            cache,
            prompts,
            model_id,
        }
    }

    pub fn cache(&self) -> &Arc<SearchCache> {
        &self.cache
    }

    /// Search one query. Never fails: a service error yields a degraded
    /// outcome, which is not cached.
    ///
    /// A cache hit returns the stored outcome unchanged, including the short
    /// ids minted under the ordinal of the unit that first ran the query.
    pub async fn search(&self, item: &WorkItem) -> SearchOutcome {
        let key = SearchKey::new(item.query.clone(), item.result_count);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(query = %item.query, ordinal = item.ordinal, "Search cache hit");
            return cached;
        }

        tracing::info!(query = %item.query, ordinal = item.ordinal, "Starting web research");

        let prompt = match self.prompts.web_searcher(&item.query, item.result_count) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(query = %item.query, "Failed to render search prompt: {}", e);
                return SearchOutcome::degraded(item, e.to_string());
            }
        };
        let request =
            GenerationRequest::new(self.model_id.clone(), prompt).with_temperature(SEARCH_TEMPERATURE);

        let response = match self.service.grounded_search(&request, item.result_count).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    query = %item.query,
                    ordinal = item.ordinal,
                    "Error during web research: {}",
                    e
                );
                return SearchOutcome::degraded(item, e.to_string());
            }
        };

        let cited = citations::cite(&response, item.ordinal);
        tracing::info!(
            query = %item.query,
            sources = cited.sources.len(),
            "Web research completed"
        );

        let outcome = SearchOutcome {
            query: item.query.clone(),
            ordinal: item.ordinal,
            text: cited.text,
            sources: cited.sources,
            error: None,
            usage: response.usage,
        };
        self.cache.insert_if_absent(key, outcome)
    }
}
