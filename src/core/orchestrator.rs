// src/core/orchestrator.rs — Research loop controller

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use super::conversation::research_topic;
use super::executor::SearchExecutor;
use super::finalizer::{AnswerFinalizer, FinalAnswer};
use super::prompts::PromptLibrary;
use super::search_cache::{SearchCache, SearchKey};
use super::types::*;
use crate::infra::errors::ResearchError;
use crate::provider::{GenerationRequest, GenerationService, Message, TokenUsage};

pub const REFLECTION_ERROR_TEXT: &str = "Error during reflection.";

/// Build the work items for the next wave. Ordinals continue from the
/// number of queries already issued, so short ids minted in different
/// waves never collide. An empty query list yields an empty wave.
pub fn plan_next_wave(
    state: &ResearchState,
    queries: &[String],
    result_count: u32,
) -> Vec<WorkItem> {
    let base = state.queries_issued.len();
    queries
        .iter()
        .enumerate()
        .map(|(i, query)| WorkItem {
            query: query.clone(),
            ordinal: base + i,
            result_count,
        })
        .collect()
}

enum Phase {
    Generating,
    Searching(Vec<WorkItem>),
    Reflecting,
    Finalizing,
    Done(FinalAnswer),
}

/// Drives generate → search → reflect → (search | finalize) for one run.
pub struct ResearchOrchestrator {
    service: Arc<dyn GenerationService>,
    params: RunParams,
    prompts: Arc<PromptLibrary>,
    finalizer: AnswerFinalizer,
    /// Optional callback for real-time progress events.
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send + Sync>>,
}

impl ResearchOrchestrator {
    pub fn new(
        service: Arc<dyn GenerationService>,
        params: RunParams,
    ) -> Result<Self, ResearchError> {
        let prompts = Arc::new(PromptLibrary::new()?);
        let finalizer = AnswerFinalizer::new(
            service.clone(),
            prompts.clone(),
            params.models.answer.clone(),
            params.answer_temperature,
        );
        Ok(Self {
            service,
            params,
            prompts,
            finalizer,
            on_progress: None,
        })
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Run the loop to completion. Remote failures degrade individual stages
    /// and never abort the run.
    pub async fn run(&self, conversation: Vec<Message>) -> ResearchOutcome {
        let run_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(run_id = %run_id, "Research run started");

        // One cache per run: cached outcomes carry short ids minted under
        // this run's ordinals.
        let executor = SearchExecutor::new(
            self.service.clone(),
            Arc::new(SearchCache::new()),
            self.prompts.clone(),
            self.params.models.query_generator.clone(),
        );
        let mut state = ResearchState::new(conversation, self.params.max_rounds);
        let mut usage = TokenUsage::default();
        let mut phase = Phase::Generating;

        let answer = loop {
            phase = match phase {
                Phase::Generating => {
                    let queries = self.generate_queries(&state).await;
                    self.emit(ProgressEvent::QueriesGenerated {
                        queries: queries.clone(),
                    });
                    let wave = plan_next_wave(&state, &queries, self.params.result_count);
                    if wave.is_empty() {
                        tracing::warn!("No initial queries, reflecting on empty results");
                        Phase::Reflecting
                    } else {
                        Phase::Searching(wave)
                    }
                }
                Phase::Searching(wave) => {
                    self.emit(ProgressEvent::WaveStarted {
                        round: state.round_count + 1,
                        queries: wave.iter().map(|w| w.query.clone()).collect(),
                    });
                    let outcomes = self.run_wave(&executor, wave).await;
                    for (item, outcome) in &outcomes {
                        // A cache hit carries the ordinal of the unit that paid for it
                        if outcome.ordinal == item.ordinal {
                            usage.add(&outcome.usage);
                        }
                        state.merge_outcome(outcome);
                    }
                    Phase::Reflecting
                }
                Phase::Reflecting => {
                    self.reflect(&mut state).await;
                    if state.should_finalize() {
                        Phase::Finalizing
                    } else {
                        let wave = plan_next_wave(
                            &state,
                            &state.follow_up_queries,
                            self.params.result_count,
                        );
                        if wave.is_empty() {
                            tracing::info!("No follow-up queries, finalizing");
                            Phase::Finalizing
                        } else {
                            Phase::Searching(wave)
                        }
                    }
                }
                Phase::Finalizing => {
                    let answer = self.finalizer.finalize(&state).await;
                    self.emit(ProgressEvent::Finalized {
                        sources_used: answer.sources.len(),
                    });
                    Phase::Done(answer)
                }
                Phase::Done(answer) => break answer,
            };
        };

        usage.add(&answer.usage);
        let stats = executor.cache().stats();
        tracing::info!(
            run_id = %run_id,
            rounds = state.round_count,
            queries = state.queries_issued.len(),
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            cache_entries = stats.entries,
            "Research run finished"
        );

        ResearchOutcome {
            run_id,
            answer: answer.text,
            sources: answer.sources,
            queries_issued: state.queries_issued,
            rounds: state.round_count,
            total_tokens: usage.total(),
        }
    }

    /// Ask the fast model for up to `initial_query_count` queries.
    /// Failure yields an empty list.
    async fn generate_queries(&self, state: &ResearchState) -> Vec<String> {
        let limit = self.params.initial_query_count as usize;
        let topic = research_topic(&state.conversation);
        let prompt = match self
            .prompts
            .query_writer(&topic, self.params.initial_query_count)
        {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Failed to render query prompt: {}", e);
                return Vec::new();
            }
        };
        let request = GenerationRequest::new(self.params.models.query_generator.clone(), prompt)
            .with_temperature(self.params.query_temperature);

        match self.service.generate_queries(&request).await {
            Ok(list) => {
                let mut queries = list.queries;
                if queries.len() > limit {
                    tracing::debug!(returned = queries.len(), limit, "Truncating generated queries");
                    queries.truncate(limit);
                }
                tracing::info!(count = queries.len(), "Generated search queries");
                queries
            }
            Err(e) => {
                tracing::error!("Error generating queries: {}", e);
                Vec::new()
            }
        }
    }

    /// Run every unit of a wave concurrently and wait for all of them.
    /// Results come back in wave order, which is ordinal order.
    ///
    /// Units repeating an earlier unit's `(query, result_count)` in the same
    /// wave are not spawned; they take that unit's outcome, as a cache hit
    /// would.
    async fn run_wave(
        &self,
        executor: &SearchExecutor,
        wave: Vec<WorkItem>,
    ) -> Vec<(WorkItem, SearchOutcome)> {
        tracing::info!(units = wave.len(), "Starting search wave");
        let mut first_slot: HashMap<SearchKey, usize> = HashMap::new();
        let mut leader: Vec<usize> = Vec::with_capacity(wave.len());
        let mut set = JoinSet::new();
        for (slot, item) in wave.iter().enumerate() {
            let key = SearchKey::new(item.query.clone(), item.result_count);
            if let Some(&first) = first_slot.get(&key) {
                leader.push(first);
                continue;
            }
            first_slot.insert(key, slot);
            leader.push(slot);

            let executor = executor.clone();
            let item = item.clone();
            set.spawn(async move { (slot, executor.search(&item).await) });
        }

        let mut slots: Vec<Option<SearchOutcome>> = vec![None; wave.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((slot, outcome)) => slots[slot] = Some(outcome),
                Err(e) => tracing::error!("Search unit aborted: {}", e),
            }
        }

        let mut results = Vec::with_capacity(wave.len());
        for (slot, item) in wave.into_iter().enumerate() {
            let outcome = match &slots[leader[slot]] {
                Some(outcome) => outcome.clone(),
                None => SearchOutcome::degraded(&item, "search unit aborted"),
            };
            self.emit(ProgressEvent::SearchCompleted {
                query: outcome.query.clone(),
                sources: outcome.sources.len(),
                degraded: outcome.is_degraded(),
            });
            results.push((item, outcome));
        }
        results
    }

    /// Count the round, then ask the reasoning model whether the gathered
    /// summaries suffice. Failure ends the loop.
    async fn reflect(&self, state: &mut ResearchState) {
        state.round_count += 1;
        let topic = research_topic(&state.conversation);

        let reflection = match self.prompts.reflection(&topic, &state.search_results) {
            Ok(prompt) => {
                let request = GenerationRequest::new(self.params.models.reflection.clone(), prompt)
                    .with_temperature(self.params.reflection_temperature);
                self.service.reflect(&request).await
            }
            Err(e) => Err(e),
        };

        match reflection {
            Ok(r) => {
                state.sufficient = r.sufficient;
                state.knowledge_gap = r.knowledge_gap;
                state.follow_up_queries = r.follow_up_queries;
            }
            Err(e) => {
                tracing::error!("Error during reflection: {}", e);
                state.sufficient = true;
                state.knowledge_gap = REFLECTION_ERROR_TEXT.into();
                state.follow_up_queries.clear();
            }
        }

        tracing::info!(
            round = state.round_count,
            sufficient = state.sufficient,
            follow_ups = state.follow_up_queries.len(),
            "Reflection complete"
        );
        self.emit(ProgressEvent::Reflected {
            round: state.round_count,
            sufficient: state.sufficient,
            knowledge_gap: state.knowledge_gap.clone(),
            follow_up_queries: state.follow_up_queries.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queries(qs: &[&str]) -> Vec<String> {
        qs.iter().map(|q| q.to_string()).collect()
    }

    #[test]
    fn test_plan_first_wave_starts_at_zero() {
        let state = ResearchState::new(vec![Message::user("q")], 2);
        let wave = plan_next_wave(&state, &queries(&["a", "b", "c"]), 3);
        let ordinals: Vec<usize> = wave.iter().map(|w| w.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert!(wave.iter().all(|w| w.result_count == 3));
    }

    #[test]
    fn test_plan_follow_up_continues_ordinals() {
        let mut state = ResearchState::new(vec![Message::user("q")], 2);
        state.queries_issued = queries(&["a", "b", "c"]);
        let wave = plan_next_wave(&state, &queries(&["d", "e"]), 5);
        assert_eq!(wave[0].ordinal, 3);
        assert_eq!(wave[1].ordinal, 4);
        assert_eq!(wave[1].query, "e");
        assert_eq!(wave[1].result_count, 5);
    }

    #[test]
    fn test_plan_empty_wave() {
        let state = ResearchState::new(vec![], 1);
        assert!(plan_next_wave(&state, &[], 3).is_empty());
    }
}
