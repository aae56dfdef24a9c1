// src/core/types.rs — Core domain types

use serde::{Deserialize, Serialize};

use crate::infra::config::Config;
use crate::infra::errors::ResearchError;
use crate::provider::roles::ModelRoles;
use crate::provider::{Message, TokenUsage};

/// Upper bound for the per-query result count forwarded to the search call.
pub const MAX_RESULT_COUNT: u32 = 20;

/// Upper bound for the number of queries requested in one generation call.
pub const MAX_INITIAL_QUERIES: u32 = 10;

/// A web page cited by at least one search unit. One record per distinct URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub short_id: String,
    pub label: String,
}

/// One resolved grounding reference inside a citation span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationSegment {
    pub label: String,
    pub short_id: String,
    pub url: String,
}

impl CitationSegment {
    pub fn to_source(&self) -> Source {
        Source {
            url: self.url.clone(),
            short_id: self.short_id.clone(),
            label: self.label.clone(),
        }
    }
}

/// A span of the uncited response text backed by one or more segments.
/// `end` is an exclusive byte offset into the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub start: usize,
    pub end: usize,
    pub segments: Vec<CitationSegment>,
}

/// One unit of a wave: search a single query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub query: String,
    pub ordinal: usize,
    pub result_count: u32,
}

/// Result of one search unit, degraded or not.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub query: String,
    pub ordinal: usize,
    /// Response text with citation markers inserted.
    pub text: String,
    pub sources: Vec<Source>,
    /// Set when the remote call failed and `text` is a placeholder.
    pub error: Option<String>,
    pub usage: TokenUsage,
}

impl SearchOutcome {
    pub const ERROR_TEXT: &'static str = "Error performing web research.";

    pub fn degraded(item: &WorkItem, error: impl Into<String>) -> Self {
        Self {
            query: item.query.clone(),
            ordinal: item.ordinal,
            text: Self::ERROR_TEXT.into(),
            sources: Vec::new(),
            error: Some(error.into()),
            usage: TokenUsage::default(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Mutable state of one research run. Owned by the orchestrator and only
/// touched between waves, so it carries no locking.
#[derive(Debug, Clone)]
pub struct ResearchState {
    pub conversation: Vec<Message>,
    pub queries_issued: Vec<String>,
    pub search_results: Vec<String>,
    pub sources: Vec<Source>,
    pub round_count: u32,
    pub max_rounds: u32,
    pub sufficient: bool,
    pub knowledge_gap: String,
    pub follow_up_queries: Vec<String>,
}

impl ResearchState {
    pub fn new(conversation: Vec<Message>, max_rounds: u32) -> Self {
        Self {
            conversation,
            queries_issued: Vec::new(),
            search_results: Vec::new(),
            sources: Vec::new(),
            round_count: 0,
            max_rounds,
            sufficient: false,
            knowledge_gap: String::new(),
            follow_up_queries: Vec::new(),
        }
    }

    /// Append one completed unit. Sources are merged by URL; the first
    /// short id seen for a URL is kept.
    pub fn merge_outcome(&mut self, outcome: &SearchOutcome) {
        self.queries_issued.push(outcome.query.clone());
        self.search_results.push(outcome.text.clone());
        for source in &outcome.sources {
            if !self.sources.iter().any(|s| s.url == source.url) {
                self.sources.push(source.clone());
            }
        }
    }

    /// Whether the loop should stop searching and write the answer.
    pub fn should_finalize(&self) -> bool {
        self.sufficient || self.round_count >= self.max_rounds
    }
}

/// Research depth preset: (initial queries, max rounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Effort {
    Low,
    Medium,
    High,
}

impl Effort {
    pub fn limits(self) -> (u32, u32) {
        match self {
            Effort::Low => (1, 1),
            Effort::Medium => (3, 3),
            Effort::High => (5, 10),
        }
    }
}

/// Per-run parameters. Built from config, then overridden by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    pub initial_query_count: u32,
    pub max_rounds: u32,
    pub result_count: u32,
    pub models: ModelRoles,
    pub query_temperature: f32,
    pub reflection_temperature: f32,
    pub answer_temperature: f32,
}

impl RunParams {
    pub fn with_effort(mut self, effort: Effort) -> Self {
        let (queries, rounds) = effort.limits();
        self.initial_query_count = queries;
        self.max_rounds = rounds;
        self
    }

    /// Reject out-of-range values instead of clamping them.
    pub fn validate(&self) -> Result<(), ResearchError> {
        if !(1..=MAX_INITIAL_QUERIES).contains(&self.initial_query_count) {
            return Err(ResearchError::Config(format!(
                "initial query count must be between 1 and {}, got {}",
                MAX_INITIAL_QUERIES, self.initial_query_count
            )));
        }
        if self.max_rounds == 0 {
            return Err(ResearchError::Config(
                "max rounds must be at least 1".into(),
            ));
        }
        if !(1..=MAX_RESULT_COUNT).contains(&self.result_count) {
            return Err(ResearchError::Config(format!(
                "result count must be between 1 and {}, got {}",
                MAX_RESULT_COUNT, self.result_count
            )));
        }
        Ok(())
    }
}

impl From<&Config> for RunParams {
    fn from(cfg: &Config) -> Self {
        Self {
            initial_query_count: cfg.research.initial_queries,
            max_rounds: cfg.research.max_rounds,
            result_count: cfg.research.search_results,
            models: ModelRoles::from_config(&cfg.models, None),
            query_temperature: cfg.research.query_temperature,
            reflection_temperature: cfg.research.reflection_temperature,
            answer_temperature: cfg.research.answer_temperature,
        }
    }
}

/// Lifecycle events for real-time progress display.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    QueriesGenerated {
        queries: Vec<String>,
    },
    WaveStarted {
        round: u32,
        queries: Vec<String>,
    },
    SearchCompleted {
        query: String,
        sources: usize,
        degraded: bool,
    },
    Reflected {
        round: u32,
        sufficient: bool,
        knowledge_gap: String,
        follow_up_queries: Vec<String>,
    },
    Finalized {
        sources_used: usize,
    },
}

/// Final result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchOutcome {
    pub run_id: String,
    pub answer: String,
    pub sources: Vec<Source>,
    pub queries_issued: Vec<String>,
    pub rounds: u32,
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(query: &str, ordinal: usize, urls: &[&str]) -> SearchOutcome {
        SearchOutcome {
            query: query.into(),
            ordinal,
            text: format!("result for {}", query),
            sources: urls
                .iter()
                .enumerate()
                .map(|(i, u)| Source {
                    url: u.to_string(),
                    short_id: format!("id/{}-{}", ordinal, i),
                    label: "label".into(),
                })
                .collect(),
            error: None,
            usage: TokenUsage::default(),
        }
    }

    // ─── ResearchState ──────────────────────────────────────────

    #[test]
    fn test_merge_dedups_sources_by_url() {
        let mut state = ResearchState::new(vec![Message::user("q")], 2);
        state.merge_outcome(&outcome("a", 0, &["u1", "u2"]));
        state.merge_outcome(&outcome("b", 1, &["u2", "u3"]));
        assert_eq!(state.queries_issued, vec!["a", "b"]);
        assert_eq!(state.search_results.len(), 2);
        let urls: Vec<&str> = state.sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["u1", "u2", "u3"]);
        // First short id for a URL wins
        assert_eq!(state.sources[1].short_id, "id/0-1");
    }

    #[test]
    fn test_should_finalize() {
        let mut state = ResearchState::new(vec![], 2);
        assert!(!state.should_finalize());
        state.round_count = 2;
        assert!(state.should_finalize());
        state.round_count = 1;
        state.sufficient = true;
        assert!(state.should_finalize());
    }

    #[test]
    fn test_degraded_outcome() {
        let item = WorkItem {
            query: "q".into(),
            ordinal: 4,
            result_count: 3,
        };
        let o = SearchOutcome::degraded(&item, "HTTP 500");
        assert!(o.is_degraded());
        assert_eq!(o.text, SearchOutcome::ERROR_TEXT);
        assert_eq!(o.ordinal, 4);
        assert!(o.sources.is_empty());
    }

    // ─── RunParams ──────────────────────────────────────────────

    #[test]
    fn test_run_params_from_config() {
        let params = RunParams::from(&Config::default());
        assert_eq!(params.initial_query_count, 3);
        assert_eq!(params.max_rounds, 2);
        assert_eq!(params.result_count, 3);
        assert_eq!(params.models.answer, "gemini-2.5-pro");
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_effort_presets() {
        let base = RunParams::from(&Config::default());
        let low = base.clone().with_effort(Effort::Low);
        assert_eq!((low.initial_query_count, low.max_rounds), (1, 1));
        let high = base.with_effort(Effort::High);
        assert_eq!((high.initial_query_count, high.max_rounds), (5, 10));
    }

    #[test]
    fn test_validate_rejects_result_count_out_of_range() {
        let mut params = RunParams::from(&Config::default());
        params.result_count = MAX_RESULT_COUNT + 1;
        assert!(matches!(params.validate(), Err(ResearchError::Config(_))));
        params.result_count = 0;
        assert!(params.validate().is_err());
        params.result_count = MAX_RESULT_COUNT;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_rounds() {
        let mut params = RunParams::from(&Config::default());
        params.max_rounds = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_queries() {
        let mut params = RunParams::from(&Config::default());
        params.initial_query_count = 0;
        assert!(params.validate().is_err());
    }
}
