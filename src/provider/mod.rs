// src/provider/mod.rs — Generation service layer

pub mod google;
pub mod retry;
pub mod roles;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::ResearchError;

/// Core trait that every generation backend implements.
///
/// Four call shapes: structured query generation, web-grounded search,
/// structured reflection and plain completion. Implementations report
/// transport/API faults and undecodable payloads as `ResearchError`;
/// callers in `core` turn those into degraded results.
#[async_trait]
pub trait GenerationService: Send + Sync {
    fn id(&self) -> &str;

    async fn generate_queries(
        &self,
        request: &GenerationRequest,
    ) -> Result<SearchQueryList, ResearchError>;

    async fn grounded_search(
        &self,
        request: &GenerationRequest,
        result_count: u32,
    ) -> Result<GroundedResponse, ResearchError>;

    async fn reflect(&self, request: &GenerationRequest) -> Result<Reflection, ResearchError>;

    async fn complete(&self, request: &GenerationRequest) -> Result<Completion, ResearchError>;
}

#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Structured output of the query-writer call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQueryList {
    #[serde(default, alias = "query")]
    pub queries: Vec<String>,
    #[serde(default)]
    pub rationale: String,
}

/// Structured output of the reflection call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    #[serde(alias = "is_sufficient")]
    pub sufficient: bool,
    #[serde(default)]
    pub knowledge_gap: String,
    #[serde(default)]
    pub follow_up_queries: Vec<String>,
}

/// Text plus raw grounding metadata from a web-grounded call.
#[derive(Debug, Clone, Default)]
pub struct GroundedResponse {
    pub text: String,
    pub chunks: Vec<GroundingChunk>,
    pub supports: Vec<GroundingSupport>,
    pub usage: TokenUsage,
}

/// A web page the search-capable model consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundingChunk {
    pub uri: Option<String>,
    pub title: Option<String>,
}

impl GroundingChunk {
    pub fn web(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            title: Some(title.into()),
        }
    }
}

/// Links a span of the response text to one or more chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundingSupport {
    pub start_index: Option<usize>,
    pub end_index: Option<usize>,
    pub chunk_indices: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── Structured payload tests ───────────────────────────────

    #[test]
    fn test_query_list_accepts_query_alias() {
        let parsed: SearchQueryList =
            serde_json::from_str(r#"{"query": ["a", "b"], "rationale": "why"}"#).unwrap();
        assert_eq!(parsed.queries, vec!["a", "b"]);
        assert_eq!(parsed.rationale, "why");
    }

    #[test]
    fn test_query_list_missing_rationale() {
        let parsed: SearchQueryList = serde_json::from_str(r#"{"queries": ["a"]}"#).unwrap();
        assert_eq!(parsed.queries.len(), 1);
        assert!(parsed.rationale.is_empty());
    }

    #[test]
    fn test_reflection_accepts_is_sufficient_alias() {
        let parsed: Reflection = serde_json::from_str(
            r#"{"is_sufficient": false, "knowledge_gap": "dates", "follow_up_queries": ["when"]}"#,
        )
        .unwrap();
        assert!(!parsed.sufficient);
        assert_eq!(parsed.knowledge_gap, "dates");
        assert_eq!(parsed.follow_up_queries, vec!["when"]);
    }

    #[test]
    fn test_reflection_requires_sufficient_flag() {
        let parsed: Result<Reflection, _> = serde_json::from_str(r#"{"knowledge_gap": "x"}"#);
        assert!(parsed.is_err());
    }

    // ─── Request / usage tests ──────────────────────────────────

    #[test]
    fn test_request_with_temperature() {
        let r = GenerationRequest::new("gemini-2.0-flash", "hi").with_temperature(0.0);
        assert_eq!(r.model, "gemini-2.0-flash");
        assert_eq!(r.temperature, Some(0.0));
    }

    #[test]
    fn test_token_usage_add() {
        let mut u = TokenUsage::default();
        u.add(&TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        });
        u.add(&TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        });
        assert_eq!(u.total(), 165);
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::user("q").role, Role::User);
        assert_eq!(Message::assistant("a").role, Role::Assistant);
        assert_eq!(Message::system("s").content, "s");
    }
}
