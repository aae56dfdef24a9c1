// src/provider/google.rs — Google Generative AI (Gemini) generation service

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{
    Completion, GenerationRequest, GenerationService, GroundedResponse, GroundingChunk,
    GroundingSupport, Reflection, SearchQueryList, TokenUsage,
};
use crate::infra::errors::ResearchError;

pub struct GoogleProvider {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl GoogleProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
        }
    }

    /// Build the Gemini request body. `extra_config` is merged into
    /// `generationConfig`; `tools` is set verbatim when present.
    fn build_request_body(
        &self,
        request: &GenerationRequest,
        extra_config: Option<serde_json::Value>,
        tools: Option<serde_json::Value>,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
        });

        let mut gen_config = serde_json::json!({});
        if let Some(temp) = request.temperature {
            gen_config["temperature"] = serde_json::json!(temp);
        }
        if let Some(serde_json::Value::Object(extra)) = extra_config {
            for (k, v) in extra {
                gen_config[k] = v;
            }
        }
        if gen_config != serde_json::json!({}) {
            body["generationConfig"] = gen_config;
        }

        if let Some(tools) = tools {
            body["tools"] = tools;
        }

        body
    }

    async fn generate(
        &self,
        model: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ResearchError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key,
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ResearchError::Provider {
                provider: "google".into(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ResearchError::RateLimited {
                provider: "google".into(),
                retry_after_ms: 5000,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ResearchError::Provider {
                provider: "google".into(),
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        response.json().await.map_err(|e| ResearchError::MalformedResponse {
            provider: "google".into(),
            message: format!("Failed to parse response: {}", e),
        })
    }

    /// Structured call: ask for JSON matching `schema` and decode it as `T`.
    async fn generate_structured<T: DeserializeOwned>(
        &self,
        request: &GenerationRequest,
        schema: serde_json::Value,
    ) -> Result<T, ResearchError> {
        let body = self.build_request_body(
            request,
            Some(serde_json::json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            })),
            None,
        );
        let resp = self.generate(&request.model, &body).await?;
        let text = candidate_text(&resp);
        serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
            ResearchError::MalformedResponse {
                provider: "google".into(),
                message: format!("Structured output did not match schema: {}", e),
            }
        })
    }
}

#[async_trait]
impl GenerationService for GoogleProvider {
    fn id(&self) -> &str {
        "google"
    }

    async fn generate_queries(
        &self,
        request: &GenerationRequest,
    ) -> Result<SearchQueryList, ResearchError> {
        self.generate_structured(
            request,
            serde_json::json!({
                "type": "OBJECT",
                "properties": {
                    "query": { "type": "ARRAY", "items": { "type": "STRING" } },
                    "rationale": { "type": "STRING" },
                },
                "required": ["query", "rationale"],
            }),
        )
        .await
    }

    async fn grounded_search(
        &self,
        request: &GenerationRequest,
        result_count: u32,
    ) -> Result<GroundedResponse, ResearchError> {
        // The google_search tool picks its own sources; the count only reaches
        // the model through the prompt.
        tracing::debug!(model = %request.model, result_count, "grounded search");
        let body = self.build_request_body(
            request,
            None,
            Some(serde_json::json!([{ "google_search": {} }])),
        );
        let resp = self.generate(&request.model, &body).await?;
        Ok(parse_grounded_response(&resp))
    }

    async fn reflect(&self, request: &GenerationRequest) -> Result<Reflection, ResearchError> {
        self.generate_structured(
            request,
            serde_json::json!({
                "type": "OBJECT",
                "properties": {
                    "is_sufficient": { "type": "BOOLEAN" },
                    "knowledge_gap": { "type": "STRING" },
                    "follow_up_queries": { "type": "ARRAY", "items": { "type": "STRING" } },
                },
                "required": ["is_sufficient", "knowledge_gap", "follow_up_queries"],
            }),
        )
        .await
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<Completion, ResearchError> {
        let body = self.build_request_body(request, None, None);
        let resp = self.generate(&request.model, &body).await?;
        Ok(Completion {
            text: candidate_text(&resp),
            usage: parse_usage(&resp),
        })
    }
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(resp: &serde_json::Value) -> String {
    resp["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Text of one part of the first candidate; empty when absent.
fn part_text(resp: &serde_json::Value, index: usize) -> String {
    resp["candidates"][0]["content"]["parts"][index]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

fn segment_part(segment: &serde_json::Value) -> usize {
    segment["partIndex"].as_u64().unwrap_or(0) as usize
}

fn parse_usage(resp: &serde_json::Value) -> TokenUsage {
    TokenUsage {
        input_tokens: resp["usageMetadata"]["promptTokenCount"]
            .as_u64()
            .unwrap_or(0) as u32,
        output_tokens: resp["usageMetadata"]["candidatesTokenCount"]
            .as_u64()
            .unwrap_or(0) as u32,
    }
}

/// Extract text and grounding metadata. Absent fields stay `None`/empty;
/// the citation resolver decides what is usable.
fn parse_grounded_response(resp: &serde_json::Value) -> GroundedResponse {
    let metadata = &resp["candidates"][0]["groundingMetadata"];

    let chunks = metadata["groundingChunks"]
        .as_array()
        .map(|chunks| {
            chunks
                .iter()
                .map(|c| GroundingChunk {
                    uri: c["web"]["uri"].as_str().map(String::from),
                    title: c["web"]["title"].as_str().map(String::from),
                })
                .collect()
        })
        .unwrap_or_default();

    // Segment offsets index into a single part; the first support names it.
    let segments: Vec<&serde_json::Value> = metadata["groundingSupports"]
        .as_array()
        .map(|supports| supports.iter().filter(|s| s["segment"].is_object()).collect())
        .unwrap_or_default();
    let part_index = segments
        .first()
        .map(|s| segment_part(&s["segment"]))
        .unwrap_or(0);

    let supports = segments
        .iter()
        .filter(|s| segment_part(&s["segment"]) == part_index)
        .map(|s| GroundingSupport {
            start_index: s["segment"]["startIndex"].as_u64().map(|v| v as usize),
            end_index: s["segment"]["endIndex"].as_u64().map(|v| v as usize),
            chunk_indices: s["groundingChunkIndices"]
                .as_array()
                .map(|idx| {
                    idx.iter()
                        .filter_map(|i| i.as_u64().map(|v| v as usize))
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect();

    let text = if segments.is_empty() {
        candidate_text(resp)
    } else {
        part_text(resp, part_index)
    };

    GroundedResponse {
        text,
        chunks,
        supports,
        usage: parse_usage(resp),
    }
}

/// Some models wrap JSON output in a ```json fence despite the mime type.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
