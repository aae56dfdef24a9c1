// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Model ids per pipeline role. The query generator is the "fast" tier,
/// reflection and answer the "reasoning" tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub query_generator: String,
    pub reflection: String,
    pub answer: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            query_generator: "gemini-2.0-flash".into(),
            reflection: "gemini-2.5-flash".into(),
            answer: "gemini-2.5-pro".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub initial_queries: u32,
    pub max_rounds: u32,
    pub search_results: u32,
    pub query_temperature: f32,
    pub reflection_temperature: f32,
    pub answer_temperature: f32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            initial_queries: 3,
            max_rounds: 2,
            search_results: 3,
            query_temperature: 1.0,
            reflection_temperature: 1.0,
            answer_temperature: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Retries per remote call, on transient failures only.
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".into(),
            max_retries: 2,
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Render the effective configuration.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
