// src/infra/errors.rs — Error types for groundwork

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResearchError {
    // Generation service errors (retriable depending on cause)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Provider '{provider}' returned a malformed response: {message}")]
    MalformedResponse { provider: String, message: String },

    // User errors
    #[error("No provider configured. Set GEMINI_API_KEY or configure [provider] in config.toml.")]
    NoProvider,

    #[error("Configuration error: {0}")]
    Config(String),

    // Infra
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ResearchError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ResearchError::Provider {
                retriable: true,
                ..
            } | ResearchError::RateLimited { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_provider_error() {
        let err = ResearchError::Provider {
            provider: "google".into(),
            message: "HTTP 503".into(),
            retriable: true,
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn test_malformed_response_not_retriable() {
        let err = ResearchError::MalformedResponse {
            provider: "google".into(),
            message: "missing field `query`".into(),
        };
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_config_error_display() {
        let err = ResearchError::Config("max_rounds must be at least 1".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: max_rounds must be at least 1"
        );
        assert!(!err.is_retriable());
    }
}
