// src/provider/roles.rs — Role-based model assignment

use crate::infra::config::ModelsConfig;

/// Assigns models to the stages of the research loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRoles {
    /// Fast tier: initial queries and grounded searches.
    pub query_generator: String,
    /// Reasoning tier.
    pub reflection: String,
    pub answer: String,
}

impl ModelRoles {
    /// Build from config. A per-run reasoning model replaces both the
    /// reflection and the answer model; the fast tier is untouched.
    pub fn from_config(models: &ModelsConfig, reasoning_override: Option<&str>) -> Self {
        let reasoning = reasoning_override
            .map(str::trim)
            .filter(|m| !m.is_empty());
        Self {
            query_generator: models.query_generator.clone(),
            reflection: reasoning
                .map(String::from)
                .unwrap_or_else(|| models.reflection.clone()),
            answer: reasoning
                .map(String::from)
                .unwrap_or_else(|| models.answer.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_defaults() {
        let roles = ModelRoles::from_config(&ModelsConfig::default(), None);
        assert_eq!(roles.query_generator, "gemini-2.0-flash");
        assert_eq!(roles.reflection, "gemini-2.5-flash");
        assert_eq!(roles.answer, "gemini-2.5-pro");
    }

    #[test]
    fn test_reasoning_override_keeps_fast_tier() {
        let roles = ModelRoles::from_config(&ModelsConfig::default(), Some("gemini-2.5-pro"));
        assert_eq!(roles.query_generator, "gemini-2.0-flash");
        assert_eq!(roles.reflection, "gemini-2.5-pro");
        assert_eq!(roles.answer, "gemini-2.5-pro");
    }

    #[test]
    fn test_blank_override_ignored() {
        let roles = ModelRoles::from_config(&ModelsConfig::default(), Some("  "));
        assert_eq!(roles.reflection, "gemini-2.5-flash");
    }
}
