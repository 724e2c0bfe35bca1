//! Configuration resolution for course-gen
//!
//! API key priority: environment → TOML.

use course_common::config::TomlConfig;
use course_common::{Error, Result};
use tracing::{info, warn};

/// Environment variable holding the generative model API key
pub const LLM_API_KEY_ENV: &str = "COURSEGEN_LLM_API_KEY";

/// Resolve the model API key from the environment, then TOML
pub fn resolve_llm_api_key(toml_config: &TomlConfig) -> Result<String> {
    resolve_llm_api_key_from(std::env::var(LLM_API_KEY_ENV).ok(), toml_config)
}

/// Resolution with the environment value passed in
pub fn resolve_llm_api_key_from(
    env_key: Option<String>,
    toml_config: &TomlConfig,
) -> Result<String> {
    let env_key = env_key.filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .llm
        .api_key
        .as_ref()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("Model API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("Model API key loaded from environment variable");
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("Model API key loaded from TOML config");
        return Ok(key.clone());
    }

    Err(Error::Config(format!(
        "Model API key not configured. Set one of:\n\
         1. Environment: {}=your-key-here\n\
         2. TOML config: [llm] api_key = \"your-key\"",
        LLM_API_KEY_ENV
    )))
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toml_with_key(key: Option<&str>) -> TomlConfig {
        let mut config = TomlConfig::default();
        config.llm.api_key = key.map(str::to_string);
        config
    }

    #[test]
    fn test_env_wins_over_toml() {
        let key = resolve_llm_api_key_from(Some("env-key".into()), &toml_with_key(Some("toml-key")))
            .unwrap();
        assert_eq!(key, "env-key");
    }

    #[test]
    fn test_toml_used_when_env_blank() {
        let key =
            resolve_llm_api_key_from(Some("   ".into()), &toml_with_key(Some("toml-key"))).unwrap();
        assert_eq!(key, "toml-key");
    }

    #[test]
    fn test_missing_everywhere_is_config_error() {
        let err = resolve_llm_api_key_from(None, &toml_with_key(None)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains(LLM_API_KEY_ENV));
    }
}
