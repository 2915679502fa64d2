//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Hugging Face inference router (OpenAI-compatible).
pub const DEFAULT_LLM_BASE_URL: &str = "https://router.huggingface.co/v1";

/// Model used for plan generation.
pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-72B-Instruct";

/// Output token budget for a completion.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Server configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// Completion endpoint settings.
    pub llm: LlmSettings,
    /// Coaching sessions idle longer than this are pruned.
    pub session_idle_timeout: Duration,
}

/// Settings for the remote chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_token: SecretString,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ServerConfig {
    /// Build the configuration from environment variables.
    ///
    /// `HF_TOKEN` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = lookup("HF_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("HF_TOKEN".to_string()))?;

        let port = parse_or(&lookup, "FITCOACH_PORT", 8080u16)?;
        let max_tokens = parse_or(&lookup, "FITCOACH_MAX_TOKENS", DEFAULT_MAX_TOKENS)?;
        let timeout_secs = parse_or(&lookup, "FITCOACH_LLM_TIMEOUT_SECS", 120u64)?;
        let idle_secs = parse_or(&lookup, "COACH_SESSION_IDLE_SECS", 3600u64)?;

        Ok(Self {
            port,
            db_path: lookup("FITCOACH_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/fitness-coach.db")),
            llm: LlmSettings {
                api_token: SecretString::from(api_token),
                base_url: lookup("FITCOACH_LLM_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
                model: lookup("FITCOACH_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_tokens,
                timeout: Duration::from_secs(timeout_secs),
            },
            session_idle_timeout: Duration::from_secs(idle_secs),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_token_set() {
        let config = ServerConfig::from_lookup(lookup_from(&[("HF_TOKEN", "hf_abc")])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.llm.max_tokens, 1000);
        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.llm.api_token.expose_secret(), "hf_abc");
        assert_eq!(config.session_idle_timeout, Duration::from_secs(3600));
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = ServerConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "HF_TOKEN"));
    }

    #[test]
    fn invalid_port_is_reported() {
        let err = ServerConfig::from_lookup(lookup_from(&[
            ("HF_TOKEN", "hf_abc"),
            ("FITCOACH_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "FITCOACH_PORT"));
    }

    #[test]
    fn overrides_are_read() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HF_TOKEN", "hf_abc"),
            ("FITCOACH_PORT", "9000"),
            ("FITCOACH_MODEL", "meta-llama/Llama-3.1-8B-Instruct"),
            ("FITCOACH_DB_PATH", "/tmp/coach.db"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.llm.model, "meta-llama/Llama-3.1-8B-Instruct");
        assert_eq!(config.db_path, PathBuf::from("/tmp/coach.db"));
    }
}
