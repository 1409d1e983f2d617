use anyhow::{Context, Result};

/// Runtime configuration, resolved from the environment with CLI overrides.
#[derive(Debug, Clone)]
pub struct Config {
    // OpenAI
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_api_url: String,

    // Batching
    pub batch_size: usize,
}

impl Config {
    /// Resolve configuration. CLI values win over environment variables.
    pub fn resolve(cli_api_key: Option<String>, cli_model: Option<String>) -> Result<Self> {
        let openai_api_key = match cli_api_key {
            Some(key) => key,
            None => std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY not set (or pass --api-key)")?,
        };

        Ok(Self {
            openai_api_key,
            openai_model: cli_model.unwrap_or_else(|| {
                std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
            }),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            batch_size: std::env::var("TRANSLATION_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&size| size > 0)
                .unwrap_or(15),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_values_override_environment() {
        let config = Config::resolve(
            Some("cli-key".to_string()),
            Some("gpt-4-turbo".to_string()),
        )
        .expect("Should resolve");

        assert_eq!(config.openai_api_key, "cli-key");
        assert_eq!(config.openai_model, "gpt-4-turbo");
    }

    #[test]
    fn test_default_batch_size() {
        let config = Config::resolve(Some("key".to_string()), None).expect("Should resolve");
        assert_eq!(config.batch_size, 15);
    }

    #[test]
    fn test_default_api_url_points_at_openai() {
        let config = Config::resolve(Some("key".to_string()), None).expect("Should resolve");
        assert!(config.openai_api_url.contains("api.openai.com"));
    }
}
