//! Configuration for the modifier pipeline.
//!
//! There is no config file; everything comes from the environment or from
//! explicit caller arguments, which always win. The config is a plain value
//! passed into the pipeline constructor, never process-global state.

pub const DEFAULT_MODEL: &str = "openrouter/google/gemini-2.0-flash-001";
const DEFAULT_PYTHON_COMMAND: &str = "python3";

pub const MODEL_ENV_VAR: &str = "ROPESMITH_MODEL";
pub const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";
pub const PYTHON_ENV_VAR: &str = "ROPESMITH_PYTHON";

#[derive(Debug, Clone)]
pub struct ModifierConfig {
    /// Model identifier sent to the completion provider.
    pub model: String,
    /// API key for the provider. Checked only when a call is attempted.
    pub api_key: Option<String>,
    /// Interpreter used to run validated scripts.
    pub python_command: String,
}

impl Default for ModifierConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            python_command: DEFAULT_PYTHON_COMMAND.to_string(),
        }
    }
}

impl ModifierConfig {
    /// Build a config from the environment. Environment variables take
    /// precedence over the hardcoded defaults; explicit caller arguments
    /// (applied afterwards via `with_model`) take precedence over both.
    pub fn from_env() -> Self {
        let model =
            std::env::var(MODEL_ENV_VAR).unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_key = std::env::var(API_KEY_ENV_VAR)
            .ok()
            .filter(|k| !k.trim().is_empty());
        let python_command =
            std::env::var(PYTHON_ENV_VAR).unwrap_or_else(|_| DEFAULT_PYTHON_COMMAND.to_string());
        Self {
            model,
            api_key,
            python_command,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ModifierConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.api_key.is_none());
        assert_eq!(config.python_command, "python3");
    }

    #[test]
    fn test_explicit_model_overrides_default() {
        let config = ModifierConfig::default().with_model("openrouter/deepseek/deepseek-chat");
        assert_eq!(config.model, "openrouter/deepseek/deepseek-chat");
    }
}
