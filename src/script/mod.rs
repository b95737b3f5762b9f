//! Generation, validation, and execution of Rope refactoring scripts.

mod normalize;
mod prompts;
mod runner;
mod validate;

pub use normalize::{normalize_response, strip_code_fences};
pub use prompts::{build_prompt, PromptMode, EXAMPLE_SCRIPT};
pub use runner::{resolve_relative_path, run_script};
pub use validate::{
    validate_script, ENTRY_POINT, ENTRY_POINTS, LEGACY_ENTRY_POINT, ROPE_IMPORT_WHITELIST,
};

use crate::error::Result;
use crate::provider::CompletionProvider;

/// Turns an instruction and a source snippet into a validated Rope script.
///
/// Each call is one shot: build the prompt, ask the provider, normalize the
/// reply, and validate it. The first failure is returned as-is; there are no
/// retries.
pub struct ScriptGenerator {
    provider: Box<dyn CompletionProvider>,
    model: String,
}

impl ScriptGenerator {
    pub fn new(provider: Box<dyn CompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Generate a script for `instructions` against `source`.
    ///
    /// `model_override` replaces the configured model for this call only.
    /// The returned script has passed every structural check and the syntax
    /// gate; it is ready to persist and execute.
    pub async fn generate(
        &self,
        source: &str,
        instructions: &str,
        mode: PromptMode,
        model_override: Option<&str>,
    ) -> Result<String> {
        let prompt = build_prompt(source, instructions, mode);
        let model = model_override.unwrap_or(&self.model);
        let response = self.provider.complete(model, &prompt).await?;
        let script = normalize_response(response);
        validate_script(&script)?;
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::provider::ProviderResponse;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct FakeProvider {
        response: ProviderResponse,
        calls: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl FakeProvider {
        fn text(response: impl Into<String>) -> Self {
            Self::with_response(ProviderResponse::Text(response.into()))
        }

        fn with_response(response: ProviderResponse) -> Self {
            Self {
                response,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for FakeProvider {
        async fn complete(
            &self,
            model: &str,
            prompt: &str,
        ) -> crate::error::Result<ProviderResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));
            Ok(self.response.clone())
        }

        async fn list_models(&self) -> crate::error::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_generate_returns_fence_stripped_script() {
        let fenced = format!("```python\n{}\n```", EXAMPLE_SCRIPT);
        let generator = ScriptGenerator::new(Box::new(FakeProvider::text(fenced)), "test-model");
        let script = generator
            .generate(
                "def hello():\n    pass",
                "Rename hello",
                PromptMode::Modify,
                None,
            )
            .await
            .unwrap();
        assert_eq!(script, EXAMPLE_SCRIPT);
    }

    #[tokio::test]
    async fn test_generate_rejects_script_without_entry_point() {
        let generator =
            ScriptGenerator::new(Box::new(FakeProvider::text("print('hi')")), "test-model");
        let err = generator
            .generate("code", "do something", PromptMode::Modify, None)
            .await
            .unwrap_err();
        match err {
            Error::Validation(message) => {
                assert!(message.contains("change_function"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_response() {
        let generator = ScriptGenerator::new(Box::new(FakeProvider::text("")), "test-model");
        let err = generator
            .generate("code", "do something", PromptMode::Modify, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_generate_empty_candidate_list_fails_entry_point_rule() {
        let provider = FakeProvider::with_response(ProviderResponse::Candidates(Vec::new()));
        let generator = ScriptGenerator::new(Box::new(provider), "test-model");
        let err = generator
            .generate("code", "do something", PromptMode::Modify, None)
            .await
            .unwrap_err();
        match err {
            Error::Validation(message) => {
                assert!(message.contains("must define a 'change_function' function"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_generate_sends_instruction_and_snippet_to_provider() {
        let provider = FakeProvider::text(format!("```python\n{}\n```", EXAMPLE_SCRIPT));
        let calls = provider.calls.clone();
        let generator = ScriptGenerator::new(Box::new(provider), "test-model");
        generator
            .generate(
                "SNIPPET_MARKER = 1",
                "INSTRUCTION_MARKER",
                PromptMode::Modify,
                None,
            )
            .await
            .unwrap();
        let seen = calls.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "test-model");
        assert!(seen[0].1.contains("SNIPPET_MARKER = 1"));
        assert!(seen[0].1.contains("INSTRUCTION_MARKER"));
    }

    #[tokio::test]
    async fn test_generate_model_override_is_per_call() {
        let provider = FakeProvider::text(format!("```python\n{}\n```", EXAMPLE_SCRIPT));
        let calls = provider.calls.clone();
        let generator = ScriptGenerator::new(Box::new(provider), "configured-model");
        generator
            .generate("code", "first", PromptMode::Modify, Some("override-model"))
            .await
            .unwrap();
        generator
            .generate("code", "second", PromptMode::Modify, None)
            .await
            .unwrap();
        let seen = calls.lock().unwrap();
        assert_eq!(seen[0].0, "override-model");
        assert_eq!(seen[1].0, "configured-model");
    }
}
