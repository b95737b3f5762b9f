//! High-level orchestration: generate a script, then execute it.
//!
//! `CodeModifier` never touches the target file itself. Scripts mutate the
//! project through Rope and the modified content comes back as a string;
//! what to do with it is the caller's decision.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ModifierConfig;
use crate::error::{Error, Result};
use crate::provider::CompletionProvider;
use crate::script::{run_script, PromptMode, ScriptGenerator};

/// Placeholder file name used when generating code from scratch.
const GENERATED_FILE_NAME: &str = "generated_code.py";

pub struct CodeModifier {
    generator: ScriptGenerator,
    python_command: String,
}

impl CodeModifier {
    pub fn new(config: &ModifierConfig, provider: Box<dyn CompletionProvider>) -> Self {
        Self {
            generator: ScriptGenerator::new(provider, config.model.clone()),
            python_command: config.python_command.clone(),
        }
    }

    /// Apply `instructions` to the file and return the modified content.
    ///
    /// When `project_path` is absent the file's parent directory serves as
    /// the project root. `model` overrides the configured model for this
    /// call only.
    pub async fn modify_file(
        &self,
        file_path: &Path,
        instructions: &str,
        project_path: Option<&Path>,
        model: Option<&str>,
    ) -> Result<String> {
        let source = fs::read_to_string(file_path)?;
        debug!(file = %file_path.display(), "generating refactoring script");
        let script = self
            .generator
            .generate(&source, instructions, PromptMode::Modify, model)
            .await?;
        debug!(bytes = script.len(), "script passed validation");

        let project = match project_path {
            Some(path) => path.to_path_buf(),
            None => default_project_root(file_path)?,
        };
        run_script(&script, &project, file_path, &self.python_command)
    }

    /// Generate new code from `instructions` alone and return it.
    ///
    /// The script runs against a throwaway staging project containing a
    /// single empty placeholder file; the staging directory is removed
    /// before this returns. `model` overrides the configured model for this
    /// call only.
    pub async fn generate_code(&self, instructions: &str, model: Option<&str>) -> Result<String> {
        let instruction = format!("Create a new file with: {}", instructions);
        let script = self
            .generator
            .generate("", &instruction, PromptMode::CreateNew, model)
            .await?;
        debug!(bytes = script.len(), "script passed validation");

        let staging = tempfile::tempdir()?;
        fs::write(staging.path().join(GENERATED_FILE_NAME), "")?;
        run_script(
            &script,
            staging.path(),
            Path::new(GENERATED_FILE_NAME),
            &self.python_command,
        )
    }
}

fn default_project_root(file_path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(file_path)?;
    match absolute.parent() {
        Some(parent) => Ok(parent.to_path_buf()),
        None => Err(Error::Configuration(format!(
            "cannot determine a project root for {}",
            absolute.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderResponse;
    use async_trait::async_trait;
    use std::process::Command;

    // Scripts in these tests fall back to a tiny in-process stand-in when
    // Rope is not installed, so they run against a bare interpreter.
    const SHIM_PREAMBLE: &str = r#"try:
    from rope.base.project import Project
except ImportError:
    import pathlib

    class _Resource:
        def __init__(self, root, rel):
            self._path = pathlib.Path(root, rel)

        def read(self):
            return self._path.read_text()

        def write(self, content):
            self._path.write_text(content)

    class Project:
        def __init__(self, root):
            self._root = root

        def get_resource(self, rel):
            return _Resource(self._root, rel)
"#;

    struct FakeProvider {
        response: String,
    }

    #[async_trait]
    impl CompletionProvider for FakeProvider {
        async fn complete(
            &self,
            _model: &str,
            _prompt: &str,
        ) -> crate::error::Result<ProviderResponse> {
            Ok(ProviderResponse::Text(self.response.clone()))
        }

        async fn list_models(&self) -> crate::error::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn modifier_with_response(response: String) -> CodeModifier {
        let config = ModifierConfig::default();
        CodeModifier::new(&config, Box::new(FakeProvider { response }))
    }

    fn python_available() -> bool {
        Command::new("python3").arg("--version").output().is_ok()
    }

    #[test]
    fn test_default_project_root_is_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.py");
        fs::write(&file, "x = 1\n").unwrap();
        let root = default_project_root(&file).unwrap();
        assert_eq!(root, std::path::absolute(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn test_modify_file_missing_source_fails_before_generation() {
        let modifier = modifier_with_response("irrelevant".to_string());
        let err = modifier
            .modify_file(Path::new("/no/such/file.py"), "do things", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_modify_file_propagates_validation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.py");
        fs::write(&file, "print('hi')\n").unwrap();

        let modifier = modifier_with_response("this is not a script".to_string());
        let err = modifier
            .modify_file(&file, "rename things", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        // The target file is untouched when generation fails.
        assert_eq!(fs::read_to_string(&file).unwrap(), "print('hi')\n");
    }

    #[tokio::test]
    async fn test_modify_file_end_to_end() {
        if !python_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("greeting.py");
        fs::write(&file, "def hello():\n    return 'Hello, World!'\n").unwrap();

        let script = format!(
            "{SHIM_PREAMBLE}\n\ndef change_function(project_path, file_path):\n    project = Project(project_path)\n    resource = project.get_resource(file_path)\n    source = resource.read()\n    new_source = source.replace('World', 'Modified')\n    resource.write(new_source)\n    return new_source\n"
        );
        let modifier = modifier_with_response(format!("```python\n{}\n```", script));
        let modified = modifier
            .modify_file(&file, "Change the greeting", None, None)
            .await
            .unwrap();
        assert_eq!(modified, "def hello():\n    return 'Hello, Modified!'\n");
    }

    #[tokio::test]
    async fn test_modify_file_with_explicit_project_root() {
        if !python_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        let file = dir.path().join("pkg").join("mod.py");
        fs::write(&file, "VALUE = 1\n").unwrap();

        let script = format!(
            "{SHIM_PREAMBLE}\n\ndef change_function(project_path, file_path):\n    project = Project(project_path)\n    resource = project.get_resource(file_path)\n    source = resource.read()\n    new_source = source.replace('1', '2')\n    resource.write(new_source)\n    return new_source\n"
        );
        let modifier = modifier_with_response(format!("```python\n{}\n```", script));
        let modified = modifier
            .modify_file(&file, "Bump the value", Some(dir.path()), None)
            .await
            .unwrap();
        assert_eq!(modified, "VALUE = 2\n");
    }

    #[tokio::test]
    async fn test_generate_code_end_to_end() {
        if !python_available() {
            return;
        }
        // The script records the staging root so the test can check that it
        // is gone afterward.
        let scratch = tempfile::tempdir().unwrap();
        let marker = scratch.path().join("staging_path.txt");

        let script = format!(
            "{SHIM_PREAMBLE}\n\ndef change_function(project_path, file_path):\n    import pathlib\n    pathlib.Path('{marker}').write_text(project_path)\n    project = Project(project_path)\n    resource = project.get_resource(file_path)\n    new_source = \"def factorial(n):\\n    return 1 if n <= 1 else n * factorial(n - 1)\\n\"\n    resource.write(new_source)\n    return new_source\n",
            marker = marker.display()
        );
        let modifier = modifier_with_response(format!("```python\n{}\n```", script));
        let generated = modifier
            .generate_code("Create a factorial function", None)
            .await
            .unwrap();
        assert!(generated.contains("factorial"));

        let staging_root = fs::read_to_string(&marker).unwrap();
        assert!(!Path::new(staging_root.trim()).exists());
    }
}
