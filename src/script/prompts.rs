//! Prompt construction for script generation.
//!
//! Pure functions of their inputs plus the import whitelist; the catalog
//! shown to the model is rendered from the same constant the validator
//! enforces, so the two can never drift apart.

use super::validate::{ENTRY_POINT, ROPE_IMPORT_WHITELIST};

/// Which prompt variant to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Modify an existing file's content.
    Modify,
    /// Create a new file from scratch.
    CreateNew,
}

/// Worked example embedded in every prompt. Satisfies the full structural
/// contract, which the tests assert.
pub const EXAMPLE_SCRIPT: &str = r#"from rope.base.project import Project

def change_function(project_path, file_path):
    # Create a Rope project
    project = Project(project_path)

    # Get the file resource
    resource = project.get_resource(file_path)

    # Read the current content
    source = resource.read()

    # Build the modified content
    new_source = source.replace('old_name', 'new_name')

    # Write the modified content back to the file
    resource.write(new_source)

    # Return the modified content
    return new_source"#;

/// Build the full prompt for one generation request.
pub fn build_prompt(source: &str, instructions: &str, mode: PromptMode) -> String {
    let task_block = match mode {
        PromptMode::Modify => format!(
            "Here is the code to modify:\n```python\n{}\n```",
            source
        ),
        PromptMode::CreateNew => {
            "The target file is empty. The script should write the new content from scratch \
             and return it."
                .to_string()
        }
    };

    format!(
        r#"You are an expert Python programmer. Your task is to write a Python script that uses the Rope library to modify code according to the given instructions.

The script must define a function called '{entry_point}' that takes exactly two parameters:
1. project_path: The path to the project root
2. file_path: The relative path to the file to modify

The function must use Rope to apply the instructions and return the modified content as a string.

Here are the instructions:
{instructions}

{task_block}

Write a Python script that uses Rope to implement these changes. The script must be self-contained and not rely on any external dependencies other than Rope.

IMPORTANT: Only import from the following Rope modules, nothing else:
{catalog}

Example script structure:
```python
{example}
```

Only output the Python code, nothing else."#,
        entry_point = ENTRY_POINT,
        instructions = instructions,
        task_block = task_block,
        catalog = allowed_imports_catalog(),
        example = EXAMPLE_SCRIPT,
    )
}

fn allowed_imports_catalog() -> String {
    ROPE_IMPORT_WHITELIST
        .iter()
        .map(|module| format!("- {}", module))
        .collect::<Vec<_>>()
        .join("\n")
}
