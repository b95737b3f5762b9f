//! Ropesmith library crate
//!
//! Generates Python refactoring scripts with an LLM, validates them, and
//! executes them against a project through the Rope library. Exposed as a
//! library so external tooling can drive the pipeline without going through
//! CLI startup.

pub mod config;
pub mod error;
pub mod modifier;
pub mod provider;
pub mod script;

pub use config::ModifierConfig;
pub use error::{Error, Result};
pub use modifier::CodeModifier;
pub use provider::{CompletionProvider, OpenRouterProvider, ProviderResponse};
pub use script::{PromptMode, ScriptGenerator};
