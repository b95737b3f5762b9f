//! Structural contract for generated scripts.
//!
//! The contract is textual, not semantic: it is a cheap pre-filter that
//! rejects the common classes of non-compliant generations (wrong entry
//! point, wrong imports, wrong shape) before the cost of persisting and
//! executing anything. Rules are checked in a fixed order and the first
//! violation wins.

use std::cell::RefCell;

use regex::Regex;
use tree_sitter::Parser;

use crate::error::{Error, Result};

/// Entry-point name a generated script must define.
pub const ENTRY_POINT: &str = "change_function";
/// Older entry-point name still dispatched for backward compatibility.
pub const LEGACY_ENTRY_POINT: &str = "refactor_code";
/// Candidate entry points in dispatch priority order.
pub const ENTRY_POINTS: [&str; 2] = [ENTRY_POINT, LEGACY_ENTRY_POINT];

/// Rope sub-modules a generated script is allowed to import. Anything
/// else in the `rope` namespace is rejected, which keeps scripts off
/// undocumented or version-fragile internals.
pub const ROPE_IMPORT_WHITELIST: [&str; 33] = [
    "rope.base.project",
    "rope.base.exceptions",
    "rope.base.change",
    "rope.base.codeanalyze",
    "rope.base.evaluate",
    "rope.base.fscommands",
    "rope.base.history",
    "rope.base.libutils",
    "rope.base.prefs",
    "rope.base.pycore",
    "rope.base.pynamesdef",
    "rope.base.pynames",
    "rope.base.pyobjectsdef",
    "rope.base.pyobjects",
    "rope.base.pyscopes",
    "rope.base.resourceobserver",
    "rope.base.resources",
    "rope.base.simplify",
    "rope.base.stdmods",
    "rope.base.taskhandle",
    "rope.base.worder",
    "rope.refactor.extract",
    "rope.refactor.inline",
    "rope.refactor.introduce_factory",
    "rope.refactor.method_object",
    "rope.refactor.move",
    "rope.refactor.occurrences",
    "rope.refactor.rename",
    "rope.refactor.restructure",
    "rope.refactor.usefunction",
    "rope.refactor.change_signature",
    "rope.contrib.codeassist",
    "rope.contrib.findit",
];

/// Matches both `from rope.x.y import z` and `import rope.x.y` forms.
const ROPE_IMPORT_PATTERN: &str = r"from\s+(rope\.\S+)\s+import|\bimport\s+(rope\.[\w.]+)";

thread_local! {
    static PYTHON_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        // Ignore error here - will be caught at parse time if language fails
        let _ = p.set_language(&tree_sitter_python::LANGUAGE.into());
        p
    });
}

/// Check a normalized candidate script against the structural contract.
///
/// Returns `Ok(())` for a compliant script; otherwise the error names the
/// first violated rule. Syntax problems surface as `Error::Syntax`, every
/// other violation as `Error::Validation`.
pub fn validate_script(script: &str) -> Result<()> {
    if !script.contains(&format!("def {}(", ENTRY_POINT)) {
        return Err(Error::validation(format!(
            "script must define a '{}' function",
            ENTRY_POINT
        )));
    }

    if !script.contains(&format!("def {}(project_path, file_path):", ENTRY_POINT)) {
        return Err(Error::validation(format!(
            "{} must accept project_path and file_path parameters",
            ENTRY_POINT
        )));
    }

    if !script.contains("from rope.base.project import Project") {
        return Err(Error::validation(
            "script must import 'Project' from 'rope.base.project'",
        ));
    }

    if !script.contains("project = Project(project_path)") {
        return Err(Error::validation(
            "script must create a Rope project using the project_path parameter",
        ));
    }

    if !script.contains("project.get_resource(file_path)") {
        return Err(Error::validation(
            "script must get the file resource using project.get_resource(file_path)",
        ));
    }

    if !script.contains("return ") {
        return Err(Error::validation("script must return the modified content"));
    }

    check_rope_imports(script)?;
    check_python_syntax(script)?;

    Ok(())
}

fn check_rope_imports(script: &str) -> Result<()> {
    let re = Regex::new(ROPE_IMPORT_PATTERN).unwrap_or_else(|_| Regex::new("$^").unwrap());
    for caps in re.captures_iter(script) {
        let module = match caps.get(1).or_else(|| caps.get(2)) {
            Some(m) => m.as_str(),
            None => continue,
        };
        if !ROPE_IMPORT_WHITELIST.contains(&module) {
            return Err(Error::validation(format!(
                "invalid Rope module import: {}; this module may not exist in the installed version of Rope",
                module
            )));
        }
    }
    Ok(())
}

fn check_python_syntax(script: &str) -> Result<()> {
    let tree = PYTHON_PARSER
        .with(|p| p.borrow_mut().parse(script, None))
        .ok_or_else(|| Error::Syntax("script could not be parsed".to_string()))?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(Error::Syntax(describe_first_error(root)));
    }
    Ok(())
}

/// Locate the first error or missing node for the diagnostic message.
fn describe_first_error(node: tree_sitter::Node) -> String {
    let mut cursor = node.walk();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if n.is_error() || n.is_missing() {
            let pos = n.start_position();
            return format!("invalid syntax at line {}, column {}", pos.row + 1, pos.column + 1);
        }
        let children: Vec<_> = n.children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            if child.has_error() {
                stack.push(child);
            }
        }
    }
    "invalid syntax".to_string()
}
