//! Executes a validated script against a project by driving a one-shot
//! Python interpreter.
//!
//! The script is persisted to a transient `.py` file, loaded by a small
//! driver program passed to the interpreter with `-c`, and invoked with
//! `(project_path, file_path)`. The driver reports back over stdout with a
//! single JSON envelope so interpreter noise and user `print` calls can
//! never be confused with the result.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use super::validate::ENTRY_POINTS;
use crate::error::{Error, Result};

/// Driver program handed to `python -c`.
///
/// argv: script path, project path, relative file path, then entry point
/// names in priority order. The script's own stdout, at import time and
/// during the entry-point call, is redirected into a buffer so the envelope
/// stays the only thing on the real stdout.
const PYTHON_DRIVER: &str = r#"
import importlib.util
import io
import json
import sys
import traceback
from contextlib import redirect_stdout

_HOST_STDOUT = sys.stdout


def _emit(payload):
    json.dump(payload, _HOST_STDOUT)
    _HOST_STDOUT.flush()


def _main():
    script_path = sys.argv[1]
    project_path = sys.argv[2]
    file_path = sys.argv[3]
    entry_points = sys.argv[4:]

    stdout_buffer = io.StringIO()
    try:
        spec = importlib.util.spec_from_file_location("rope_script", script_path)
        module = importlib.util.module_from_spec(spec)
        with redirect_stdout(stdout_buffer):
            spec.loader.exec_module(module)
    except Exception:
        _emit({"status": "load_error", "message": traceback.format_exc()})
        return

    target = None
    for name in entry_points:
        if hasattr(module, name):
            target = getattr(module, name)
            break
    if target is None:
        _emit({"status": "missing_entry_point"})
        return

    try:
        with redirect_stdout(stdout_buffer):
            result = target(project_path, file_path)
    except Exception:
        _emit({"status": "execution_error", "message": traceback.format_exc()})
        return

    _emit({"status": "ok", "result": "" if result is None else str(result)})


_main()
"#;

#[derive(Debug, Deserialize)]
struct DriverEnvelope {
    status: String,
    #[serde(default)]
    result: String,
    #[serde(default)]
    message: String,
}

/// Persist `script` to a transient file and run its entry point against the
/// project, returning the modified source. The transient file is removed on
/// every path out of this function.
pub fn run_script(
    script: &str,
    project_path: &Path,
    file_path: &Path,
    python_command: &str,
) -> Result<String> {
    let mut transient = tempfile::Builder::new()
        .prefix("rope_script_")
        .suffix(".py")
        .tempfile()?;
    transient.write_all(script.as_bytes())?;
    transient.flush()?;

    let relative = resolve_relative_path(file_path, project_path);

    let output = Command::new(python_command)
        .arg("-c")
        .arg(PYTHON_DRIVER)
        .arg(transient.path())
        .arg(project_path)
        .arg(&relative)
        .args(ENTRY_POINTS)
        .output()
        .map_err(|err| {
            Error::Load(format!(
                "failed to spawn python interpreter `{}`: {}",
                python_command, err
            ))
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let envelope: DriverEnvelope = match serde_json::from_str(stdout.trim()) {
        Ok(envelope) => envelope,
        Err(_) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                format!(
                    "python exited with {} and produced no result envelope",
                    output.status
                )
            } else {
                stderr.trim().to_string()
            };
            return Err(Error::execution(transient.path(), detail));
        }
    };

    match envelope.status.as_str() {
        "ok" => Ok(envelope.result),
        "load_error" => Err(Error::Load(envelope.message)),
        "missing_entry_point" => Err(Error::MissingEntryPoint(ENTRY_POINTS.join(" or "))),
        "execution_error" => Err(Error::execution(transient.path(), envelope.message)),
        other => Err(Error::execution(
            transient.path(),
            format!("driver reported unknown status `{}`", other),
        )),
    }
}

/// Express `file_path` relative to `project_path`.
///
/// Already-relative paths are trusted as given. Absolute paths inside the
/// project are stripped down to the project-relative remainder. Paths
/// outside the project fall back to a lexical `..`-walk; that is a best
/// effort, never an error.
pub fn resolve_relative_path(file_path: &Path, project_path: &Path) -> PathBuf {
    if file_path.is_relative() {
        return file_path.to_path_buf();
    }
    if let Ok(stripped) = file_path.strip_prefix(project_path) {
        return stripped.to_path_buf();
    }
    debug!(
        file = %file_path.display(),
        project = %project_path.display(),
        "file lies outside the project root, using lexical relative path"
    );
    lexical_relpath(file_path, project_path)
}

fn lexical_relpath(target: &Path, base: &Path) -> PathBuf {
    // Anchor both sides to the current directory so the component walk
    // shares a root; pushing an absolute remainder would reset the buffer.
    let target = std::path::absolute(target).unwrap_or_else(|_| target.to_path_buf());
    let base = std::path::absolute(base).unwrap_or_else(|_| base.to_path_buf());
    let mut target_parts = target.components().peekable();
    let mut base_parts = base.components().peekable();
    while let (Some(t), Some(b)) = (target_parts.peek(), base_parts.peek()) {
        if t == b {
            target_parts.next();
            base_parts.next();
        } else {
            break;
        }
    }

    let mut relative = PathBuf::new();
    for _ in base_parts {
        relative.push("..");
    }
    for part in target_parts {
        relative.push(part.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}
