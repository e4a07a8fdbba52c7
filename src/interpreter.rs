use anyhow::{anyhow, Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::config::LauncherConfig;
use crate::error::LaunchError;

/// The Python interpreter inside the project's virtual environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterHandle {
    path: PathBuf,
}

impl InterpreterHandle {
    /// Wrap an interpreter path without checking it (for testing)
    #[cfg(test)]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Locate the interpreter for `config`, failing if it is absent
    pub fn locate(config: &LauncherConfig) -> Result<Self, LaunchError> {
        let path = match &config.python {
            Some(explicit) => explicit.clone(),
            None => venv_interpreter(&config.venv_path()),
        };
        tracing::debug!("Checking for interpreter at {}", path.display());

        if !path.is_file() {
            return Err(LaunchError::MissingInterpreter {
                path,
                project_root: config.project_root.clone(),
                venv_dir: config.venv_dir.clone(),
            });
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Interpreter location within a venv for the current platform
pub fn venv_interpreter(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    }
}

/// `sys` attribute naming an installation prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixKind {
    /// Installation the venv was created from
    Base,
    /// Active prefix; equals the venv itself inside a venv
    Active,
}

impl PrefixKind {
    pub fn attribute(&self) -> &'static str {
        match self {
            PrefixKind::Base => "base_prefix",
            PrefixKind::Active => "prefix",
        }
    }
}

/// Asks an interpreter for one of its installation prefixes
pub trait PrefixProbe {
    /// Return the raw answer; an empty string means the interpreter had none
    fn query(
        &self,
        interpreter: &InterpreterHandle,
        kind: PrefixKind,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Probe that runs the interpreter with a one-line `-c` program
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonProbe;

impl PrefixProbe for PythonProbe {
    async fn query(&self, interpreter: &InterpreterHandle, kind: PrefixKind) -> Result<String> {
        let program = format!("import sys; print(sys.{})", kind.attribute());
        tracing::debug!("Probing {} with: {}", interpreter.path().display(), program);

        let output = Command::new(interpreter.path())
            .arg("-c")
            .arg(&program)
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to run {}", interpreter.path().display()))?;

        if !output.status.success() {
            return Err(anyhow!(
                "querying sys.{} exited with {}: {}",
                kind.attribute(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Determine the base installation prefix, falling back to `sys.prefix`
/// when `sys.base_prefix` is empty. Probe failures count as empty answers.
pub async fn resolve_base_prefix<P: PrefixProbe>(
    probe: &P,
    interpreter: &InterpreterHandle,
) -> Option<PathBuf> {
    for kind in [PrefixKind::Base, PrefixKind::Active] {
        match probe.query(interpreter, kind).await {
            Ok(answer) if !answer.trim().is_empty() => {
                let prefix = PathBuf::from(answer.trim());
                tracing::debug!("sys.{} = {}", kind.attribute(), prefix.display());
                return Some(prefix);
            }
            Ok(_) => tracing::debug!("sys.{} is empty", kind.attribute()),
            Err(e) => tracing::warn!("Failed to query sys.{}: {:#}", kind.attribute(), e),
        }
    }
    None
}
