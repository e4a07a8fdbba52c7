use std::path::PathBuf;
use thiserror::Error;

/// Conditions that stop the launcher before the GUI starts.
///
/// Everything else (unresolved Tcl/Tk directories, failed prefix queries) is
/// advisory and only produces a warning.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(
        "Python interpreter not found at {}\n\
         Create the virtual environment first:\n    \
         cd {} && python -m venv {}",
        .path.display(),
        .project_root.display(),
        .venv_dir.display()
    )]
    MissingInterpreter {
        path: PathBuf,
        project_root: PathBuf,
        venv_dir: PathBuf,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to start {}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}
