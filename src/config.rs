use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::LaunchError;

pub const ENV_PROJECT_ROOT: &str = "TK_LAUNCH_PROJECT_ROOT";
pub const ENV_VENV: &str = "TK_LAUNCH_VENV";
pub const ENV_PYTHON: &str = "TK_LAUNCH_PYTHON";
pub const ENV_ENTRY: &str = "TK_LAUNCH_ENTRY";
pub const ENV_TCL_VERSION: &str = "TK_LAUNCH_TCL_VERSION";
pub const ENV_PRINT_ENV: &str = "TK_LAUNCH_PRINT_ENV";
pub const ENV_JSON: &str = "TK_LAUNCH_JSON";
pub const ENV_VERBOSE: &str = "TK_LAUNCH_VERBOSE";

pub const DEFAULT_VENV: &str = ".venv";
pub const DEFAULT_ENTRY: &str = "main.py";

/// Tcl/Tk release whose library directories are looked up (`tcl8.6`, `tk8.6`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TclVersion {
    pub major: u32,
    pub minor: u32,
}

impl Default for TclVersion {
    fn default() -> Self {
        Self { major: 8, minor: 6 }
    }
}

impl FromStr for TclVersion {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            LaunchError::InvalidConfig(format!(
                "invalid Tcl version '{}'. Expected MAJOR.MINOR, e.g. 8.6",
                s
            ))
        };
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for TclVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl TclVersion {
    pub fn tcl_dir_name(&self) -> String {
        format!("tcl{}", self)
    }

    pub fn tk_dir_name(&self) -> String {
        format!("tk{}", self)
    }
}

/// Launcher settings, read from `TK_LAUNCH_*` variables.
///
/// The command line belongs entirely to the launched script, so the
/// environment is the only place the launcher itself is configured.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub project_root: Option<PathBuf>,
    pub venv: Option<PathBuf>,
    pub python: Option<PathBuf>,
    pub entry: Option<PathBuf>,
    pub tcl_version: Option<String>,
    /// Print the resolved environment and command instead of launching
    pub print_env: bool,
    /// With `print_env`, print the launch plan as JSON
    pub json: bool,
    /// Default the log filter to `debug`
    pub verbose: bool,
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| {
            get(key).is_some_and(|v| {
                !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off")
            })
        };
        Self {
            project_root: get(ENV_PROJECT_ROOT).map(PathBuf::from),
            venv: get(ENV_VENV).map(PathBuf::from),
            python: get(ENV_PYTHON).map(PathBuf::from),
            entry: get(ENV_ENTRY).map(PathBuf::from),
            tcl_version: get(ENV_TCL_VERSION),
            print_env: flag(ENV_PRINT_ENV),
            json: flag(ENV_JSON),
            verbose: flag(ENV_VERBOSE),
        }
    }
}

/// Fully-resolved launcher configuration with absolute-or-root-relative paths
#[derive(Debug, Clone, PartialEq)]
pub struct LauncherConfig {
    pub project_root: PathBuf,
    /// As given by the user, used in remediation messages
    pub venv_dir: PathBuf,
    /// Explicit interpreter, bypassing the venv layout
    pub python: Option<PathBuf>,
    pub entry: PathBuf,
    pub tcl_version: TclVersion,
}

impl LauncherConfig {
    /// Create config from settings, filling defaults.
    ///
    /// `cwd` anchors a relative project root, and the project root anchors
    /// every other relative path.
    pub fn from_settings(settings: &Settings, cwd: &Path) -> Result<Self, LaunchError> {
        let tcl_version = match settings.tcl_version.as_deref() {
            Some(v) => v.parse()?,
            None => TclVersion::default(),
        };

        let project_root = match &settings.project_root {
            Some(root) => cwd.join(root),
            None => cwd.to_path_buf(),
        };

        let venv_dir = settings
            .venv
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_VENV));
        let python = settings.python.as_ref().map(|p| project_root.join(p));
        let entry = project_root.join(
            settings
                .entry
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_ENTRY)),
        );

        Ok(Self {
            project_root,
            venv_dir,
            python,
            entry,
            tcl_version,
        })
    }

    /// Directory of the virtual environment
    pub fn venv_path(&self) -> PathBuf {
        self.project_root.join(&self.venv_dir)
    }
}
