use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::TclVersion;

pub const TCL_LIBRARY: &str = "TCL_LIBRARY";
pub const TK_LIBRARY: &str = "TK_LIBRARY";

/// Directory convention for Tcl/Tk libraries under a base prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `<base>/tcl/tclX.Y`, as shipped by the Windows installers
    Primary,
    /// `<base>/lib/tclX.Y`, as found in Unix-style installs
    Fallback,
}

impl Layout {
    pub fn subdir(&self) -> &'static str {
        match self {
            Layout::Primary => "tcl",
            Layout::Fallback => "lib",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryPaths {
    pub tcl_dir: PathBuf,
    pub tk_dir: PathBuf,
}

impl LibraryPaths {
    /// Candidate directories for `version` under `base` using `layout`
    pub fn for_layout(base: &Path, layout: Layout, version: TclVersion) -> Self {
        let root = base.join(layout.subdir());
        Self {
            tcl_dir: root.join(version.tcl_dir_name()),
            tk_dir: root.join(version.tk_dir_name()),
        }
    }

    /// Directories that do not exist, in `(tcl, tk)` order
    pub fn missing(&self) -> Vec<&Path> {
        [self.tcl_dir.as_path(), self.tk_dir.as_path()]
            .into_iter()
            .filter(|dir| !dir.is_dir())
            .collect()
    }

    pub fn all_exist(&self) -> bool {
        self.missing().is_empty()
    }

    /// Environment assignments for the launched process
    pub fn env_vars(&self) -> [(&'static str, &Path); 2] {
        [(TCL_LIBRARY, self.tcl_dir.as_path()), (TK_LIBRARY, self.tk_dir.as_path())]
    }
}

/// Outcome of looking for Tcl/Tk under a base prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Resolution {
    /// Both directories exist under `layout`
    Found { layout: Layout, paths: LibraryPaths },
    /// Neither layout is complete; the primary candidates are exported anyway
    Unresolved {
        paths: LibraryPaths,
        missing: Vec<PathBuf>,
    },
}

impl Resolution {
    /// Check the primary layout, then the fallback layout.
    ///
    /// The fallback is only adopted when both of its directories exist;
    /// a partial fallback keeps the primary candidates.
    pub fn resolve(base: &Path, version: TclVersion) -> Self {
        let primary = LibraryPaths::for_layout(base, Layout::Primary, version);
        if primary.all_exist() {
            tracing::info!("Found Tcl/Tk {} under {}", version, base.join("tcl").display());
            return Resolution::Found {
                layout: Layout::Primary,
                paths: primary,
            };
        }

        let fallback = LibraryPaths::for_layout(base, Layout::Fallback, version);
        tracing::debug!(
            "Primary Tcl/Tk directories incomplete, trying {} and {}",
            fallback.tcl_dir.display(),
            fallback.tk_dir.display()
        );
        if fallback.all_exist() {
            tracing::info!("Found Tcl/Tk {} under {}", version, base.join("lib").display());
            return Resolution::Found {
                layout: Layout::Fallback,
                paths: fallback,
            };
        }

        let missing = primary.missing().into_iter().map(Path::to_path_buf).collect();
        Resolution::Unresolved {
            paths: primary,
            missing,
        }
    }

    pub fn paths(&self) -> &LibraryPaths {
        match self {
            Resolution::Found { paths, .. } | Resolution::Unresolved { paths, .. } => paths,
        }
    }

    #[cfg(test)]
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }

    /// Advisory text for an unresolved lookup
    pub fn warning(&self) -> Option<String> {
        match self {
            Resolution::Found { .. } => None,
            Resolution::Unresolved { missing, .. } => {
                let dirs: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
                Some(format!(
                    "Warning: Tcl/Tk library directories not found: {}. \
                     Continuing; the interpreter may still locate Tcl/Tk on its own.",
                    dirs.join(", ")
                ))
            }
        }
    }
}
