use anyhow::Result;
use serde::{Serialize, Serializer};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::config::LauncherConfig;
use crate::error::LaunchError;
use crate::interpreter::{resolve_base_prefix, InterpreterHandle, PrefixProbe};
use crate::library_paths::Resolution;

/// Script to run and the arguments forwarded to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchSpec {
    pub script: PathBuf,
    #[serde(serialize_with = "serialize_lossy")]
    pub args: Vec<OsString>,
}

impl LaunchSpec {
    pub fn new(
        script: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<OsString>>,
    ) -> Self {
        Self {
            script: script.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

fn serialize_lossy<S: Serializer>(args: &[OsString], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(args.iter().map(|a| a.to_string_lossy()))
}

/// Everything needed to start the GUI: interpreter, Tcl/Tk overrides, target
#[derive(Debug, Clone, Serialize)]
pub struct LaunchPlan {
    pub interpreter: PathBuf,
    pub base_prefix: Option<PathBuf>,
    /// `None` when the base prefix could not be determined
    pub libraries: Option<Resolution>,
    pub spec: LaunchSpec,
}

/// Resolve the interpreter and Tcl/Tk directories for `config`.
///
/// Only a missing interpreter is an error. Unresolved library directories
/// print a warning and still yield a plan.
pub async fn prepare<P: PrefixProbe>(
    config: &LauncherConfig,
    probe: &P,
    args: Vec<OsString>,
) -> Result<LaunchPlan, LaunchError> {
    let interpreter = InterpreterHandle::locate(config)?;
    if !config.entry.is_file() {
        tracing::warn!("Entry script {} does not exist", config.entry.display());
    }

    let base_prefix = resolve_base_prefix(probe, &interpreter).await;
    let libraries = match &base_prefix {
        Some(base) => {
            let resolution = Resolution::resolve(base, config.tcl_version);
            if let Some(warning) = resolution.warning() {
                tracing::debug!("Tcl/Tk {} not found under {}", config.tcl_version, base.display());
                eprintln!("{}", warning);
            }
            Some(resolution)
        }
        None => {
            tracing::debug!("Could not determine base prefix of {}", interpreter.path().display());
            eprintln!(
                "Warning: could not determine the base installation of {}; \
                 TCL_LIBRARY and TK_LIBRARY are left unchanged.",
                interpreter.path().display()
            );
            None
        }
    };

    Ok(LaunchPlan {
        interpreter: interpreter.path().to_path_buf(),
        base_prefix,
        libraries,
        spec: LaunchSpec::new(&config.entry, args),
    })
}

impl LaunchPlan {
    /// Variables set on the child process, in `(TCL_LIBRARY, TK_LIBRARY)` order
    pub fn overrides(&self) -> Vec<(&'static str, &Path)> {
        self.libraries
            .as_ref()
            .map(|r| r.paths().env_vars().to_vec())
            .unwrap_or_default()
    }

    /// Command that runs the entry script with the overrides applied.
    ///
    /// The overrides live on the child only; this process's environment is
    /// left untouched.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&self.spec.script)
            .args(&self.spec.args)
            .envs(self.overrides());
        cmd
    }

    /// Shell-style description for `TK_LAUNCH_PRINT_ENV`
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.overrides() {
            out.push_str(&format!("{}={}\n", key, value.display()));
        }
        let mut line = vec![
            self.interpreter.display().to_string(),
            self.spec.script.display().to_string(),
        ];
        line.extend(self.spec.args.iter().map(|a| a.to_string_lossy().into_owned()));
        out.push_str(&line.join(" "));
        out.push('\n');
        out
    }

    /// Run the entry script in the foreground and return its exit code.
    ///
    /// Interrupts reaching this process are absorbed while the child runs;
    /// the terminal delivers them to the child as well.
    pub async fn launch(&self) -> Result<i32> {
        tracing::info!(
            "Launching {} {} with {} forwarded argument(s)",
            self.interpreter.display(),
            self.spec.script.display(),
            self.spec.args.len()
        );

        let mut child = self.command().spawn().map_err(|source| LaunchError::Spawn {
            program: self.interpreter.clone(),
            source,
        })?;

        let status = loop {
            tokio::select! {
                status = child.wait() => break status?,
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => tracing::debug!("Interrupt received, waiting for child to exit"),
                    Err(e) => {
                        tracing::warn!("Cannot listen for interrupts: {}", e);
                        break child.wait().await?;
                    }
                },
            }
        };

        tracing::debug!("Child exited with {}", status);
        Ok(status.code().unwrap_or(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TclVersion;
    use crate::library_paths::{Layout, LibraryPaths};
    use std::ffi::OsStr;

    fn plan(libraries: Option<Resolution>, args: &[&str]) -> LaunchPlan {
        LaunchPlan {
            interpreter: PathBuf::from("/proj/.venv/bin/python"),
            base_prefix: Some(PathBuf::from("/opt/py")),
            libraries,
            spec: LaunchSpec::new("/proj/main.py", args.iter().copied()),
        }
    }

    fn found() -> Resolution {
        Resolution::Found {
            layout: Layout::Primary,
            paths: LibraryPaths::for_layout(
                Path::new("/opt/py"),
                Layout::Primary,
                TclVersion::default(),
            ),
        }
    }

    #[test]
    fn test_command_forwards_args_in_order() {
        let args = ["photo one.jpg", "--flag", "$HOME", "a\"b", ""];
        let plan = plan(Some(found()), &args);
        let cmd = plan.command();
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), "/proj/.venv/bin/python");
        let got: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(got[0], "/proj/main.py");
        assert_eq!(&got[1..], &args.map(|a| OsStr::new(a)));
    }

    #[test]
    fn test_command_sets_library_overrides() {
        let plan = plan(Some(found()), &[]);
        let cmd = plan.command();
        let envs: Vec<_> = cmd.as_std().get_envs().collect();

        let tcl = (OsStr::new("TCL_LIBRARY"), Some(OsStr::new("/opt/py/tcl/tcl8.6")));
        let tk = (OsStr::new("TK_LIBRARY"), Some(OsStr::new("/opt/py/tcl/tk8.6")));
        assert!(envs.contains(&tcl));
        assert!(envs.contains(&tk));
    }

    #[test]
    fn test_no_overrides_without_base_prefix() {
        let plan = plan(None, &[]);
        assert!(plan.overrides().is_empty());
        assert_eq!(plan.command().as_std().get_envs().count(), 0);
    }

    #[test]
    fn test_render() {
        let plan = plan(Some(found()), &["x"]);
        assert_eq!(
            plan.render(),
            "TCL_LIBRARY=/opt/py/tcl/tcl8.6\n\
             TK_LIBRARY=/opt/py/tcl/tk8.6\n\
             /proj/.venv/bin/python /proj/main.py x\n"
        );
    }

    #[test]
    fn test_plan_json() {
        let plan = plan(Some(found()), &["a b"]);
        let value = serde_json::to_value(&plan).unwrap();

        assert_eq!(value["libraries"]["status"], "found");
        assert_eq!(value["libraries"]["layout"], "primary");
        assert_eq!(value["libraries"]["paths"]["tk_dir"], "/opt/py/tcl/tk8.6");
        assert_eq!(value["spec"]["args"][0], "a b");
    }
}
