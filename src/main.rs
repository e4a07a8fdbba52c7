use anyhow::{Context, Result};
use std::ffi::OsString;
use tracing_subscriber::EnvFilter;

use tk_venv_launcher::config::{LauncherConfig, Settings};
use tk_venv_launcher::error::LaunchError;
use tk_venv_launcher::interpreter::PythonProbe;
use tk_venv_launcher::launcher;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let settings = Settings::from_env();

    // Initialize logging on stderr so the GUI's stdout stays clean
    let default_level = if settings.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Every argument belongs to the entry script, `--help` and `--` included
    let forwarded: Vec<OsString> = std::env::args_os().skip(1).collect();

    match run(settings, forwarded).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let code = e
                .downcast_ref::<LaunchError>()
                .map(LaunchError::exit_code)
                .unwrap_or(1);
            eprintln!("Error: {:#}", e);
            std::process::exit(code);
        }
    }
}

async fn run(settings: Settings, forwarded: Vec<OsString>) -> Result<i32> {
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    let config = LauncherConfig::from_settings(&settings, &cwd)?;
    tracing::debug!("Launcher configuration: {:?}", config);

    let plan = launcher::prepare(&config, &PythonProbe, forwarded).await?;

    if settings.print_env {
        if settings.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            print!("{}", plan.render());
        }
        return Ok(0);
    }

    plan.launch().await
}
