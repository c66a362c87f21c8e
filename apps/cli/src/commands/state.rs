//! Implementation of the `scfdeploy state` commands.

use std::path::PathBuf;

use clap::Args;
use scfdeploy_deploy::EngineConfig;
use scfdeploy_state::{JsonFileStore, StateStore, default_state_path};

/// Selects the state file to operate on.
#[derive(Args, Debug)]
pub struct StateArgs {
    /// Function name; the file is <stateRoot>/<name>/state.json
    #[arg(short, long, required_unless_present = "path")]
    pub name: Option<String>,

    /// Explicit state file path
    #[arg(long)]
    pub path: Option<PathBuf>,
}

impl StateArgs {
    fn store(&self, config: &EngineConfig) -> anyhow::Result<JsonFileStore> {
        match (&self.path, &self.name) {
            (Some(path), _) => Ok(JsonFileStore::new(path.clone())),
            (None, Some(name)) => Ok(JsonFileStore::new(default_state_path(
                &config.state_root,
                name,
            ))),
            (None, None) => anyhow::bail!("either --name or --path is required"),
        }
    }
}

pub fn show(config: &EngineConfig, args: &StateArgs) -> anyhow::Result<()> {
    let store = args.store(config)?;
    let state = store.load()?;
    if state.is_empty() {
        eprintln!("No function deployed ({})", store.path().display());
    }
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

pub fn clear(config: &EngineConfig, args: &StateArgs) -> anyhow::Result<()> {
    let store = args.store(config)?;
    store.clear()?;
    tracing::info!(path = %store.path().display(), "state cleared");
    Ok(())
}
