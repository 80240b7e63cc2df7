use dotenvy::dotenv;
use eyre::Result;
use std::path::PathBuf;
use trickle_core::config::Config;
use url::Url;

use super::Cli;
use crate::error::Error;

pub fn load_env() -> Result<()> {
    dotenv().ok();
    Ok(())
}

/// Path of the config file this invocation reads and writes.
pub fn config_path(cli: &Cli) -> std::result::Result<PathBuf, Error> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => Ok(Config::config_path()?),
    }
}

/// Loads the config file, then applies environment and command-line
/// overrides in that order.
pub fn resolve_config(cli: &Cli) -> std::result::Result<Config, Error> {
    let mut config = match &cli.config {
        // An explicitly named file must parse; it may not exist yet.
        Some(path) if path.exists() => Config::load_from(path)?,
        Some(_) => Config::default(),
        None => Config::load()?,
    };
    config.apply_env_overrides()?;
    apply_cli_overrides(&mut config, cli)?;
    Ok(config)
}

pub fn apply_cli_overrides(config: &mut Config, cli: &Cli) -> std::result::Result<(), Error> {
    if let Some(endpoint) = &cli.endpoint {
        Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("Invalid --endpoint '{endpoint}': {e}")))?;
        config.endpoint.clone_from(endpoint);
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.typing.base_delay_ms = delay_ms;
    }
    for field in &cli.fields {
        config
            .fields
            .insert(field.key.clone(), field.value.clone());
    }
    Ok(())
}
