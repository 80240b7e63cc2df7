use async_trait::async_trait;
use eyre::Result;
use std::io::Write;
use std::path::PathBuf;
use trickle_core::config::Config;

use super::Command;
use crate::error::Error;

pub struct ConfigCommand {
    pub action: ConfigAction,
    pub path: PathBuf,
}

pub enum ConfigAction {
    /// Print the effective config, after environment and flag overrides.
    Show(Config),
    Init { force: bool },
}

#[async_trait]
impl Command for ConfigCommand {
    async fn execute(&self) -> Result<()> {
        match &self.action {
            ConfigAction::Show(config) => self.show(config).map_err(Into::into),
            ConfigAction::Init { force } => self.init(*force).map_err(Into::into),
        }
    }
}

impl ConfigCommand {
    fn show(&self, config: &Config) -> std::result::Result<(), Error> {
        let mut stdout = std::io::stdout();
        let status = if self.path.exists() { "" } else { " (not created yet)" };
        writeln!(stdout, "Config file: {}{status}", self.path.display())?;
        writeln!(stdout, "\n{}", toml::to_string_pretty(config)?)?;
        Ok(())
    }

    fn init(&self, force: bool) -> std::result::Result<(), Error> {
        if self.path.exists() && !force {
            return Err(Error::Config(format!(
                "{} already exists; pass --force to overwrite it",
                self.path.display()
            )));
        }

        Config::default().save_to(&self.path)?;

        let mut stdout = std::io::stdout();
        writeln!(stdout, "Wrote {}", self.path.display())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_defaults_and_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trickle").join("config.toml");
        let command = ConfigCommand {
            action: ConfigAction::Init { force: false },
            path: path.clone(),
        };

        command.init(false).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());

        assert!(matches!(command.init(false), Err(Error::Config(_))));
        command.init(true).unwrap();
    }
}
