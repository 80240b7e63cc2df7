use clap::Parser;
use eyre::Result;
use trickle::cli::config::{config_path, load_env, resolve_config};
use trickle::cli::{Cli, Commands, ConfigCommands};
use trickle::commands::{
    Command,
    ask::AskCommand,
    chat::ChatCommand,
    config::{ConfigAction, ConfigCommand},
};
use trickle::error::Error;
use uuid::Uuid;

/// Exit status used when the user interrupts a request.
const EXIT_INTERRUPTED: i32 = 130;
const EXIT_REQUEST_FAILED: i32 = 1;

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre for better error reports
    color_eyre::install()?;

    let cli = Cli::parse();

    // Load .env file if it exists
    load_env()?;

    // Initialize tracing (level configured via RUST_LOG env var)
    trickle_core::utils::tracing::init_tracing()?;

    let result = run(cli).await;
    // Both outcomes were already shown on stderr by the terminal observer.
    match result.as_ref().err().and_then(|e| e.downcast_ref::<Error>()) {
        Some(Error::Cancelled) => std::process::exit(EXIT_INTERRUPTED),
        Some(Error::Request(_)) => std::process::exit(EXIT_REQUEST_FAILED),
        _ => result,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let session_id = cli
        .session
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let command: Box<dyn Command> = match cli.command.clone() {
        Commands::Ask { query } => Box::new(AskCommand {
            config: resolve_config(&cli)?,
            session_id,
            query: query.join(" "),
        }),
        Commands::Chat => Box::new(ChatCommand {
            config: resolve_config(&cli)?,
            session_id,
        }),
        Commands::Config { action } => {
            let path = config_path(&cli)?;
            let action = match action {
                ConfigCommands::Show => ConfigAction::Show(resolve_config(&cli)?),
                ConfigCommands::Init { force } => ConfigAction::Init { force },
            };
            Box::new(ConfigCommand { action, path })
        }
    };

    tracing::debug!(target: "trickle::cli", "Dispatching command");
    command.execute().await
}
