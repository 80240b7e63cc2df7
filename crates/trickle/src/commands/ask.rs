use async_trait::async_trait;
use eyre::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use trickle_core::config::Config;
use trickle_core::{Request, SessionOutcome};

use super::Command;
use crate::build_orchestrator;
use crate::error::Error;
use crate::render::TerminalObserver;

/// Sends one query and types out the answer. Ctrl-C cancels it.
pub struct AskCommand {
    pub config: Config,
    pub session_id: String,
    pub query: String,
}

#[async_trait]
impl Command for AskCommand {
    async fn execute(&self) -> Result<()> {
        self.run().await.map_err(Into::into)
    }
}

impl AskCommand {
    async fn run(&self) -> std::result::Result<(), Error> {
        let orchestrator = build_orchestrator(&self.config)?;
        let observer = Arc::new(TerminalObserver::stdio());
        let request = Request::new(self.query.clone(), self.session_id.clone())
            .with_fields(self.config.fields.clone());
        let token = CancellationToken::new();

        debug!(target: "trickle::cli", session_id = %self.session_id, "Asking");

        let run = orchestrator.run(&request, token.clone(), observer.clone());
        tokio::pin!(run);

        let mut interrupted = false;
        let outcome = loop {
            tokio::select! {
                outcome = &mut run => break outcome,
                signal = tokio::signal::ctrl_c(), if !interrupted => {
                    signal?;
                    token.cancel();
                    interrupted = true;
                }
            }
        };

        match outcome {
            SessionOutcome::Completed => Ok(()),
            SessionOutcome::Errored { reason } => Err(Error::Request(reason)),
            SessionOutcome::Cancelled => {
                observer.notice("Cancelled");
                Err(Error::Cancelled)
            }
        }
    }
}
