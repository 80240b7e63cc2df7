use async_trait::async_trait;
use eyre::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use trickle_core::config::Config;
use trickle_core::{Conversation, SessionOutcome, StreamOrchestrator};

use super::Command;
use crate::build_orchestrator;
use crate::error::Error;
use crate::render::TerminalObserver;

/// Line-oriented chat. Every line is a new request in one conversation; a
/// line typed while an answer is still streaming cancels that answer first.
/// Ctrl-C cancels the current answer, or exits when nothing is running.
pub struct ChatCommand {
    pub config: Config,
    pub session_id: String,
}

const QUIT_COMMANDS: [&str; 2] = ["/quit", "/exit"];

#[async_trait]
impl Command for ChatCommand {
    async fn execute(&self) -> Result<()> {
        self.run().await.map_err(Into::into)
    }
}

impl ChatCommand {
    async fn run(&self) -> std::result::Result<(), Error> {
        let orchestrator = Arc::new(build_orchestrator(&self.config)?);
        let conversation = Arc::new(Conversation::new(self.session_id.clone()));
        let observer = Arc::new(TerminalObserver::stdio());
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut current: Option<JoinHandle<SessionOutcome>> = None;

        observer.notice(&format!(
            "Session {}. Type a question and press Enter; /quit to leave.",
            self.session_id
        ));

        let mut quitting = false;
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    let query = line.trim();
                    if query.is_empty() {
                        continue;
                    }
                    if QUIT_COMMANDS.contains(&query) {
                        quitting = true;
                        break;
                    }

                    if let Some(previous) = current.take() {
                        conversation.cancel();
                        Self::settle(previous, &observer).await;
                    }
                    current = Some(self.spawn_request(&orchestrator, &conversation, &observer, query));
                }
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    match current.take() {
                        Some(running) if !running.is_finished() => {
                            conversation.cancel();
                            Self::settle(running, &observer).await;
                        }
                        _ => {
                            quitting = true;
                            break;
                        }
                    }
                }
            }
        }

        if let Some(running) = current.take() {
            // End of input lets the last answer finish; an explicit quit does not.
            if quitting {
                conversation.cancel();
            }
            Self::settle(running, &observer).await;
        }
        Ok(())
    }

    fn spawn_request(
        &self,
        orchestrator: &Arc<StreamOrchestrator>,
        conversation: &Arc<Conversation>,
        observer: &Arc<TerminalObserver>,
        query: &str,
    ) -> JoinHandle<SessionOutcome> {
        let request = conversation
            .request(query)
            .with_fields(self.config.fields.clone());
        let orchestrator = Arc::clone(orchestrator);
        let conversation = Arc::clone(conversation);
        let observer = Arc::clone(observer);

        tokio::spawn(async move {
            orchestrator
                .run_in(&conversation, &request, observer)
                .await
        })
    }

    async fn settle(handle: JoinHandle<SessionOutcome>, observer: &TerminalObserver) {
        match handle.await {
            Ok(SessionOutcome::Cancelled) => observer.notice("Cancelled"),
            Ok(outcome) => debug!(target: "trickle::cli", phase = %outcome.phase(), "Answer finished"),
            Err(e) => warn!(target: "trickle::cli", error = %e, "Request task failed"),
        }
    }
}
