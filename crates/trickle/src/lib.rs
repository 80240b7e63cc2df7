pub mod cli;
pub mod commands;
pub mod error;
pub mod render;

pub use trickle_core::{api, config, session, stream, typing, utils};

use std::sync::Arc;
use trickle_core::StreamOrchestrator;
use trickle_core::config::Config;

/// Builds an orchestrator that talks HTTP to the configured endpoint.
pub fn build_orchestrator(config: &Config) -> Result<StreamOrchestrator, error::Error> {
    let transport = config.transport()?;
    Ok(StreamOrchestrator::new(
        Arc::new(transport),
        config.typing.clone(),
    ))
}
