pub mod cancel;
pub mod observer;
pub mod orchestrator;
pub mod state;

pub use cancel::Conversation;
pub use observer::{ChannelObserver, ObserverEvent, StreamObserver};
pub use orchestrator::StreamOrchestrator;
pub use state::{SessionOutcome, SessionPhase, SessionState};
