// Core trickle functionality without terminal dependencies

pub mod api;
pub mod config;
pub mod error;
pub mod session;
pub mod stream;
pub mod test_utils;
pub mod typing;
pub mod utils;

pub use api::{ApiError, HttpTransport, Request, StreamError, Transport};
pub use session::{
    ChannelObserver, Conversation, ObserverEvent, SessionOutcome, SessionPhase,
    StreamObserver, StreamOrchestrator,
};
pub use stream::{Event, EventDecoder};
pub use typing::{DelayClass, DrainPhase, TypingConfig, TypingScheduler};
