pub mod error;
pub mod http;
pub mod request;

use async_trait::async_trait;
use futures_core::Stream;
use std::pin::Pin;
use tokio_util::bytes::Bytes;
use tokio_util::sync::CancellationToken;

pub use error::{ApiError, StreamError};
pub use http::HttpTransport;
pub use request::Request;

/// Raw response body, delivered in whatever chunk sizes the network produces.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// Issues a request and hands back the event-stream body.
///
/// Implementations must give up promptly once `token` is cancelled and
/// return [`ApiError::Cancelled`] in that case.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn open(&self, request: &Request, token: CancellationToken)
    -> Result<ByteStream, ApiError>;
}
