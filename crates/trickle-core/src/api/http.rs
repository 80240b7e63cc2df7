use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::{ApiError, ByteStream, Request, StreamError, Transport};

/// Posts requests to the query service and streams back the response body.
#[derive(Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: Url) -> Result<Self, ApiError> {
        Self::with_timeout(endpoint, None)
    }

    pub fn with_timeout(endpoint: Url, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn open(
        &self,
        request: &Request,
        token: CancellationToken,
    ) -> Result<ByteStream, ApiError> {
        debug!(
            target: "trickle::http",
            endpoint = %self.endpoint,
            session_id = %request.session_id,
            "Opening event stream"
        );

        let pending = self
            .http_client
            .post(self.endpoint.clone())
            .json(request)
            .send();

        let response = tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(target: "trickle::http", "Cancellation token triggered before response arrived.");
                return Err(ApiError::Cancelled);
            }
            res = pending => res?
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = tokio::select! {
                biased;
                () = token.cancelled() => return Err(ApiError::Cancelled),
                text = response.text() => text.unwrap_or_else(|_| String::new()),
            };

            debug!(
                target: "trickle::http",
                "Query service error - Status: {}, Body: {}",
                status,
                error_text
            );

            return Err(ApiError::ServerError {
                status_code: status.as_u16(),
                details: error_text,
            });
        }

        let byte_stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| StreamError::Transport {
                details: e.to_string(),
            })
        });

        Ok(Box::pin(byte_stream))
    }
}
