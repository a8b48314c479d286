//! Upstream forwarder: one streaming HTTP POST per request to the
//! speech-recognition backend. Never retries; a failed attempt is
//! terminal for the request that owns it.

use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use reqwest::Client;

use voxgate_core::errors::PipelineError;
use voxgate_core::transcript::Transcript;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed query parameters the backend expects on every request.
const QUERY: &[(&str, &str)] = &[("endofspeech", "false"), ("nbest", "10")];

#[derive(Debug, thiserror::Error)]
pub enum AsrError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("reply was not valid JSON")]
    Parse,
}

impl From<AsrError> for PipelineError {
    fn from(e: AsrError) -> Self {
        match e {
            AsrError::Transport(msg) => PipelineError::UpstreamTransport(msg),
            AsrError::Timeout(d) => PipelineError::UpstreamTimeout(d),
            AsrError::Parse => PipelineError::UpstreamParse,
        }
    }
}

/// Client for the ASR backend. One instance is shared across
/// requests; each call is a single attempt bounded by `timeout`.
#[derive(Clone)]
pub struct AsrClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl AsrClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            url: url.into(),
            timeout,
        }
    }

    /// POST a PCM byte stream and parse the JSON reply. The stream is
    /// consumed as the connection accepts it, so a slow backend
    /// throttles the producer. A validated language tag, when
    /// present, travels as `Accept-Language`.
    pub async fn recognize<S>(
        &self,
        body: S,
        language: Option<&str>,
    ) -> Result<Transcript, AsrError>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        self.send(reqwest::Body::wrap_stream(body), language).await
    }

    /// POST an in-memory payload. Used by the deep-health probe,
    /// whose canned sample is already in the backend's input form.
    pub async fn recognize_bytes(
        &self,
        body: Bytes,
        language: Option<&str>,
    ) -> Result<Transcript, AsrError> {
        self.send(reqwest::Body::from(body), language).await
    }

    async fn send(
        &self,
        body: reqwest::Body,
        language: Option<&str>,
    ) -> Result<Transcript, AsrError> {
        let mut req = self
            .client
            .post(&self.url)
            .query(QUERY)
            .header("content-type", "application/octet-stream")
            .timeout(self.timeout)
            .body(body);

        if let Some(tag) = language {
            req = req.header("accept-language", tag);
        }

        let resp = req.send().await.map_err(|e| self.classify(e))?;
        let status = resp.status();
        let raw = resp.bytes().await.map_err(|e| self.classify(e))?;

        // The backend's reply body is relayed verbatim when it is
        // valid JSON, whatever the status code said; an unparseable
        // body is an internal error, never echoed to the client.
        match serde_json::from_slice(&raw) {
            Ok(value) => Ok(Transcript::from_value(value)),
            Err(_) => {
                tracing::warn!(status = status.as_u16(), "unparseable ASR reply");
                Err(AsrError::Parse)
            }
        }
    }

    fn classify(&self, e: reqwest::Error) -> AsrError {
        if e.is_timeout() {
            AsrError::Timeout(self.timeout)
        } else {
            AsrError::Transport(e.to_string())
        }
    }
}
