use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::task::JoinHandle;

use voxgate_core::context::RequestMeta;
use voxgate_core::ids::RequestId;
use voxgate_core::sniff::AudioFormat;
use voxgate_core::transcript::Transcript;

use crate::key::ArchiveKey;
use crate::store::ObjectStore;

/// Fire-and-forget uploader. Each artifact goes up in its own
/// spawned task: a failed upload is logged with the request's
/// correlation id and changes nothing else, neither the other
/// uploads nor the client response.
#[derive(Clone)]
pub struct Archiver {
    store: Arc<dyn ObjectStore>,
}

impl Archiver {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Upload the original audio body. Caller receives the task
    /// handle for tests but normally drops it.
    pub fn store_audio(
        &self,
        request_id: &RequestId,
        key: &ArchiveKey,
        body: Bytes,
        format: AudioFormat,
    ) -> JoinHandle<()> {
        self.upload(
            request_id,
            key.artifact(&format!("audio.{}", format.extension())),
            body,
            format.content_type(),
        )
    }

    /// Upload the post-validation request metadata document.
    pub fn store_metadata(
        &self,
        request_id: &RequestId,
        key: &ArchiveKey,
        meta: &RequestMeta,
    ) -> JoinHandle<()> {
        let doc = serde_json::json!({
            "received_at": chrono::Utc::now().to_rfc3339(),
            "language": meta.language,
            "store_sample": meta.store_sample_enabled(),
            "store_transcription": meta.store_transcription_enabled(),
            "user_agent": meta.user_agent,
            "product_tag": meta.product_tag,
        });
        self.upload(
            request_id,
            key.artifact("metadata.json"),
            Bytes::from(doc.to_string()),
            "application/json",
        )
    }

    /// Upload the transcript exactly as it was relayed to the client.
    pub fn store_transcript(
        &self,
        request_id: &RequestId,
        key: &ArchiveKey,
        transcript: &Transcript,
    ) -> JoinHandle<()> {
        self.upload(
            request_id,
            key.artifact("transcript.json"),
            Bytes::from(transcript.to_json_bytes()),
            "application/json",
        )
    }

    fn upload(
        &self,
        request_id: &RequestId,
        key: String,
        bytes: Bytes,
        content_type: &'static str,
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let request_id = request_id.clone();
        let size = bytes.len();
        tokio::spawn(async move {
            let start = Instant::now();
            tracing::info!(request_id = %request_id, key = %key, size, "archive.start");
            match store.put(&key, bytes, content_type).await {
                Ok(()) => tracing::info!(
                    request_id = %request_id,
                    key = %key,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "archive.finish"
                ),
                Err(e) => tracing::warn!(
                    request_id = %request_id,
                    key = %key,
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "archive.error"
                ),
            }
        })
    }
}
