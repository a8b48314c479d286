//! Per-request orchestration: validate → sniff → decode → forward →
//! respond, with archiving running alongside and never gating a
//! stage. Exactly one terminal outcome per request.

use std::time::Instant;

use bytes::Bytes;
use tokio::time::timeout;

use voxgate_archive::ArchiveKey;
use voxgate_core::context::RequestMeta;
use voxgate_core::errors::PipelineError;
use voxgate_core::headers;
use voxgate_core::ids::RequestId;
use voxgate_core::sniff::{self, AudioFormat};
use voxgate_core::transcript::Transcript;
use voxgate_decode::DecodeJob;

use crate::server::AppState;

/// Run the full pipeline for one request body. Archive uploads are
/// spawned as soon as their inputs exist and are never awaited here.
pub async fn run(
    state: &AppState,
    request_id: &RequestId,
    meta: RequestMeta,
    body: Bytes,
) -> Result<Transcript, PipelineError> {
    // Validation. A rejected request never touches the subprocess or
    // the upstream.
    if let Some(field) = headers::validate(&meta) {
        log_rejected_headers(request_id, &meta, field);
        return Err(PipelineError::Validation { field });
    }

    let format = sniff::sniff(&body);
    if format == AudioFormat::Unknown {
        return Err(PipelineError::UnrecognizedFormat);
    }

    // Audio and metadata can be archived from here on; the uploads
    // run on their own tasks and their failures only warn.
    let key = ArchiveKey::generate();
    if let Some(archiver) = &state.archiver {
        if meta.store_sample_enabled() {
            drop(archiver.store_audio(request_id, &key, body.clone(), format));
            drop(archiver.store_metadata(request_id, &key, &meta));
        }
    }

    // Decode. The job owns the subprocess; a failure before any
    // output means the forwarder is never called.
    let decode_start = Instant::now();
    tracing::info!(request_id = %request_id, format = ?format, "decode.start");

    let mut job = DecodeJob::spawn(&state.decode, format, body)?;
    timeout(state.config.decode_timeout, job.first_output())
        .await
        .map_err(|_| PipelineError::DecodeTimeout(state.config.decode_timeout))??;
    let (pcm, decode_handle) = job.into_stream();

    // Forward. The PCM stream is the request body, so upstream
    // consumption paces the decoder directly.
    let asr_start = Instant::now();
    tracing::info!(request_id = %request_id, "asr.start");

    let transcript = match state.asr.recognize(pcm, meta.language.as_deref()).await {
        Ok(transcript) => transcript,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                error = %e,
                elapsed_ms = asr_start.elapsed().as_millis() as u64,
                "asr.error"
            );
            // Dropping the handle reaps the subprocess.
            return Err(e.into());
        }
    };

    // The upstream has the full stream, so the decoder has exited.
    // Settle it before responding: a transcript built from a failed
    // decode must never leave the building.
    let stderr = timeout(state.config.decode_timeout, decode_handle.finish())
        .await
        .map_err(|_| PipelineError::DecodeTimeout(state.config.decode_timeout))??;
    tracing::info!(
        request_id = %request_id,
        elapsed_ms = decode_start.elapsed().as_millis() as u64,
        stderr = %stderr,
        "decode.finish"
    );
    tracing::info!(
        request_id = %request_id,
        elapsed_ms = asr_start.elapsed().as_millis() as u64,
        "asr.finish"
    );

    if let Some(archiver) = &state.archiver {
        if meta.store_transcription_enabled() {
            drop(archiver.store_transcript(request_id, &key, &transcript));
        }
    }

    Ok(transcript)
}

/// Log a rejected header set hex-encoded. The raw values never reach
/// the logs, so a crafted header cannot smuggle anything executable or
/// line-structured into downstream log consumers.
fn log_rejected_headers(request_id: &RequestId, meta: &RequestMeta, field: &'static str) {
    let hex = |v: &Option<String>| v.as_deref().map(headers::hex_encode);
    tracing::warn!(
        request_id = %request_id,
        field,
        language = ?hex(&meta.language),
        store_sample = ?hex(&meta.store_sample),
        store_transcription = ?hex(&meta.store_transcription),
        user_agent = ?hex(&meta.user_agent),
        product_tag = ?hex(&meta.product_tag),
        "request.invalid_headers"
    );
}
