use bytes::Bytes;

use crate::server::AppState;

/// Transcript text the ASR backend is expected to produce for the
/// canned heartbeat sample.
const SENTINEL: &str = "HEART BEAT";

/// Deep health: replay the canned audio sample straight through the
/// upstream forwarder (it is already in the backend's input form, so
/// no decode) and look for the sentinel transcript. Any transport,
/// parse, or mismatch failure is unhealthy.
pub async fn deep_health(state: &AppState) -> bool {
    // A missing sample file degrades to an empty probe body rather
    // than failing the check outright.
    let sample = tokio::fs::read(&state.config.heartbeat_file)
        .await
        .unwrap_or_default();

    match state.asr.recognize_bytes(Bytes::from(sample), None).await {
        Ok(transcript) => {
            let healthy = transcript.contains_text(SENTINEL);
            if !healthy {
                tracing::warn!("heartbeat reply did not contain the sentinel transcript");
            }
            healthy
        }
        Err(e) => {
            tracing::warn!(error = %e, "heartbeat probe failed");
            false
        }
    }
}
