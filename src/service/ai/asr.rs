use std::path::PathBuf;

use reqwest::multipart;
use serde::Deserialize;

use crate::shared::config;
use crate::shared::error::TranscribeError;
use crate::shared::ports::ai::{AiFuture, TranscriberPort};

#[derive(Deserialize)]
struct TranscriberResponse {
    text: String,
}

/// Client for an external whisper-style speech-to-text server: the WAV goes
/// out as a multipart `file` part, the transcript comes back as `{"text"}`.
pub struct HttpTranscriber {
    url: String,
}

impl HttpTranscriber {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

impl TranscriberPort for HttpTranscriber {
    fn transcribe(&self, wav_path: PathBuf) -> AiFuture<Result<String, TranscribeError>> {
        let url = self.url.clone();
        Box::pin(async move { transcribe_file(&url, &wav_path).await })
    }
}

async fn transcribe_file(url: &str, wav_path: &PathBuf) -> Result<String, TranscribeError> {
    let client = super::http_client(config::timeouts().ai_http)
        .map_err(|e| TranscribeError::TranscriptionFailed(format!("client: {e}")))?;
    let bytes = tokio::fs::read(wav_path)
        .await
        .map_err(|e| TranscribeError::TranscriptionFailed(format!("read wav: {e}")))?;

    let part = multipart::Part::bytes(bytes)
        .file_name("clip.wav")
        .mime_str("audio/wav")
        .map_err(|e| TranscribeError::TranscriptionFailed(format!("mime: {e}")))?;
    let form = multipart::Form::new().part("file", part);

    let resp = client
        .post(url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| TranscribeError::TranscriptionFailed(format!("http: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(TranscribeError::TranscriptionFailed(format!(
            "status {}: {}",
            status, body
        )));
    }

    let result: TranscriberResponse = resp
        .json()
        .await
        .map_err(|e| TranscribeError::TranscriptionFailed(format!("parse: {e}")))?;
    log::info!("[asr] transcript_len={}", result.text.chars().count());
    Ok(result.text)
}

/// Stand-in when no transcriber endpoint is configured; the pipeline renders
/// the "Speech recognition unavailable" placeholder and skips the keyword
/// branch.
#[derive(Clone, Debug, Default)]
pub struct UnavailableTranscriber;

impl UnavailableTranscriber {
    pub fn new() -> Self {
        Self
    }
}

impl TranscriberPort for UnavailableTranscriber {
    fn transcribe(&self, _wav_path: PathBuf) -> AiFuture<Result<String, TranscribeError>> {
        Box::pin(async move { Err(TranscribeError::ServiceUnavailable) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_transcriber_reports_service_unavailable() {
        let err = UnavailableTranscriber::new()
            .transcribe(PathBuf::from("/nonexistent.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscribeError::ServiceUnavailable));
    }
}
