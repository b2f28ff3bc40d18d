use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Model not loaded")]
    ModelNotLoaded,
    #[error("Audio format invalid")]
    InvalidFormat,
}

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),
    #[error("Service unavailable")]
    ServiceUnavailable,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Generation failed: {0}")]
    GenerationFailed(String),
    #[error("API key missing")]
    MissingApiKey,
}
