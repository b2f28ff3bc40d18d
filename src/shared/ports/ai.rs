use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::shared::entities::{AudioClip, ClassificationResult};
use crate::shared::error::{ClassifyError, LlmError, TranscribeError};

pub type AiFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Sound-event classifier over a normalized (mono, 16 kHz) clip.
pub trait ClassifierPort: Send + Sync {
    fn classify(&self, clip: AudioClip) -> AiFuture<Result<ClassificationResult, ClassifyError>>;
}

/// Speech-to-text over a PCM16 WAV file on disk.
pub trait TranscriberPort: Send + Sync {
    fn transcribe(&self, wav_path: PathBuf) -> AiFuture<Result<String, TranscribeError>>;
}

/// Generative-text reply for the support chatbot.
pub trait LlmPort: Send + Sync {
    fn generate_reply(&self, user_message: String) -> AiFuture<Result<String, LlmError>>;
}
