use std::path::Path;
use std::sync::Arc;

use crate::shared::entities::{AnalysisReport, AudioClip, ClassificationResult};
use crate::shared::error::{ClassifyError, TranscribeError};
use crate::shared::media;
use crate::shared::ports::ai::{ClassifierPort, TranscriberPort};

pub mod fusion;

pub use fusion::DangerLexicon;

const NOTE_PROCESSING_FAILED: &str = "Processing failed";
const NOTE_MODEL_UNAVAILABLE: &str = "Model unavailable";
const STT_FAILED: &str = "Speech recognition failed";
const STT_UNAVAILABLE: &str = "Speech recognition unavailable";

/// Detection pipeline: normalize → classify → transcribe → fuse.
/// Each stage degrades to a placeholder instead of failing the request.
pub struct Detector {
    classifier: Arc<dyn ClassifierPort>,
    transcriber: Arc<dyn TranscriberPort>,
    lexicon: DangerLexicon,
}

impl Detector {
    pub fn new(
        classifier: Arc<dyn ClassifierPort>,
        transcriber: Arc<dyn TranscriberPort>,
        lexicon: DangerLexicon,
    ) -> Self {
        Self {
            classifier,
            transcriber,
            lexicon,
        }
    }

    pub async fn analyze(&self, audio_path: &Path) -> AnalysisReport {
        let clip = match normalize_file(audio_path).await {
            Ok(clip) => clip,
            Err(err) => {
                log::error!("[detect] audio processing error: {err:?}");
                return AnalysisReport {
                    classification: ClassificationResult::degraded(NOTE_PROCESSING_FAILED),
                    transcript: STT_FAILED.to_string(),
                    alert: false,
                };
            }
        };
        log::info!(
            "[detect] normalized clip: duration_ms={} rate={}",
            (clip.duration_secs() * 1000.0) as u64,
            clip.sample_rate
        );

        let classification = match self.classifier.classify(clip.clone()).await {
            Ok(result) => result,
            Err(ClassifyError::ModelNotLoaded) => {
                log::warn!("[detect] classifier unavailable");
                ClassificationResult::degraded(NOTE_MODEL_UNAVAILABLE)
            }
            Err(err) => {
                log::error!("[detect] classification error: {err}");
                ClassificationResult::degraded(NOTE_PROCESSING_FAILED)
            }
        };

        let (transcript, recognized) = match self.transcribe_clip(&clip).await {
            Ok(text) => (text.clone(), Some(text)),
            Err(TranscribeError::ServiceUnavailable) => {
                log::warn!("[detect] transcriber unavailable");
                (STT_UNAVAILABLE.to_string(), None)
            }
            Err(err) => {
                log::error!("[detect] speech recognition error: {err}");
                (STT_FAILED.to_string(), None)
            }
        };

        // A degraded classification never alerts; the placeholder row is not
        // a detection.
        let alert = if classification.is_degraded() {
            false
        } else {
            let labels = classification.labels();
            let spoken = recognized.as_deref().unwrap_or("");
            self.lexicon.evaluate(&labels, spoken)
        };
        log::info!(
            "[detect] decision alert={} top_label={} transcript_len={}",
            alert,
            classification
                .rows
                .first()
                .map(|r| r.label.as_str())
                .unwrap_or("-"),
            transcript.chars().count()
        );

        AnalysisReport {
            classification,
            transcript,
            alert,
        }
    }

    /// Writes the normalized clip to a temp PCM16 WAV for the transcriber.
    /// The temp file is removed when the guard drops; cleanup is best-effort.
    async fn transcribe_clip(&self, clip: &AudioClip) -> Result<String, TranscribeError> {
        let clip = clip.clone();
        let temp = tokio::task::spawn_blocking(move || -> anyhow::Result<tempfile::NamedTempFile> {
            let temp = tempfile::Builder::new()
                .prefix("sentinel-")
                .suffix(".wav")
                .tempfile()?;
            media::write_pcm16_wav(&clip, temp.path())?;
            Ok(temp)
        })
        .await
        .map_err(|e| TranscribeError::TranscriptionFailed(format!("join: {e}")))?
        .map_err(|e| TranscribeError::TranscriptionFailed(format!("temp wav: {e}")))?;

        let text = self.transcriber.transcribe(temp.path().to_path_buf()).await?;
        Ok(text)
    }
}

async fn normalize_file(path: &Path) -> anyhow::Result<AudioClip> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let clip = media::load_wav(&path)?;
        media::normalize(&clip)
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::shared::entities::LabelScore;
    use crate::shared::ports::ai::AiFuture;

    struct StaticClassifier {
        labels: Vec<&'static str>,
    }

    impl ClassifierPort for StaticClassifier {
        fn classify(
            &self,
            _clip: AudioClip,
        ) -> AiFuture<Result<ClassificationResult, ClassifyError>> {
            let rows = self
                .labels
                .iter()
                .map(|l| LabelScore {
                    label: l.to_string(),
                    confidence: 42.0,
                })
                .collect();
            Box::pin(async move { Ok(ClassificationResult::new(rows)) })
        }
    }

    struct FailingClassifier;

    impl ClassifierPort for FailingClassifier {
        fn classify(
            &self,
            _clip: AudioClip,
        ) -> AiFuture<Result<ClassificationResult, ClassifyError>> {
            Box::pin(async move { Err(ClassifyError::InferenceFailed("boom".to_string())) })
        }
    }

    struct StaticTranscriber {
        text: &'static str,
    }

    impl TranscriberPort for StaticTranscriber {
        fn transcribe(&self, _wav_path: PathBuf) -> AiFuture<Result<String, TranscribeError>> {
            let text = self.text.to_string();
            Box::pin(async move { Ok(text) })
        }
    }

    fn lexicon() -> DangerLexicon {
        DangerLexicon::new(
            vec!["Gunshot".to_string(), "Scream".to_string()],
            vec!["help".to_string()],
        )
    }

    fn write_fixture_wav(dir: &Path) -> PathBuf {
        let path = dir.join("fixture.wav");
        let clip = AudioClip::new(vec![0.05; 16_000], 16_000, 1);
        media::write_pcm16_wav(&clip, &path).unwrap();
        path
    }

    #[tokio::test]
    async fn danger_label_produces_alert() {
        let dir = tempfile::tempdir().unwrap();
        let wav = write_fixture_wav(dir.path());
        let detector = Detector::new(
            Arc::new(StaticClassifier {
                labels: vec!["Gunshot", "Speech"],
            }),
            Arc::new(StaticTranscriber { text: "" }),
            lexicon(),
        );

        let report = detector.analyze(&wav).await;
        assert!(report.alert);
        assert_eq!(report.classification.rows.len(), 2);
    }

    #[tokio::test]
    async fn distress_phrase_produces_alert() {
        let dir = tempfile::tempdir().unwrap();
        let wav = write_fixture_wav(dir.path());
        let detector = Detector::new(
            Arc::new(StaticClassifier {
                labels: vec!["Speech"],
            }),
            Arc::new(StaticTranscriber {
                text: "please help me now",
            }),
            lexicon(),
        );

        let report = detector.analyze(&wav).await;
        assert!(report.alert);
        assert_eq!(report.transcript, "please help me now");
    }

    #[tokio::test]
    async fn benign_audio_does_not_alert() {
        let dir = tempfile::tempdir().unwrap();
        let wav = write_fixture_wav(dir.path());
        let detector = Detector::new(
            Arc::new(StaticClassifier {
                labels: vec!["Speech"],
            }),
            Arc::new(StaticTranscriber {
                text: "nice weather today",
            }),
            lexicon(),
        );

        let report = detector.analyze(&wav).await;
        assert!(!report.alert);
    }

    #[tokio::test]
    async fn degraded_classification_suppresses_alert() {
        let dir = tempfile::tempdir().unwrap();
        let wav = write_fixture_wav(dir.path());
        let detector = Detector::new(
            Arc::new(FailingClassifier),
            Arc::new(StaticTranscriber {
                text: "help help help",
            }),
            lexicon(),
        );

        let report = detector.analyze(&wav).await;
        assert!(!report.alert);
        assert_eq!(
            report.classification.degraded.as_deref(),
            Some(NOTE_PROCESSING_FAILED)
        );
    }

    #[tokio::test]
    async fn unreadable_file_degrades_everything() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("not-audio.wav");
        std::fs::write(&bogus, b"definitely not a wav").unwrap();
        let detector = Detector::new(
            Arc::new(StaticClassifier {
                labels: vec!["Gunshot"],
            }),
            Arc::new(StaticTranscriber { text: "help" }),
            lexicon(),
        );

        let report = detector.analyze(&bogus).await;
        assert!(!report.alert);
        assert_eq!(report.transcript, STT_FAILED);
        assert!(report.classification.is_degraded());
    }

    #[tokio::test]
    async fn unavailable_transcriber_skips_keyword_branch() {
        let dir = tempfile::tempdir().unwrap();
        let wav = write_fixture_wav(dir.path());
        let detector = Detector::new(
            Arc::new(StaticClassifier {
                labels: vec!["Speech"],
            }),
            Arc::new(crate::service::ai::asr::UnavailableTranscriber::new()),
            // "speech recognition unavailable" must not match a keyword even
            // if one were a substring of the placeholder.
            DangerLexicon::new(vec![], vec!["unavailable".to_string()]),
        );

        let report = detector.analyze(&wav).await;
        assert!(!report.alert);
        assert_eq!(report.transcript, STT_UNAVAILABLE);
    }
}
