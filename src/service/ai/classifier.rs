use std::cmp::Ordering;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ndarray::{Axis, Ix2};

use crate::service::ai::class_map::ClassMap;
use crate::shared::config::ClassifierConfig;
use crate::shared::entities::{AudioClip, ClassificationResult, LabelScore};
use crate::shared::error::ClassifyError;
use crate::shared::media::TARGET_SAMPLE_RATE;
use crate::shared::ports::ai::{AiFuture, ClassifierPort};

/// Fixed result width: the top five labels by mean score.
const TOP_K: usize = 5;

/// YAMNet-style sound-event classifier backed by an ONNX Runtime session.
/// The session is built once at startup and shared for the process lifetime;
/// inference runs on the blocking pool.
pub struct OnnxClassifier {
    session: Arc<Mutex<ort::session::Session>>,
    class_map: Arc<ClassMap>,
}

impl OnnxClassifier {
    /// Resolve the model file and build the session. Blocking; call from the
    /// blocking pool at startup.
    pub fn load_from_config(
        cfg: &ClassifierConfig,
        class_map: Arc<ClassMap>,
    ) -> Result<Self, ClassifyError> {
        let model_path = resolve_model(cfg)?;
        log::info!("[classifier] loading model from {:?}", model_path);
        let session = ort::session::Session::builder()
            .and_then(|mut b| b.commit_from_file(&model_path))
            .map_err(|e| ClassifyError::InferenceFailed(format!("session init: {e}")))?;
        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            class_map,
        })
    }

    fn run_inference(
        session: &Arc<Mutex<ort::session::Session>>,
        class_map: &ClassMap,
        clip: &AudioClip,
    ) -> Result<ClassificationResult, ClassifyError> {
        if clip.channels != 1 || clip.sample_rate != TARGET_SAMPLE_RATE {
            return Err(ClassifyError::InvalidFormat);
        }
        if clip.samples.is_empty() {
            return Err(ClassifyError::InvalidFormat);
        }

        let waveform = ndarray::Array1::from(clip.samples.clone());
        let input = ort::value::Tensor::from_array(waveform)
            .map_err(|e| ClassifyError::InferenceFailed(format!("input tensor: {e}")))?;

        let mut session = session
            .lock()
            .map_err(|_| ClassifyError::InferenceFailed("session lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| ClassifyError::InferenceFailed(format!("run: {e}")))?;

        // Scores tensor: [frames, num_classes].
        let scores = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| ClassifyError::InferenceFailed(format!("extract scores: {e}")))?;
        let scores = scores
            .into_dimensionality::<Ix2>()
            .map_err(|e| ClassifyError::InferenceFailed(format!("scores shape: {e}")))?;
        let mean = scores
            .mean_axis(Axis(0))
            .ok_or_else(|| ClassifyError::InferenceFailed("empty score frames".to_string()))?;

        let mut indices: Vec<usize> = (0..mean.len()).collect();
        indices.sort_by(|&a, &b| {
            mean[b]
                .partial_cmp(&mean[a])
                .unwrap_or(Ordering::Equal)
        });

        let rows = indices
            .into_iter()
            .take(TOP_K)
            .map(|i| LabelScore {
                label: class_map.name(i),
                confidence: mean[i] * 100.0,
            })
            .collect();

        Ok(ClassificationResult::new(rows))
    }
}

impl ClassifierPort for OnnxClassifier {
    fn classify(&self, clip: AudioClip) -> AiFuture<Result<ClassificationResult, ClassifyError>> {
        let session = self.session.clone();
        let class_map = self.class_map.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || Self::run_inference(&session, &class_map, &clip))
                .await
                .map_err(|e| ClassifyError::InferenceFailed(format!("join: {e}")))?
        })
    }
}

/// Stand-in used when no model is configured or loading failed. Every call
/// reports `ModelNotLoaded`, which the pipeline renders as the
/// "Model unavailable" placeholder.
#[derive(Clone, Debug, Default)]
pub struct UnavailableClassifier;

impl UnavailableClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ClassifierPort for UnavailableClassifier {
    fn classify(&self, _clip: AudioClip) -> AiFuture<Result<ClassificationResult, ClassifyError>> {
        Box::pin(async move { Err(ClassifyError::ModelNotLoaded) })
    }
}

/// Model file resolution order: explicit path, platform cache, download.
fn resolve_model(cfg: &ClassifierConfig) -> Result<PathBuf, ClassifyError> {
    if let Some(path) = cfg.model_path.as_ref() {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(ClassifyError::InferenceFailed(format!(
            "model path does not exist: {path:?}"
        )));
    }

    let url = cfg.model_url.as_ref().ok_or(ClassifyError::ModelNotLoaded)?;
    let cache_dir = model_cache_dir()?;
    let file_name = url
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or("classifier.onnx");
    let cached = cache_dir.join(file_name);
    if cached.exists() {
        return Ok(cached);
    }

    std::fs::create_dir_all(&cache_dir)
        .map_err(|e| ClassifyError::InferenceFailed(format!("create cache dir: {e}")))?;
    download(url, &cached)?;
    Ok(cached)
}

fn model_cache_dir() -> Result<PathBuf, ClassifyError> {
    dirs::cache_dir()
        .map(|d| d.join("audio-sentinel").join("models"))
        .ok_or_else(|| ClassifyError::InferenceFailed("no cache directory".to_string()))
}

/// Download to `<dest>.part`, then rename, so an interrupted fetch never
/// leaves a half-written model behind.
fn download(url: &str, dest: &Path) -> Result<(), ClassifyError> {
    log::info!("[classifier] downloading model {}", url);
    let response = reqwest::blocking::get(url)
        .map_err(|e| ClassifyError::InferenceFailed(format!("download {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(ClassifyError::InferenceFailed(format!(
            "download {url}: status {}",
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .map_err(|e| ClassifyError::InferenceFailed(format!("download body: {e}")))?;

    let temp_path = dest.with_extension("part");
    let mut file = std::fs::File::create(&temp_path)
        .map_err(|e| ClassifyError::InferenceFailed(format!("create {temp_path:?}: {e}")))?;
    file.write_all(&bytes)
        .map_err(|e| ClassifyError::InferenceFailed(format!("write model: {e}")))?;
    file.flush()
        .map_err(|e| ClassifyError::InferenceFailed(format!("flush model: {e}")))?;
    drop(file);
    std::fs::rename(&temp_path, dest)
        .map_err(|e| ClassifyError::InferenceFailed(format!("rename model: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_classifier_reports_model_not_loaded() {
        let clip = AudioClip::new(vec![0.0; 16_000], TARGET_SAMPLE_RATE, 1);
        let err = UnavailableClassifier::new().classify(clip).await.unwrap_err();
        assert!(matches!(err, ClassifyError::ModelNotLoaded));
    }

    #[test]
    fn resolve_model_without_path_or_url_is_not_loaded() {
        let cfg = ClassifierConfig {
            model_path: None,
            model_url: None,
            class_map_url: String::new(),
            class_map_path: PathBuf::from("unused.csv"),
        };
        assert!(matches!(
            resolve_model(&cfg),
            Err(ClassifyError::ModelNotLoaded)
        ));
    }

    #[test]
    fn resolve_model_prefers_existing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.onnx");
        std::fs::write(&model, b"stub").unwrap();
        let cfg = ClassifierConfig {
            model_path: Some(model.clone()),
            model_url: Some("http://example.invalid/model.onnx".to_string()),
            class_map_url: String::new(),
            class_map_path: PathBuf::from("unused.csv"),
        };
        assert_eq!(resolve_model(&cfg).unwrap(), model);
    }
}
