use std::sync::Arc;

use tokio::net::TcpListener;

use audio_sentinel_backend::interface::http::{self, AppState};
use audio_sentinel_backend::interface::notification::{MessagingAdapter, NoopNotification};
use audio_sentinel_backend::service::ai::{self, class_map, classifier};
use audio_sentinel_backend::service::detection::{DangerLexicon, Detector};
use audio_sentinel_backend::shared::ports::ai::{ClassifierPort, LlmPort, TranscriberPort};
use audio_sentinel_backend::shared::ports::notification::SosNotifier;
use audio_sentinel_backend::shared::{config, logging};

/// Starts the audio-sentinel web backend: loads the classifier model and
/// label vocabulary once, wires the external-service adapters (falling back
/// to no-op stand-ins when they are not configured), and serves HTTP until a
/// shutdown signal arrives.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    ai::llm::init_system_prompt();

    let cfg = config::Config::from_env()?;
    tokio::fs::create_dir_all(&cfg.upload_dir).await?;

    // --- process-wide model handles, loaded once ---
    let classifier_cfg = config::classifier_config();
    let labels = Arc::new(class_map::load_or_fetch(classifier_cfg).await);

    let classifier: Arc<dyn ClassifierPort> = {
        let labels = labels.clone();
        match tokio::task::spawn_blocking(move || {
            classifier::OnnxClassifier::load_from_config(config::classifier_config(), labels)
        })
        .await?
        {
            Ok(session) => {
                log::info!("[main] classifier model loaded");
                Arc::new(session)
            }
            Err(err) => {
                log::error!("[main] classifier init failed: {err}");
                Arc::new(classifier::UnavailableClassifier::new())
            }
        }
    };

    let transcriber: Arc<dyn TranscriberPort> = match config::ai_config().transcriber_url.clone() {
        Some(url) => {
            log::info!("[main] transcriber endpoint {}", url);
            Arc::new(ai::asr::HttpTranscriber::new(url))
        }
        None => {
            log::warn!("[main] TRANSCRIBER_URL not set, speech recognition disabled");
            Arc::new(ai::asr::UnavailableTranscriber::new())
        }
    };

    let llm: Arc<dyn LlmPort> = Arc::new(ai::llm::DefaultLlmPort::new());

    let notifier: Arc<dyn SosNotifier> = {
        let messaging = config::messaging_config();
        if messaging.enabled {
            match MessagingAdapter::from_config(messaging) {
                Ok(adapter) => Arc::new(adapter),
                Err(err) => {
                    log::warn!("[main] messaging adapter init failed: {}", err);
                    Arc::new(NoopNotification::new())
                }
            }
        } else {
            Arc::new(NoopNotification::new())
        }
    };

    let detector = Detector::new(classifier, transcriber, DangerLexicon::from_config());
    let state = Arc::new(AppState {
        detector,
        llm,
        notifier,
        upload_dir: cfg.upload_dir.clone(),
        public_base_url: cfg.public_base_url.clone(),
    });

    let listener = TcpListener::bind(&cfg.http_addr).await?;
    log::info!("[main] listening on http://{}", listener.local_addr()?);
    let server = http::spawn_server_with_listener(listener, state).await;

    tokio::signal::ctrl_c().await?;
    log::info!("[main] shutdown signal received");
    server.abort();

    Ok(())
}
