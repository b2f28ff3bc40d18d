use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Result;

#[derive(Clone, Debug)]
pub struct Config {
    pub http_addr: String,
    pub upload_dir: PathBuf,
    /// Externally reachable base URL, used when building evidence links for
    /// outbound SOS messages.
    pub public_base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let http_addr =
            std::env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let upload_dir = PathBuf::from(
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "static/uploads".to_string()),
        );
        let public_base_url = env_non_empty("PUBLIC_BASE_URL");

        Ok(Self {
            http_addr,
            upload_dir,
            public_base_url,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Timeouts {
    pub ai_http: Duration,
    pub notify_http: Duration,
    pub fetch_http: Duration,
}

impl Timeouts {
    fn from_env() -> Self {
        // Defaults: AI calls 20s, messaging 5s, startup fetches 30s.
        // Env: AI_HTTP_TIMEOUT_MS / NOTIFY_HTTP_TIMEOUT_MS / FETCH_HTTP_TIMEOUT_MS.
        Self {
            ai_http: env_duration_ms("AI_HTTP_TIMEOUT_MS", 20_000),
            notify_http: env_duration_ms("NOTIFY_HTTP_TIMEOUT_MS", 5_000),
            fetch_http: env_duration_ms("FETCH_HTTP_TIMEOUT_MS", 30_000),
        }
    }
}

static TIMEOUTS: OnceLock<Timeouts> = OnceLock::new();

pub fn timeouts() -> &'static Timeouts {
    TIMEOUTS.get_or_init(Timeouts::from_env)
}

#[derive(Clone, Debug)]
pub struct AiConfig {
    pub transcriber_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
}

impl AiConfig {
    fn from_env() -> Self {
        Self {
            transcriber_url: env_non_empty("TRANSCRIBER_URL"),
            gemini_api_key: env_non_empty("GEMINI_API_KEY"),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            ollama_url: std::env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434/api/chat".to_string()),
            ollama_model: std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "gemma3:4b".to_string()),
        }
    }
}

static AI_CONFIG: OnceLock<AiConfig> = OnceLock::new();

pub fn ai_config() -> &'static AiConfig {
    AI_CONFIG.get_or_init(AiConfig::from_env)
}

#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    pub model_path: Option<PathBuf>,
    pub model_url: Option<String>,
    pub class_map_url: String,
    pub class_map_path: PathBuf,
}

const DEFAULT_CLASS_MAP_URL: &str =
    "https://raw.githubusercontent.com/tensorflow/models/master/research/audioset/yamnet/yamnet_class_map.csv";

impl ClassifierConfig {
    fn from_env() -> Self {
        Self {
            model_path: env_non_empty("CLASSIFIER_MODEL_PATH").map(PathBuf::from),
            model_url: env_non_empty("CLASSIFIER_MODEL_URL"),
            class_map_url: std::env::var("CLASS_MAP_URL")
                .unwrap_or_else(|_| DEFAULT_CLASS_MAP_URL.to_string()),
            class_map_path: PathBuf::from(
                std::env::var("CLASS_MAP_PATH")
                    .unwrap_or_else(|_| "yamnet_class_map.csv".to_string()),
            ),
        }
    }
}

static CLASSIFIER_CONFIG: OnceLock<ClassifierConfig> = OnceLock::new();

pub fn classifier_config() -> &'static ClassifierConfig {
    CLASSIFIER_CONFIG.get_or_init(ClassifierConfig::from_env)
}

#[derive(Clone, Debug)]
pub struct MessagingConfig {
    pub enabled: bool,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_addr: Option<String>,
    pub to_addr: Option<String>,
    pub body: String,
}

const DEFAULT_SOS_BODY: &str = "SOS Alert! Immediate help needed!";

impl MessagingConfig {
    fn from_env() -> Self {
        let account_sid = env_non_empty("MESSAGING_ACCOUNT_SID");
        let auth_token = env_non_empty("MESSAGING_AUTH_TOKEN");
        let creds_present = account_sid.is_some() && auth_token.is_some();
        Self {
            enabled: env_bool("MESSAGING_ENABLED", creds_present),
            account_sid,
            auth_token,
            from_addr: env_non_empty("MESSAGING_FROM"),
            to_addr: env_non_empty("MESSAGING_TO"),
            body: std::env::var("SOS_MESSAGE_BODY")
                .unwrap_or_else(|_| DEFAULT_SOS_BODY.to_string()),
        }
    }
}

static MESSAGING_CONFIG: OnceLock<MessagingConfig> = OnceLock::new();

pub fn messaging_config() -> &'static MessagingConfig {
    MESSAGING_CONFIG.get_or_init(MessagingConfig::from_env)
}

#[derive(Clone, Debug)]
pub struct DangerConfig {
    pub sounds: Vec<String>,
    pub keywords: Vec<String>,
}

const DEFAULT_DANGER_SOUNDS: &[&str] = &[
    "Scream",
    "Gunshot",
    "Explosion",
    "Shout",
    "Crying",
    "Fireworks",
];

const DEFAULT_DANGER_KEYWORDS: &[&str] =
    &["help", "save me", "leave me", "don't touch", "stay away"];

impl DangerConfig {
    fn from_env() -> Self {
        let sounds = env_list("DANGER_SOUNDS")
            .unwrap_or_else(|| DEFAULT_DANGER_SOUNDS.iter().map(|s| s.to_string()).collect());
        // Keywords are matched against a lowercased transcript; store them
        // lowercase so a configured "Stay away" still matches.
        let keywords = env_list("DANGER_KEYWORDS")
            .unwrap_or_else(|| {
                DEFAULT_DANGER_KEYWORDS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            })
            .into_iter()
            .map(|k| k.to_lowercase())
            .collect();
        Self { sounds, keywords }
    }
}

static DANGER_CONFIG: OnceLock<DangerConfig> = OnceLock::new();

pub fn danger_config() -> &'static DangerConfig {
    DANGER_CONFIG.get_or_init(DangerConfig::from_env)
}

#[derive(Clone, Debug)]
pub enum LogMode {
    Stdout,
    File,
}

#[derive(Clone, Debug)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub mode: LogMode,
    pub format: LogFormat,
    pub dir: Option<String>,
    pub file_name: String,
}

impl LoggingConfig {
    fn from_env() -> Self {
        let dir_env = std::env::var("LOG_DIR").ok();
        let mode_env = std::env::var("LOG_MODE").ok();
        let format_env = std::env::var("LOG_FORMAT").ok();

        let format = match format_env.as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let mode = match mode_env.as_deref() {
            Some("file") => LogMode::File,
            Some("stdout") => LogMode::Stdout,
            _ => {
                if dir_env.is_some() {
                    LogMode::File
                } else {
                    LogMode::Stdout
                }
            }
        };

        let dir = match mode {
            LogMode::File => Some(dir_env.unwrap_or_else(|| "logs".to_string())),
            LogMode::Stdout => None,
        };

        let file_name = std::env::var("LOG_FILE_NAME").unwrap_or_else(|_| "app.log".to_string());

        Self {
            mode,
            format,
            dir,
            file_name,
        }
    }
}

static LOGGING: OnceLock<LoggingConfig> = OnceLock::new();

pub fn logging_config() -> &'static LoggingConfig {
    LOGGING.get_or_init(LoggingConfig::from_env)
}

fn env_duration_ms(key: &str, default_ms: u64) -> Duration {
    let ms = std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => {
            let lower = v.trim().to_ascii_lowercase();
            matches!(lower.as_str(), "1" | "true" | "yes")
        }
        Err(_) => default,
    }
}

fn env_list(key: &str) -> Option<Vec<String>> {
    let raw = env_non_empty(key)?;
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
