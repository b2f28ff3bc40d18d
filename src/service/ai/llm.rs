use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::shared::config;
use crate::shared::error::LlmError;
use crate::shared::ports::ai::{AiFuture, LlmPort};

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a proactive safety and emotional support assistant.
Your mission: protect, comfort, and guide users in unsafe or stressful situations.
Respond naturally but ALWAYS keep replies between 30 and 50 words.

[SAFETY MODE]
Triggered by danger or fear words: "unsafe", "help now", "track me", "alert guardians".
Give clear, direct steps: SOS, share location, move to a safe spot. Calm but firm.

[SUPPORT MODE]
Triggered by stress or emotion words: "scared", "anxious", "lonely", "worthless".
Validate feelings and give one coping method (breathing, grounding, affirmation).

[FRIENDLY MODE]
Triggered by casual greetings or check-ins. Positive, light, short.

Rules:
- Emergency: actionable steps only.
- Emotional support: empathy plus one grounding action.
- Off-topic requests (coding, math, trivia): politely decline and restate
  that you handle emotional safety, trauma support, and mental health only.
- Never dismiss user feelings. Never go silent in emergencies."#;

const SYSTEM_PROMPT_FILE_NAME: &str = "system_prompt.local.txt";
const SYSTEM_PROMPT_EXAMPLE: &str = "system_prompt.example.txt";

static SYSTEM_PROMPT_CACHE: OnceLock<String> = OnceLock::new();

pub fn init_system_prompt() {
    let _ = system_prompt();
}

pub fn system_prompt() -> String {
    SYSTEM_PROMPT_CACHE
        .get_or_init(|| {
            read_prompt_from(SYSTEM_PROMPT_FILE_NAME)
                .or_else(|| read_prompt_from(SYSTEM_PROMPT_EXAMPLE))
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.trim().to_string())
        })
        .clone()
}

fn read_prompt_from(name: &str) -> Option<String> {
    // Working directory first, then the executable's directory.
    let paths = [
        PathBuf::from(name),
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join(name)))
            .unwrap_or_default(),
    ];
    for path in paths {
        if let Ok(text) = std::fs::read_to_string(&path) {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Single-turn prompt: persona, then the user message, then the reply cue.
fn build_prompt(user_message: &str) -> String {
    format!(
        "{}\n\nUser: {}\n\nMindCare:",
        system_prompt(),
        user_message
    )
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContentOut,
}

#[derive(Deserialize)]
struct GeminiContentOut {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Serialize, Deserialize, Clone)]
struct OllamaMessage {
    role: String,
    content: String,
}

const FALLBACK_ANSWER: &str =
    "I'm sorry, I couldn't put together an answer right now. If you are in immediate danger, contact your local emergency services.";

/// Generate a chatbot reply: Gemini first, Ollama as fallback, a fixed
/// apology when both fail.
pub async fn generate_reply(user_message: &str) -> Result<String> {
    let prompt = build_prompt(user_message);

    let answer = match call_gemini(&prompt).await {
        Ok(ans) => {
            log::info!("[llm] answer (gemini): {}", ans);
            ans
        }
        Err(gemini_err) => {
            log::error!("[llm] call_gemini failed: {gemini_err:?}, falling back to ollama");
            match call_ollama(&prompt).await {
                Ok(fallback) => {
                    log::info!("[llm] answer (ollama fallback): {}", fallback);
                    fallback
                }
                Err(ollama_err) => {
                    log::error!(
                        "[llm] call_ollama also failed: {ollama_err:?}. Using default apology message."
                    );
                    FALLBACK_ANSWER.to_string()
                }
            }
        }
    };

    Ok(answer)
}

async fn call_gemini(prompt: &str) -> Result<String> {
    let ai_cfg = config::ai_config();
    let api_key = ai_cfg
        .gemini_api_key
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY not configured"))?;

    let url = format!(
        "https://generativelanguage.googleapis.com/v1/models/{}:generateContent?key={}",
        ai_cfg.gemini_model, api_key
    );

    let req_body = GeminiRequest {
        contents: vec![GeminiContent {
            parts: vec![GeminiPart {
                text: prompt.to_string(),
            }],
        }],
    };

    let client = super::http_client(config::timeouts().ai_http)?;
    let resp = client.post(&url).json(&req_body).send().await?;
    let status = resp.status();
    let body_text = resp.text().await?;

    if !status.is_success() {
        anyhow::bail!("Gemini HTTP error {}: {}", status, body_text);
    }

    let body: GeminiResponse = serde_json::from_str(&body_text)?;
    parse_gemini_answer(&body).ok_or_else(|| anyhow::anyhow!("Gemini response had no candidates"))
}

fn parse_gemini_answer(body: &GeminiResponse) -> Option<String> {
    body.candidates
        .as_ref()
        .and_then(|cands| cands.first())
        .and_then(|cand| cand.content.parts.first())
        .map(|p| p.text.clone())
}

async fn call_ollama(prompt: &str) -> Result<String> {
    let ai_cfg = config::ai_config();
    let client = super::http_client(config::timeouts().ai_http)?;

    let req = OllamaChatRequest {
        model: ai_cfg.ollama_model.clone(),
        messages: vec![OllamaMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
        stream: false,
    };

    let resp = client.post(&ai_cfg.ollama_url).json(&req).send().await?;
    let status = resp.status();
    let body_text = resp.text().await?;

    if !status.is_success() {
        anyhow::bail!("Ollama HTTP error {}: {}", status, body_text);
    }

    #[derive(Deserialize)]
    struct ChatResponse {
        message: Option<OllamaMessage>,
    }

    let body: ChatResponse = serde_json::from_str(&body_text)?;
    body.message
        .map(|m| m.content)
        .ok_or_else(|| anyhow::anyhow!("Ollama response had no message"))
}

/// Default chat port: the Gemini/Ollama chain above.
#[derive(Clone, Debug, Default)]
pub struct DefaultLlmPort;

impl DefaultLlmPort {
    pub fn new() -> Self {
        Self
    }
}

impl LlmPort for DefaultLlmPort {
    fn generate_reply(&self, user_message: String) -> AiFuture<Result<String, LlmError>> {
        Box::pin(async move {
            generate_reply(&user_message)
                .await
                .map_err(|e| LlmError::GenerationFailed(e.to_string()))
        })
    }
}
