use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use log::info;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::service::detection::Detector;
use crate::shared::ports::ai::LlmPort;
use crate::shared::ports::notification::SosNotifier;

pub mod multipart;
pub mod pages;

const MAX_HEAD_BYTES: usize = 64 * 1024;
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Everything a request handler needs; built once in main and shared.
pub struct AppState {
    pub detector: Detector,
    pub llm: Arc<dyn LlmPort>,
    pub notifier: Arc<dyn SosNotifier>,
    pub upload_dir: PathBuf,
    pub public_base_url: Option<String>,
}

struct Request {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

struct Response {
    status: u16,
    reason: &'static str,
    content_type: String,
    location: Option<String>,
    body: Vec<u8>,
}

impl Response {
    fn html(status: u16, reason: &'static str, body: String) -> Self {
        Self {
            status,
            reason,
            content_type: "text/html; charset=utf-8".to_string(),
            location: None,
            body: body.into_bytes(),
        }
    }

    fn json(status: u16, reason: &'static str, value: serde_json::Value) -> Self {
        Self {
            status,
            reason,
            content_type: "application/json".to_string(),
            location: None,
            body: value.to_string().into_bytes(),
        }
    }

    fn text(status: u16, reason: &'static str, body: &str) -> Self {
        Self {
            status,
            reason,
            content_type: "text/plain".to_string(),
            location: None,
            body: body.as_bytes().to_vec(),
        }
    }

    fn bytes(content_type: String, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            reason: "OK",
            content_type,
            location: None,
            body,
        }
    }

    /// 303 so the browser re-requests the SOS page with GET after the upload
    /// POST.
    fn see_other(location: String) -> Self {
        Self {
            status: 303,
            reason: "See Other",
            content_type: "text/plain".to_string(),
            location: Some(location),
            body: Vec::new(),
        }
    }

    fn not_found() -> Self {
        Self::text(404, "Not Found", "Not Found")
    }
}

pub async fn spawn_server(bind: &str, state: Arc<AppState>) {
    let bind = bind.to_string();
    tokio::spawn(async move {
        match TcpListener::bind(&bind).await {
            Ok(listener) => {
                if let Err(e) = run_with_listener(listener, state).await {
                    log::error!("[http] server error: {:?}", e);
                }
            }
            Err(e) => log::error!("[http] bind {} failed: {:?}", bind, e),
        }
    });
}

pub async fn spawn_server_with_listener(
    listener: TcpListener,
    state: Arc<AppState>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run_with_listener(listener, state).await {
            log::error!("[http] server error: {:?}", e);
        }
    })
}

async fn run_with_listener(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    loop {
        let (mut socket, _) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            let _ = handle_conn(&mut socket, state).await;
        });
    }
}

async fn handle_conn(
    socket: &mut tokio::net::TcpStream,
    state: Arc<AppState>,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; 4096];
    let mut read_len = 0usize;
    let head_end = loop {
        let n = socket.read(&mut buf[read_len..]).await?;
        if n == 0 {
            return Ok(());
        }
        read_len += n;
        if let Some(pos) = buf[..read_len].windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if read_len == buf.len() {
            buf.resize(buf.len() + 4096, 0);
        }
        if read_len > MAX_HEAD_BYTES {
            return write_response(
                socket,
                Response::text(413, "Payload Too Large", "header section too large"),
            )
            .await;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let (method, path, headers) = match parse_head(&head) {
        Some(parsed) => parsed,
        None => {
            return write_response(socket, Response::text(400, "Bad Request", "bad request"))
                .await;
        }
    };

    if headers
        .get("transfer-encoding")
        .map(|v| v.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false)
    {
        return write_response(
            socket,
            Response::text(411, "Length Required", "chunked bodies not supported"),
        )
        .await;
    }

    let content_length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    if content_length > MAX_BODY_BYTES {
        return write_response(
            socket,
            Response::text(413, "Payload Too Large", "body too large"),
        )
        .await;
    }

    let body_start = head_end + 4;
    let mut body = buf[body_start..read_len].to_vec();
    while body.len() < content_length {
        let mut chunk = vec![0u8; (content_length - body.len()).min(64 * 1024)];
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    let request = Request {
        method,
        path,
        headers,
        body,
    };
    let req_method = request.method.clone();
    let req_path = request.path.clone();

    let response = route(&state, request).await;
    info!(
        "http_access status={} method={} path={}",
        response.status, req_method, req_path
    );
    write_response(socket, response).await
}

fn parse_head(head: &str) -> Option<(String, String, HashMap<String, String>)> {
    let mut lines = head.lines();
    let first_line = lines.next()?;
    let mut parts = first_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }
    Some((method, path, headers))
}

async fn route(state: &AppState, req: Request) -> Response {
    match (req.method.as_str(), req.path.as_str()) {
        ("GET", "/") => Response::html(200, "OK", pages::index_page()),
        ("GET", "/detect") => Response::html(200, "OK", pages::detect_page(None)),
        ("POST", "/detect") => handle_detect_post(state, &req).await,
        ("GET", "/sos") => Response::html(200, "OK", pages::sos_page(None)),
        ("GET", path) if path.starts_with("/sos/") => {
            match single_component(path.strip_prefix("/sos/").unwrap_or("")) {
                Some(name) => Response::html(200, "OK", pages::sos_page(Some(name))),
                None => Response::not_found(),
            }
        }
        ("GET", path) if path.starts_with("/send_sos/") => {
            handle_send_sos(state, path.strip_prefix("/send_sos/").unwrap_or("")).await
        }
        ("GET", "/chatbot") => Response::html(200, "OK", pages::chatbot_page()),
        ("POST", "/chat") => handle_chat(state, &req.body).await,
        ("GET", "/crisis-resources") => crisis_resources(),
        ("GET", path) if path.starts_with("/uploads/") => {
            serve_upload(state, path.strip_prefix("/uploads/").unwrap_or("")).await
        }
        _ => Response::not_found(),
    }
}

async fn handle_detect_post(state: &AppState, req: &Request) -> Response {
    let boundary = match req
        .headers
        .get("content-type")
        .and_then(|v| multipart::boundary_from_content_type(v))
    {
        Some(b) => b,
        None => return Response::text(400, "Bad Request", "expected multipart/form-data"),
    };

    let parts = match multipart::parse(&req.body, &boundary) {
        Ok(parts) => parts,
        Err(err) => {
            log::warn!("[detect] multipart parse failed: {err}");
            return Response::text(400, "Bad Request", "malformed upload");
        }
    };

    let file = match parts.into_iter().find(|p| p.name == "file") {
        Some(part) => part,
        None => return Response::text(400, "Bad Request", "missing file field"),
    };
    let original_name = match file.filename.as_deref() {
        Some(name) if !name.is_empty() => name,
        // No file chosen; show the bare form again.
        _ => return Response::html(200, "OK", pages::detect_page(None)),
    };

    // Keep the upload as evidence, under a collision-proof stored name.
    let id = Uuid::new_v4().simple().to_string();
    let stored_name = format!("{}_{}", &id[..8], sanitize_filename(original_name));
    let stored_path = state.upload_dir.join(&stored_name);
    if let Err(err) = tokio::fs::write(&stored_path, &file.data).await {
        log::error!("[detect] failed to store upload {stored_path:?}: {err}");
        return Response::text(500, "Internal Server Error", "failed to store upload");
    }
    log::info!(
        "[detect] stored upload name={} bytes={}",
        stored_name,
        file.data.len()
    );

    let report = state.detector.analyze(&stored_path).await;
    if report.alert {
        return Response::see_other(format!("/sos/{}", stored_name));
    }
    Response::html(200, "OK", pages::detect_page(Some(&report)))
}

async fn handle_send_sos(state: &AppState, raw_name: &str) -> Response {
    let name = match single_component(raw_name) {
        Some(name) => name,
        None => return Response::not_found(),
    };

    let evidence_url = state
        .public_base_url
        .as_deref()
        .map(|base| format!("{}/uploads/{}", base.trim_end_matches('/'), name));

    match state.notifier.send_sos(evidence_url).await {
        Ok(sid) => Response::html(200, "OK", pages::sos_sent_page(&sid)),
        Err(err) => {
            log::error!("[notify] SOS send failed: {err}");
            Response::text(502, "Bad Gateway", "SOS sending failed")
        }
    }
}

async fn handle_chat(state: &AppState, body: &[u8]) -> Response {
    let parsed: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => {
            return Response::json(
                400,
                "Bad Request",
                serde_json::json!({"error": "Invalid JSON body"}),
            )
        }
    };
    let message = parsed
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    if message.is_empty() {
        return Response::json(
            400,
            "Bad Request",
            serde_json::json!({"error": "No message provided"}),
        );
    }

    match state.llm.generate_reply(message).await {
        Ok(reply) => Response::json(200, "OK", serde_json::json!({"response": reply})),
        Err(err) => Response::json(
            500,
            "Internal Server Error",
            serde_json::json!({"error": format!("Error generating response: {err}")}),
        ),
    }
}

fn crisis_resources() -> Response {
    Response::json(
        200,
        "OK",
        serde_json::json!({
            "crisis_lines": [
                {"name": "National Suicide Prevention Lifeline", "number": "100", "country": "India"},
                {"name": "Crisis Text Line", "number": "Text HOME to 10101", "country": "India"},
                {"name": "International Association for Suicide Prevention",
                 "url": "https://www.iasp.info/resources/Crisis_Centres/", "country": "International"}
            ],
            "resources": [
                "If you're in immediate danger, call emergency services (102, 101, etc.)",
                "Consider reaching out to a trusted friend or family member",
                "Contact your local mental health services",
                "Visit your nearest emergency room if you're having thoughts of self-harm"
            ]
        }),
    )
}

async fn serve_upload(state: &AppState, raw_name: &str) -> Response {
    let name = match single_component(raw_name) {
        Some(name) => name,
        None => return Response::not_found(),
    };
    let path = state.upload_dir.join(name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Response::bytes(content_type_for(name).to_string(), bytes),
        Err(_) => Response::not_found(),
    }
}

/// Stored uploads are addressed by a single path component; anything with a
/// separator or dot-dot is rejected before it reaches the filesystem.
fn single_component(name: &str) -> Option<&str> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
    {
        return None;
    }
    Some(name)
}

fn sanitize_filename(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    // Stored names are served back by `single_component`; ".." must not
    // survive sanitization.
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", "_");
    }
    if cleaned.trim_matches(|c| c == '_' || c == '.').is_empty() {
        "upload.wav".to_string()
    } else {
        cleaned
    }
}

fn content_type_for(name: &str) -> &'static str {
    match name.rsplit('.').next().map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "wav" => "audio/wav",
        Some(ext) if ext == "mp3" => "audio/mpeg",
        Some(ext) if ext == "ogg" => "audio/ogg",
        Some(ext) if ext == "flac" => "audio/flac",
        Some(ext) if ext == "m4a" => "audio/mp4",
        _ => "application/octet-stream",
    }
}

async fn write_response(
    socket: &mut tokio::net::TcpStream,
    response: Response,
) -> std::io::Result<()> {
    let mut resp = Vec::new();
    resp.extend_from_slice(
        format!("HTTP/1.1 {} {}\r\n", response.status, response.reason).as_bytes(),
    );
    resp.extend_from_slice(format!("Content-Type: {}\r\n", response.content_type).as_bytes());
    if let Some(location) = response.location.as_deref() {
        resp.extend_from_slice(format!("Location: {location}\r\n").as_bytes());
    }
    resp.extend_from_slice(b"Access-Control-Allow-Origin: *\r\n");
    resp.extend_from_slice(format!("Content-Length: {}\r\n", response.body.len()).as_bytes());
    resp.extend_from_slice(b"Connection: close\r\n\r\n");
    resp.extend_from_slice(&response.body);
    socket.write_all(&resp).await
}
