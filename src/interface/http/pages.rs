use crate::shared::entities::AnalysisReport;

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; background: linear-gradient(135deg, #ece9e6, #ffffff);
           display: flex; justify-content: center; align-items: center; min-height: 100vh; margin: 0; }
    .container { background: #fff; padding: 30px; border-radius: 15px;
                 box-shadow: 0 8px 20px rgba(0,0,0,0.15); text-align: center; width: 480px; }
    h2 { margin-bottom: 15px; color: #333; }
    form { margin: 20px 0; }
    input[type=submit], button, a.button { background: #4CAF50; color: white; border: none;
           padding: 10px 20px; border-radius: 8px; cursor: pointer; font-size: 14px;
           text-decoration: none; display: inline-block; }
    ul { list-style: none; padding: 0; }
    li { background: #f4f4f4; margin: 5px 0; padding: 8px; border-radius: 6px; text-align: left; }
    .alert { color: red; font-weight: bold; font-size: 18px; }
    .safe { color: green; font-weight: bold; font-size: 18px; }
    nav a { margin: 0 8px; }
"#;

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <div class=\"container\">\n{body}\n</div>\n</body>\n</html>\n"
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn index_page() -> String {
    page(
        "Audio Sentinel",
        "<h2>Audio Sentinel</h2>\
         <p>Detects risky sounds and emergency phrases in uploaded audio.</p>\
         <nav>\
         <a href=\"/detect\">Detect</a>\
         <a href=\"/chatbot\">Support chat</a>\
         <a href=\"/sos\">SOS</a>\
         <a href=\"/crisis-resources\">Crisis resources</a>\
         </nav>",
    )
}

pub fn detect_page(report: Option<&AnalysisReport>) -> String {
    let mut body = String::from(
        "<h2>Smart Audio Detection</h2>\
         <p>Upload a recording to scan it for danger signals.</p>\
         <form method=\"post\" enctype=\"multipart/form-data\" action=\"/detect\">\
         <input type=\"file\" name=\"file\" accept=\"audio/*\" required>\
         <br><br>\
         <input type=\"submit\" value=\"Upload &amp; Analyze\">\
         </form>",
    );

    if let Some(report) = report {
        body.push_str("<h3>Top Detected Sounds:</h3><ul>");
        if let Some(note) = report.classification.degraded.as_deref() {
            body.push_str(&format!(
                "<li>Audio Analysis ({})</li>",
                escape_html(note)
            ));
        } else {
            for row in &report.classification.rows {
                body.push_str(&format!(
                    "<li>{} ({:.2}%)</li>",
                    escape_html(&row.label),
                    row.confidence
                ));
            }
        }
        body.push_str("</ul>");

        body.push_str(&format!(
            "<h3>Speech Detected:</h3><p><b>{}</b></p>",
            escape_html(&report.transcript)
        ));

        if report.alert {
            body.push_str("<p class=\"alert\">ALERT! Emergency detected!</p>");
        } else {
            body.push_str("<p class=\"safe\">Environment Safe</p>");
        }
    }

    page("Smart Audio Detection", &body)
}

pub fn sos_page(filename: Option<&str>) -> String {
    let mut body = String::from(
        "<h2>Emergency Alert</h2>\
         <p class=\"alert\">A dangerous situation was detected.</p>",
    );
    match filename {
        Some(name) => {
            let safe = escape_html(name);
            body.push_str(&format!(
                "<p>Evidence: <a href=\"/uploads/{safe}\">{safe}</a></p>\
                 <audio controls src=\"/uploads/{safe}\"></audio><br><br>\
                 <a class=\"button\" href=\"/send_sos/{safe}\">Send SOS message</a>"
            ));
        }
        None => {
            body.push_str("<p>No evidence recording attached.</p>");
        }
    }
    page("SOS", &body)
}

pub fn sos_sent_page(sid: &str) -> String {
    page(
        "SOS Sent",
        &format!("<h2>SOS Sent! SID: {}</h2>", escape_html(sid)),
    )
}

pub fn chatbot_page() -> String {
    let body = r#"<h2>Support Chat</h2>
<p>Talk to the safety and emotional support assistant.</p>
<div id="log" style="text-align:left; max-height:260px; overflow-y:auto;"></div>
<form id="chat-form">
  <input type="text" id="message" placeholder="Type a message" style="width:70%">
  <button type="submit">Send</button>
</form>
<script>
const form = document.getElementById('chat-form');
const log = document.getElementById('log');
form.addEventListener('submit', async (ev) => {
  ev.preventDefault();
  const input = document.getElementById('message');
  const message = input.value.trim();
  if (!message) return;
  log.innerHTML += '<p><b>You:</b> ' + message + '</p>';
  input.value = '';
  const res = await fetch('/chat', {
    method: 'POST',
    headers: {'Content-Type': 'application/json'},
    body: JSON.stringify({message})
  });
  const data = await res.json();
  log.innerHTML += '<p><b>Assistant:</b> ' + (data.response || data.error) + '</p>';
  log.scrollTop = log.scrollHeight;
});
</script>"#;
    page("Support Chat", body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::entities::{ClassificationResult, LabelScore};

    #[test]
    fn detect_page_renders_rows_and_verdict() {
        let report = AnalysisReport {
            classification: ClassificationResult::new(vec![LabelScore {
                label: "Speech".to_string(),
                confidence: 87.5,
            }]),
            transcript: "nice weather today".to_string(),
            alert: false,
        };
        let html = detect_page(Some(&report));
        assert!(html.contains("Speech (87.50%)"));
        assert!(html.contains("nice weather today"));
        assert!(html.contains("Environment Safe"));
    }

    #[test]
    fn detect_page_renders_degraded_note() {
        let report = AnalysisReport {
            classification: ClassificationResult::degraded("Model unavailable"),
            transcript: "Speech recognition unavailable".to_string(),
            alert: false,
        };
        let html = detect_page(Some(&report));
        assert!(html.contains("Audio Analysis (Model unavailable)"));
    }

    #[test]
    fn escape_html_neutralizes_markup() {
        assert_eq!(
            escape_html("<script>\"&'"),
            "&lt;script&gt;&quot;&amp;&#39;"
        );
    }

    #[test]
    fn sos_page_links_evidence() {
        let html = sos_page(Some("abc_clip.wav"));
        assert!(html.contains("/uploads/abc_clip.wav"));
        assert!(html.contains("/send_sos/abc_clip.wav"));
    }
}
