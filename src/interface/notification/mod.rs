use reqwest::Client;
use serde::Deserialize;

use crate::shared::config::{self, MessagingConfig};
use crate::shared::ports::notification::{NotificationError, NotificationFuture, SosNotifier};

/// No-op sink used when messaging credentials are absent. Logs and reports a
/// synthetic id so the confirmation page still renders.
#[derive(Clone, Debug, Default)]
pub struct NoopNotification;

impl NoopNotification {
    pub fn new() -> Self {
        Self
    }
}

impl SosNotifier for NoopNotification {
    fn send_sos(&self, evidence_url: Option<String>) -> NotificationFuture {
        Box::pin(async move {
            log::warn!(
                "[notify] messaging disabled, SOS not sent (evidence={})",
                evidence_url.as_deref().unwrap_or("-")
            );
            Ok("disabled".to_string())
        })
    }
}

#[derive(Deserialize)]
struct MessageCreated {
    sid: String,
}

/// Twilio-style messaging adapter: form-encoded POST against the Messages
/// endpoint with basic auth, WhatsApp-prefixed addresses.
pub struct MessagingAdapter {
    client: Client,
    account_sid: String,
    auth_token: String,
    from_addr: String,
    to_addr: String,
    body: String,
}

impl MessagingAdapter {
    pub fn from_config(cfg: &MessagingConfig) -> Result<Self, NotificationError> {
        let account_sid = cfg
            .account_sid
            .clone()
            .ok_or_else(|| NotificationError::Failed("MESSAGING_ACCOUNT_SID missing".to_string()))?;
        let auth_token = cfg
            .auth_token
            .clone()
            .ok_or_else(|| NotificationError::Failed("MESSAGING_AUTH_TOKEN missing".to_string()))?;
        let from_addr = cfg
            .from_addr
            .clone()
            .ok_or_else(|| NotificationError::Failed("MESSAGING_FROM missing".to_string()))?;
        let to_addr = cfg
            .to_addr
            .clone()
            .ok_or_else(|| NotificationError::Failed("MESSAGING_TO missing".to_string()))?;
        let client = Client::builder()
            .timeout(config::timeouts().notify_http)
            .build()
            .map_err(|e| NotificationError::Failed(e.to_string()))?;
        Ok(Self {
            client,
            account_sid,
            auth_token,
            from_addr,
            to_addr,
            body: cfg.body.clone(),
        })
    }

    fn message_body(&self, evidence_url: Option<&str>) -> String {
        match evidence_url {
            Some(url) => format!("{} Evidence: {}", self.body, url),
            None => self.body.clone(),
        }
    }
}

impl SosNotifier for MessagingAdapter {
    fn send_sos(&self, evidence_url: Option<String>) -> NotificationFuture {
        let client = self.client.clone();
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );
        let account_sid = self.account_sid.clone();
        let auth_token = self.auth_token.clone();
        let from_addr = self.from_addr.clone();
        let to_addr = self.to_addr.clone();
        let body = self.message_body(evidence_url.as_deref());

        Box::pin(async move {
            let resp = client
                .post(&url)
                .basic_auth(&account_sid, Some(&auth_token))
                .form(&[
                    ("From", from_addr.as_str()),
                    ("To", to_addr.as_str()),
                    ("Body", body.as_str()),
                ])
                .send()
                .await
                .map_err(|e| NotificationError::Failed(e.to_string()))?;

            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(NotificationError::Failed(format!(
                    "message push failed {}: {}",
                    status, body
                )));
            }

            let created: MessageCreated = serde_json::from_str(&body)
                .map_err(|e| NotificationError::Failed(format!("response parse: {e}")))?;
            log::info!("[notify] SOS sent sid={}", created.sid);
            Ok(created.sid)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> MessagingAdapter {
        MessagingAdapter {
            client: Client::new(),
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_addr: "whatsapp:+14155238886".to_string(),
            to_addr: "whatsapp:+10000000000".to_string(),
            body: "SOS Alert!".to_string(),
        }
    }

    #[test]
    fn message_body_appends_evidence_link() {
        let adapter = adapter();
        assert_eq!(adapter.message_body(None), "SOS Alert!");
        assert_eq!(
            adapter.message_body(Some("http://host/uploads/a.wav")),
            "SOS Alert! Evidence: http://host/uploads/a.wav"
        );
    }

    #[test]
    fn from_config_requires_credentials() {
        let cfg = MessagingConfig {
            enabled: true,
            account_sid: None,
            auth_token: None,
            from_addr: None,
            to_addr: None,
            body: "x".to_string(),
        };
        assert!(MessagingAdapter::from_config(&cfg).is_err());
    }

    #[tokio::test]
    async fn noop_notification_reports_disabled_id() {
        let sid = NoopNotification::new().send_sos(None).await.unwrap();
        assert_eq!(sid, "disabled");
    }
}
