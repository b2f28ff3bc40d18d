use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification failed: {0}")]
    Failed(String),
}

pub type NotificationFuture =
    Pin<Box<dyn Future<Output = Result<String, NotificationError>> + Send>>;

/// Outbound SOS message. Resolves to the provider's message id on success.
pub trait SosNotifier: Send + Sync {
    fn send_sos(&self, evidence_url: Option<String>) -> NotificationFuture;
}
