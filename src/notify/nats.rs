use async_trait::async_trait;

use super::{Notifier, NotifyError, OutgoingMail};

/// Hands mail to the mail worker over NATS.
#[derive(Clone, Debug)]
pub struct NatsNotifier {
    client: async_nats::Client,
    subject: String,
}

impl NatsNotifier {
    pub const DEFAULT_SUBJECT: &'static str = "mail.order-confirmation";

    pub fn new(client: async_nats::Client, subject: impl Into<String>) -> Self {
        Self { client, subject: subject.into() }
    }

    pub async fn connect(url: &str, subject: impl Into<String>) -> Result<Self, NotifyError> {
        let client = async_nats::connect(url).await.map_err(|e| NotifyError::Transport(e.to_string()))?;
        tracing::info!(url, "connected to NATS");
        Ok(Self::new(client, subject))
    }
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), NotifyError> {
        let payload = serde_json::to_vec(mail)?;
        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        self.client.flush().await.map_err(|e| NotifyError::Transport(e.to_string()))?;
        tracing::debug!(subject = %self.subject, message_id = %mail.message_id, "published mail");
        Ok(())
    }
}
