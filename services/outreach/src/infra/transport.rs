use serde::Deserialize;
use serde_json::json;

use crate::domain::repository::DeliveryTransport;
use crate::domain::types::{OutboundMessage, TransportError};

/// JSON POST client for the delivery provider. The provider's wire format is
/// out of scope here; the envelope is the minimal `{to, subject, content}`
/// shape plus the schedule id for provider-side correlation.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: String,
}

impl DeliveryTransport for HttpTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<String, TransportError> {
        let mut request = self.client.post(&self.url).json(&json!({
            "to": message.to,
            "subject": message.subject,
            "content": message.content,
            "reference": message.schedule_id,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError(format!("transport request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError(format!("transport returned {status}: {body}")));
        }

        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|e| TransportError(format!("transport response unreadable: {e}")))?;
        Ok(parsed.id)
    }
}
