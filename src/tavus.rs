use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

pub const DEFAULT_BASE_URL: &str = "https://tavusapi.com/v2";

// Conversation creation is slow on the provider side; the liveness probe
// must stay fast so health checks don't hang.
const CREATE_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum TavusError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Connection(String),

    #[error("Tavus returned {status}: {detail}")]
    Rejected { status: u16, detail: String },
}

#[derive(Debug, Serialize)]
pub struct CreateConversationRequest {
    pub persona_id: String,
    pub conversation_name: String,
    pub conversational_context: String,
    pub properties: ConversationProperties,
    pub custom_metadata: Value,
}

#[derive(Debug, Serialize)]
pub struct ConversationProperties {
    pub max_call_duration: u32,
    pub enable_recording: bool,
    pub participant_left_timeout: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    pub conversation_url: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Thin client for the Tavus conversational-video API. One request per call,
/// no internal retries; callers decide what a failure means.
#[derive(Clone)]
pub struct TavusClient {
    http: reqwest::Client,
    base_url: String,
}

impl TavusClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn create_conversation(
        &self,
        api_key: &str,
        request: &CreateConversationRequest,
    ) -> Result<Conversation, TavusError> {
        debug!(
            "Creating Tavus conversation '{}'",
            request.conversation_name
        );

        let response = self
            .http
            .post(format!("{}/conversations", self.base_url))
            .header("x-api-key", api_key)
            .json(request)
            .timeout(CREATE_TIMEOUT)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let detail = response.text().await.unwrap_or_default();
            error!("Tavus rejected conversation request ({}): {}", status, detail);
            return Err(TavusError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let conversation: Conversation = response.json().await.map_err(map_transport_error)?;
        info!(
            "Created Tavus conversation {}",
            conversation.conversation_id
        );
        Ok(conversation)
    }

    /// Liveness probe against the personas listing. 401 still means the API
    /// is up (auth issue, not availability), so it counts as reachable.
    pub async fn probe_reachable(&self, api_key: &str) -> bool {
        let result = self
            .http
            .get(format!("{}/personas", self.base_url))
            .header("x-api-key", api_key)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => matches!(response.status().as_u16(), 200 | 401),
            Err(_) => false,
        }
    }
}

fn map_transport_error(err: reqwest::Error) -> TavusError {
    if err.is_timeout() {
        TavusError::Timeout
    } else {
        TavusError::Connection(err.to_string())
    }
}
