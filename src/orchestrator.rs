use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::analytics::{AnalyticsRecorder, CallEvent};
use crate::catalog::{ArcCatalog, CallDuration};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::personalization;
use crate::tavus::{ConversationProperties, CreateConversationRequest, TavusClient};

#[derive(Debug, Deserialize)]
pub struct StartCallRequest {
    pub child_name: String,
    pub child_age: u8,
    pub call_duration: String,
    #[serde(default)]
    pub parent_email: Option<String>,
}

/// A start-call request that has passed the validation boundary. Only this
/// type reaches the provider path.
#[derive(Debug)]
pub struct ValidatedCall {
    pub child_name: String,
    pub child_age: u8,
    pub call_duration: CallDuration,
    pub parent_email: Option<String>,
}

impl StartCallRequest {
    pub fn validate(self) -> Result<ValidatedCall, ApiError> {
        let child_name = self.child_name.trim().to_string();
        if child_name.is_empty() || child_name.chars().count() > 50 {
            return Err(ApiError::Validation(
                "child_name must be 1-50 characters".to_string(),
            ));
        }
        if !(2..=12).contains(&self.child_age) {
            return Err(ApiError::Validation(
                "child_age must be between 2 and 12".to_string(),
            ));
        }
        let call_duration = self
            .call_duration
            .parse::<CallDuration>()
            .map_err(ApiError::Validation)?;

        Ok(ValidatedCall {
            child_name,
            child_age: self.child_age,
            call_duration,
            parent_email: self.parent_email,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StartCallResponse {
    pub conversation_id: String,
    pub conversation_url: String,
    pub expires_at: String,
    pub call_metadata: CallMetadata,
    pub estimated_end_time: String,
}

#[derive(Debug, Serialize)]
pub struct CallMetadata {
    pub child_name: String,
    pub child_age: u8,
    pub call_duration: CallDuration,
    pub greeting: String,
    pub arc_name: String,
    pub phases: usize,
}

#[derive(Debug, Deserialize)]
pub struct CompleteCallRequest {
    pub conversation_id: String,
    pub actual_duration_seconds: u32,
    #[serde(default)]
    pub parent_rating: Option<u8>,
    #[serde(default)]
    pub parent_feedback: Option<String>,
    #[serde(default)]
    pub child_enjoyed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CompleteCallResponse {
    pub status: String,
    pub message: String,
    pub conversation_id: String,
}

/// Drives one call from validated request to provider conversation:
/// personalize, create the conversation, report analytics on the side.
pub struct CallOrchestrator {
    config: AppConfig,
    catalog: Arc<ArcCatalog>,
    tavus: TavusClient,
    recorder: AnalyticsRecorder,
}

impl CallOrchestrator {
    pub fn new(
        config: AppConfig,
        catalog: Arc<ArcCatalog>,
        tavus: TavusClient,
        recorder: AnalyticsRecorder,
    ) -> Self {
        Self {
            config,
            catalog,
            tavus,
            recorder,
        }
    }

    pub async fn start_call(&self, call: ValidatedCall) -> Result<StartCallResponse, ApiError> {
        // Credentials are checked before any provider traffic
        let (api_key, persona_id) = self.config.credentials().ok_or_else(|| {
            ApiError::Configuration(
                "Tavus API credentials not configured. Please set TAVUS_API_KEY and \
                 TAVUS_PERSONA_ID environment variables."
                    .to_string(),
            )
        })?;

        let greeting = personalization::render_greeting(
            &self.catalog,
            &call.child_name,
            call.child_age,
            &mut thread_rng(),
        )?;
        let rendered = personalization::build_arc(&self.catalog, call.call_duration, call.child_age)?;
        let system_prompt = personalization::render_system_prompt(
            &call.child_name,
            call.child_age,
            call.call_duration,
            &greeting,
            &rendered,
        );

        let max_duration = call.call_duration.max_duration_seconds();

        let request = CreateConversationRequest {
            persona_id: persona_id.to_string(),
            conversation_name: format!("Santa call with {}", call.child_name),
            conversational_context: system_prompt,
            properties: ConversationProperties {
                max_call_duration: max_duration,
                enable_recording: false,
                participant_left_timeout: 60,
            },
            custom_metadata: json!({
                "child_name": call.child_name,
                "child_age": call.child_age,
                "call_duration": call.call_duration,
                "parent_email": call.parent_email,
            }),
        };

        let conversation = self.tavus.create_conversation(api_key, &request).await?;

        let estimated_end_time =
            (Utc::now() + Duration::seconds(i64::from(max_duration))).to_rfc3339();
        let expires_at = conversation
            .expires_at
            .clone()
            .unwrap_or_else(|| estimated_end_time.clone());

        self.recorder.record(CallEvent::Started {
            conversation_id: conversation.conversation_id.clone(),
            child_age: call.child_age,
            call_duration: call.call_duration,
            parent_email: call.parent_email.clone(),
            timestamp: Utc::now(),
        });

        info!(
            "Started Santa call {} for {} ({})",
            conversation.conversation_id, call.child_name, call.call_duration
        );

        Ok(StartCallResponse {
            conversation_id: conversation.conversation_id,
            conversation_url: conversation.conversation_url,
            expires_at,
            call_metadata: CallMetadata {
                child_name: call.child_name,
                child_age: call.child_age,
                call_duration: call.call_duration,
                greeting,
                arc_name: rendered.arc.name.clone(),
                phases: rendered.arc.phases.len(),
            },
            estimated_end_time,
        })
    }

    /// Pass-through: validate the rating, queue the event, acknowledge.
    /// Analytics problems never fail this call.
    pub fn complete_call(
        &self,
        request: CompleteCallRequest,
    ) -> Result<CompleteCallResponse, ApiError> {
        if let Some(rating) = request.parent_rating {
            if !(1..=5).contains(&rating) {
                return Err(ApiError::Validation(
                    "parent_rating must be between 1 and 5".to_string(),
                ));
            }
        }

        self.recorder.record(CallEvent::Completed {
            conversation_id: request.conversation_id.clone(),
            actual_duration_seconds: request.actual_duration_seconds,
            parent_rating: request.parent_rating,
            parent_feedback: request.parent_feedback,
            child_enjoyed: request.child_enjoyed,
            timestamp: Utc::now(),
        });

        debug!(
            "Recorded completion for conversation {}",
            request.conversation_id
        );

        Ok(CompleteCallResponse {
            status: "success".to_string(),
            message: "Call completion recorded".to_string(),
            conversation_id: request.conversation_id,
        })
    }
}
