use base64::Engine;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{StepOneRequest, StepTwoRequest};
use crate::services::{SessionStore, WorkflowClient};

/// Path under which the workflow redirects the user back after liveness.
pub const CALLBACK_PATH: &str = "/validation/cnh/";

/// Input of the first validation step.
pub struct BeginValidation {
    pub document_image: Vec<u8>,
    pub qrcode_image: Vec<u8>,
    /// Scheme and authority the callback URL is built on.
    pub callback_base: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedValidation {
    pub display_name: Option<String>,
}

/// Drives the two-step document validation around the session store.
pub struct Orchestrator {
    session_store: Arc<SessionStore>,
    workflow_client: Arc<WorkflowClient>,
}

impl Orchestrator {
    pub fn new(session_store: Arc<SessionStore>, workflow_client: Arc<WorkflowClient>) -> Self {
        Self {
            session_store,
            workflow_client,
        }
    }

    /// Start a validation and return the liveness URL to redirect the user to.
    ///
    /// The session identifier is chosen up front because it travels inside
    /// the callback URL; the record itself is only written once the workflow
    /// has accepted the documents.
    pub async fn begin(&self, input: BeginValidation) -> Result<String, ValidationError> {
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("begin_validation", session_id = %session_id);

        self.begin_session(session_id, input).instrument(span).await
    }

    async fn begin_session(
        &self,
        session_id: Uuid,
        input: BeginValidation,
    ) -> Result<String, ValidationError> {
        let engine = base64::prelude::BASE64_STANDARD;
        let request = StepOneRequest {
            document_image: engine.encode(&input.document_image),
            qrcode_image: engine.encode(&input.qrcode_image),
            callback_url: callback_url(&input.callback_base, &session_id),
        };

        let reply = self.workflow_client.start_validation(&request).await?;

        let record = self
            .session_store
            .new_record(reply.user_data, reply.liveness_pid);
        self.session_store
            .create_with_id(session_id, &record)
            .await?;

        tracing::info!("Validation started, awaiting liveness check");

        Ok(reply.liveness_url)
    }

    /// Finish the validation identified by `session_id`.
    pub async fn complete(&self, session_id: &str) -> Result<CompletedValidation, ValidationError> {
        let span = tracing::info_span!("complete_validation", session_id = %session_id);

        self.complete_session(session_id).instrument(span).await
    }

    async fn complete_session(
        &self,
        session_id: &str,
    ) -> Result<CompletedValidation, ValidationError> {
        if let Err(e) = self.session_store.sweep_expired().await {
            tracing::warn!("Session sweep failed: {}", e);
        }

        let record = self
            .session_store
            .fetch_and_consume(session_id)
            .await?
            .ok_or(ValidationError::SessionNotFound)?;

        let display_name = record.display_name().map(str::to_string);

        let request = StepTwoRequest {
            user_data: record.user_data,
            liveness_pid: record.liveness_pid,
        };
        self.workflow_client.finish_validation(&request).await?;

        tracing::info!("Validation completed");

        Ok(CompletedValidation { display_name })
    }
}

/// `base` is used as given, so a base without `//` after the scheme keeps
/// that form in the callback.
pub fn callback_url(base: &str, session_id: &Uuid) -> String {
    format!(
        "{}{}{}",
        base.trim_end_matches('/'),
        CALLBACK_PATH,
        session_id
    )
}
