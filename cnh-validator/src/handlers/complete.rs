use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
};

use crate::{pages, AppState};

/// Landing point of the liveness redirect. Always answers with a page, also
/// on failure.
pub async fn complete_validation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.orchestrator.complete(&session_id).await {
        Ok(completed) => Html(pages::success_page(completed.display_name.as_deref())).into_response(),
        Err(err) => {
            tracing::info!(session_id = %session_id, error = %err, "Validation could not be completed");
            (err.status_code(), Html(pages::error_page(&err.user_message()))).into_response()
        }
    }
}
