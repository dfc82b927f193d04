use axum::{
    extract::{Multipart, State},
    http::{header::HOST, HeaderMap},
    Json,
};

use crate::{
    error::ServerError,
    models::BeginResponse,
    services::BeginValidation,
    AppState,
};

const DOCUMENT_FIELD: &str = "cnh_front";
const QRCODE_FIELD: &str = "cnh_qrcode";

pub async fn begin_validation(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<BeginResponse>, ServerError> {
    let mut document_image: Option<Vec<u8>> = None;
    let mut qrcode_image: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await? {
        let slot = match field.name().unwrap_or("") {
            DOCUMENT_FIELD => &mut document_image,
            QRCODE_FIELD => &mut qrcode_image,
            // Ignore unknown fields
            _ => continue,
        };

        *slot = Some(field.bytes().await?.to_vec());
    }

    let document_image = require_image(document_image, DOCUMENT_FIELD)?;
    let qrcode_image = require_image(qrcode_image, QRCODE_FIELD)?;
    let callback_base = callback_base(state.public_url.as_deref(), &headers)?;

    tracing::debug!(
        document_bytes = document_image.len(),
        qrcode_bytes = qrcode_image.len(),
        "Received validation upload"
    );

    let liveness_url = state
        .orchestrator
        .begin(BeginValidation {
            document_image,
            qrcode_image,
            callback_base,
        })
        .await?;

    Ok(Json(BeginResponse { liveness_url }))
}

fn require_image(image: Option<Vec<u8>>, field: &str) -> Result<Vec<u8>, ServerError> {
    match image {
        Some(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(ServerError::BadRequest(format!(
            "Missing or empty '{}' upload",
            field
        ))),
    }
}

/// Base URL the liveness provider redirects back to.
///
/// Without a configured public URL this is rebuilt from the request as
/// `scheme:host[:port]`. The `//` is left out on purpose: the liveness
/// provider mangles redirect URLs that contain it.
fn callback_base(public_url: Option<&str>, headers: &HeaderMap) -> Result<String, ServerError> {
    if let Some(public_url) = public_url {
        return Ok(public_url.to_string());
    }

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| is_valid_host(h))
        .ok_or_else(|| ServerError::BadRequest("Missing or invalid Host header".to_string()))?;

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| *s == "http" || *s == "https")
        .unwrap_or("http");

    Ok(format!("{}:{}", scheme, host))
}

fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}
