use serde::Serialize;

// POST /validation/cnh/
#[derive(Debug, Serialize)]
pub struct BeginResponse {
    pub liveness_url: String,
}

// Health check
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
