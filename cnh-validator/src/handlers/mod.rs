mod begin;
mod complete;

pub use begin::begin_validation;
pub use complete::complete_validation;

use crate::{models::HealthResponse, pages};
use axum::{response::Html, Json};

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn index_page() -> Html<String> {
    Html(pages::index_page())
}

pub async fn upload_page() -> Html<String> {
    Html(pages::upload_page())
}
