use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::WorkflowConfiguration;
use crate::error::{ServerError, ValidationError};
use crate::models::workflow::{
    check_step_two_reply, unwrap_reply, GENERIC_REJECTION_MESSAGE,
};
use crate::models::{StepOneReply, StepOneRequest, StepTwoRequest};

/// Client for the two endpoints of the remote validation workflow.
pub struct WorkflowClient {
    http_client: Client,
    step_one_url: Url,
    step_two_url: Url,
}

impl WorkflowClient {
    pub fn new(config: &WorkflowConfiguration) -> Result<Self, ServerError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ServerError::Configuration(format!("Invalid workflow URL: {}", e)))?;

        let step_one_url = base_url
            .join(&config.step_one_path)
            .map_err(|e| ServerError::Configuration(format!("Invalid step one path: {}", e)))?;

        let step_two_url = base_url
            .join(&config.step_two_path)
            .map_err(|e| ServerError::Configuration(format!("Invalid step two path: {}", e)))?;

        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ServerError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            step_one_url,
            step_two_url,
        })
    }

    /// Submit the document images and obtain the liveness check details.
    pub async fn start_validation(
        &self,
        request: &StepOneRequest,
    ) -> Result<StepOneReply, ValidationError> {
        let body = self.post(&self.step_one_url, request).await?;
        let reply = unwrap_reply(body)?;
        let reply = StepOneReply::from_reply(reply)?;

        tracing::debug!(liveness_pid = %reply.liveness_pid, "Step one accepted");
        Ok(reply)
    }

    /// Hand the stored session data back once the liveness check is done.
    pub async fn finish_validation(&self, request: &StepTwoRequest) -> Result<(), ValidationError> {
        let body = self.post(&self.step_two_url, request).await?;
        let reply = unwrap_reply(body)?;
        check_step_two_reply(&reply)?;

        tracing::debug!(liveness_pid = %request.liveness_pid, "Step two accepted");
        Ok(())
    }

    async fn post<T: Serialize>(&self, url: &Url, payload: &T) -> Result<Value, ValidationError> {
        let response = self
            .http_client
            .post(url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_failure(url, e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_failure(url, e))?;

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(
                url = %url,
                status = %status,
                "Workflow returned a body that is not JSON: {}",
                e
            );
            undecodable_body(status)
        })
    }
}

fn transport_failure(url: &Url, err: reqwest::Error) -> ValidationError {
    if err.is_timeout() {
        tracing::warn!(url = %url, "Workflow request timed out");
    } else {
        tracing::warn!(url = %url, "Workflow request failed: {}", err);
    }
    ValidationError::RemoteUnavailable
}

fn undecodable_body(status: StatusCode) -> ValidationError {
    if status.is_server_error() {
        ValidationError::RemoteUnavailable
    } else {
        ValidationError::RemoteRejected(GENERIC_REJECTION_MESSAGE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> WorkflowClient {
        let config = WorkflowConfiguration {
            base_url: server.uri(),
            timeout_seconds: 2,
            ..WorkflowConfiguration::default()
        };
        WorkflowClient::new(&config).unwrap()
    }

    fn step_one_request() -> StepOneRequest {
        StepOneRequest {
            document_image: "ZnJvbnQ=".to_string(),
            qrcode_image: "cXI=".to_string(),
            callback_url: "http:relay.local/validation/cnh/abc".to_string(),
        }
    }

    #[tokio::test]
    async fn step_one_posts_payload_and_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/r/cnh_validation_step_1"))
            .and(body_json(json!({
                "document_image": "ZnJvbnQ=",
                "qrcode_image": "cXI=",
                "callback_url": "http:relay.local/validation/cnh/abc"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user_data": {"nome": "Ana"},
                "liveness_pid": "p1",
                "liveness_url": "https://x/live"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .start_validation(&step_one_request())
            .await
            .unwrap();

        assert_eq!(reply.liveness_pid, "p1");
        assert_eq!(reply.liveness_url, "https://x/live");
        assert_eq!(reply.user_data, json!({"nome": "Ana"}));
    }

    #[tokio::test]
    async fn wrapped_error_reply_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/r/cnh_validation_step_1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"error": "x", "message": "bad image"}])),
            )
            .mount(&server)
            .await;

        let result = client_for(&server).start_validation(&step_one_request()).await;

        assert!(matches!(result, Err(ValidationError::RemoteRejected(ref m)) if m == "bad image"));
    }

    #[tokio::test]
    async fn error_status_with_error_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/r/cnh_validation_step_2"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": "liveness", "message": "liveness failed"})),
            )
            .mount(&server)
            .await;

        let request = StepTwoRequest {
            user_data: json!({"nome": "Ana"}),
            liveness_pid: "p1".to_string(),
        };
        let result = client_for(&server).finish_validation(&request).await;

        assert!(
            matches!(result, Err(ValidationError::RemoteRejected(ref m)) if m == "liveness failed")
        );
    }

    #[tokio::test]
    async fn server_error_without_json_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let result = client_for(&server).start_validation(&step_one_request()).await;

        assert!(matches!(result, Err(ValidationError::RemoteUnavailable)));
    }

    #[tokio::test]
    async fn slow_workflow_times_out_as_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = WorkflowConfiguration {
            base_url: server.uri(),
            timeout_seconds: 1,
            ..WorkflowConfiguration::default()
        };
        let client = WorkflowClient::new(&config).unwrap();
        let request = StepTwoRequest {
            user_data: json!({}),
            liveness_pid: "p1".to_string(),
        };

        let result = client.finish_validation(&request).await;
        assert!(matches!(result, Err(ValidationError::RemoteUnavailable)));
    }

    #[tokio::test]
    async fn unreachable_workflow_is_unavailable() {
        // Bind then release a port so nothing is listening on it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let config = WorkflowConfiguration {
            base_url: format!("http://127.0.0.1:{}/", port),
            ..WorkflowConfiguration::default()
        };

        let client = WorkflowClient::new(&config).unwrap();
        let result = client.start_validation(&step_one_request()).await;

        assert!(matches!(result, Err(ValidationError::RemoteUnavailable)));
    }

    #[test]
    fn endpoints_are_joined_onto_base_url() {
        let config = WorkflowConfiguration {
            base_url: "http://workflow.local/".to_string(),
            ..WorkflowConfiguration::default()
        };
        let client = WorkflowClient::new(&config).unwrap();

        assert_eq!(
            client.step_one_url.as_str(),
            "http://workflow.local/api/r/cnh_validation_step_1"
        );
        assert_eq!(
            client.step_two_url.as_str(),
            "http://workflow.local/api/r/cnh_validation_step_2"
        );
    }
}
