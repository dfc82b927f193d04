use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Configuration {
    #[serde(default)]
    pub server: ServerConfiguration,
    #[serde(default)]
    pub workflow: WorkflowConfiguration,
    #[serde(default)]
    pub sessions: SessionConfiguration,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfiguration {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Absolute base URL used when building liveness callbacks. Derived from
    /// the incoming request when unset.
    #[serde(default)]
    pub public_url: Option<String>,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfiguration {
    #[serde(default = "default_workflow_url")]
    pub base_url: String,

    #[serde(default = "default_step_one_path")]
    pub step_one_path: String,

    #[serde(default = "default_step_two_path")]
    pub step_two_path: String,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfiguration {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_validity")]
    pub validity_minutes: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    6231
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_workflow_url() -> String {
    "http://localhost/".to_string()
}

fn default_step_one_path() -> String {
    "/api/r/cnh_validation_step_1".to_string()
}

fn default_step_two_path() -> String {
    "/api/r/cnh_validation_step_2".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("validation_data")
}

fn default_validity() -> u64 {
    55
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for WorkflowConfiguration {
    fn default() -> Self {
        Self {
            base_url: default_workflow_url(),
            step_one_path: default_step_one_path(),
            step_two_path: default_step_two_path(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            validity_minutes: default_validity(),
        }
    }
}

impl WorkflowConfiguration {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl SessionConfiguration {
    pub fn validity(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.validity_minutes as i64)
    }
}

impl Configuration {
    pub fn new() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(config::File::with_name("config"));
        }

        builder =
            builder.add_source(config::Environment::with_prefix("CNH_VALIDATOR").separator("__"));

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sessions.validity_minutes == 0 {
            return Err("sessions.validity_minutes must be greater than zero".to_string());
        }
        if self.workflow.timeout_seconds == 0 {
            return Err("workflow.timeout_seconds must be greater than zero".to_string());
        }
        if self.server.max_upload_bytes == 0 {
            return Err("server.max_upload_bytes must be greater than zero".to_string());
        }
        validate_http_url("workflow.base_url", &self.workflow.base_url)?;
        if let Some(public_url) = &self.server.public_url {
            validate_http_url("server.public_url", public_url)?;
        }
        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("{} is not a valid URL: {}", field, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "{} must be an HTTP(S) URL, got scheme '{}'",
            field, other
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let configuration = Configuration::default();

        assert!(configuration.validate().is_ok());
        assert_eq!(configuration.server.port, 6231);
        assert_eq!(configuration.sessions.validity(), chrono::Duration::minutes(55));
    }

    #[test]
    fn rejects_zero_validity_window() {
        let mut configuration = Configuration::default();
        configuration.sessions.validity_minutes = 0;

        assert!(configuration.validate().is_err());
    }

    #[test]
    fn rejects_non_http_workflow_url() {
        let mut configuration = Configuration::default();
        configuration.workflow.base_url = "ftp://workflow.local/".to_string();
        assert!(configuration.validate().is_err());

        configuration.workflow.base_url = "not a url".to_string();
        assert!(configuration.validate().is_err());
    }

    #[test]
    fn rejects_relative_public_url() {
        let mut configuration = Configuration::default();
        configuration.server.public_url = Some("/validation".to_string());

        assert!(configuration.validate().is_err());
    }
}
