use serde::Deserialize;
use sign_inference::config::{LandmarkConfig, ModelConfig};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub model: ModelConfig,
    pub landmarks: LandmarkConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub response: ResponseConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

fn deserialize_response_format<'de, D>(deserializer: D) -> Result<ResponseFormat, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_greeting")]
    pub greeting: bool,
    #[serde(default = "default_greeting_message")]
    pub greeting_message: String,
    #[serde(default = "default_keep_alive_token")]
    pub keep_alive_token: String,
    #[serde(default = "default_frame_delay_ms")]
    pub frame_delay_ms: u64,
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

fn default_greeting() -> bool {
    true
}

fn default_greeting_message() -> String {
    "Welcome to the sign detection stream".into()
}

fn default_keep_alive_token() -> String {
    "ping".into()
}

fn default_frame_delay_ms() -> u64 {
    10
}

fn default_max_message_bytes() -> usize {
    8 * 1024 * 1024
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            greeting_message: default_greeting_message(),
            keep_alive_token: default_keep_alive_token(),
            frame_delay_ms: default_frame_delay_ms(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

impl TryFrom<String> for ResponseFormat {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "{} is not a supported response format. Use either `text` or `json`.",
                other
            )),
        }
    }
}

/// Wire format of frame responses and the texts sent in place of a label.
#[derive(Debug, Deserialize, Clone)]
pub struct ResponseConfig {
    #[serde(
        default = "default_response_format",
        deserialize_with = "deserialize_response_format"
    )]
    pub format: ResponseFormat,
    #[serde(default = "default_not_detected")]
    pub not_detected: String,
    #[serde(default = "default_model_unavailable")]
    pub model_unavailable: String,
    #[serde(default = "default_processing_error")]
    pub processing_error: String,
    #[serde(default = "default_invalid_frame")]
    pub invalid_frame: String,
}

fn default_response_format() -> ResponseFormat {
    ResponseFormat::Json
}

fn default_not_detected() -> String {
    "Tidak Terdeteksi".into()
}

fn default_model_unavailable() -> String {
    "Model Unavailable".into()
}

fn default_processing_error() -> String {
    "Error".into()
}

fn default_invalid_frame() -> String {
    "Invalid Frame".into()
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            format: default_response_format(),
            not_detected: default_not_detected(),
            model_unavailable: default_model_unavailable(),
            processing_error: default_processing_error(),
            invalid_frame: default_invalid_frame(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(format!("{}.yaml", environment.as_str())),
        ))
        .add_source(
            config::Environment::with_prefix("SIGN")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    config.try_deserialize::<Config>()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
server:
  host: 127.0.0.1
  port: 8000
log_level: INFO
model:
  model_dir: models
landmarks:
  model_file: models/handpose.onnx
response:
  format: text
"#;

    fn parse(yaml: &str) -> Result<Config, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize::<Config>()
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = parse(BASE).unwrap();

        assert_eq!(config.server.get_address(), "127.0.0.1:8000");
        assert_eq!(config.log_level.as_str(), "info");
        assert_eq!(config.model.classifier_file, "classifier.onnx");
        assert_eq!(config.response.format, ResponseFormat::Text);
        assert_eq!(config.response.not_detected, "Tidak Terdeteksi");
        assert_eq!(config.session.keep_alive_token, "ping");
        assert_eq!(config.session.frame_delay_ms, 10);
        assert!(config.session.greeting);
        assert!(config.pipeline.worker_threads >= 1);
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let yaml = BASE.replace("log_level: INFO", "log_level: trace");
        let err = parse(&yaml).unwrap_err();
        assert!(err.to_string().contains("not a supported minimum log level"));
    }

    #[test]
    fn test_unknown_response_format_is_rejected() {
        let yaml = BASE.replace("format: text", "format: xml");
        assert!(parse(&yaml).is_err());
    }

    #[test]
    fn test_environment_names() {
        let env: Environment = "Production".to_string().try_into().unwrap();
        assert_eq!(env.as_str(), "production");
        assert!(Environment::try_from("staging".to_string()).is_err());
    }
}
