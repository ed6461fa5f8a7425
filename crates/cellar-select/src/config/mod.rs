use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::selection::extractor::LlmExtractorSettings;
use crate::selection::notifier::MailSettings;
use crate::selection::ranking::DEFAULT_SELECTION_SIZE;
use crate::selection::retriever::RetrievalPolicy;

const DEFAULT_LLM_BASE_URL: &str = "https://api.together.xyz/v1";
const DEFAULT_LLM_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo-Free";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub catalog: CatalogConfig,
    pub extractor: ExtractorConfig,
    pub mail: MailConfig,
    pub selection: SelectionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let catalog = CatalogConfig {
            path: optional_var("CATALOG_PATH").map(PathBuf::from),
        };

        let extractor = ExtractorConfig {
            base_url: env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string()),
            api_key: optional_var("LLM_API_KEY"),
            model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            temperature: parse_var("LLM_TEMPERATURE", 0.2)?,
        };

        let mail = MailConfig {
            resend_api_key: optional_var("RESEND_API_KEY"),
            sender: optional_var("SENDER_EMAIL"),
            notification_recipient: optional_var("NOTIFICATION_EMAIL"),
            booking_url: optional_var("BOOKING_URL"),
        };

        let selection = SelectionConfig {
            selection_size: parse_var("SELECTION_SIZE", DEFAULT_SELECTION_SIZE)?,
            price_floor_margin: parse_var("PRICE_FLOOR_MARGIN", 10.0)?,
            fallback_limit: parse_var("FALLBACK_LIMIT", DEFAULT_SELECTION_SIZE)?,
            min_results_before_widening: parse_var(
                "MIN_RESULTS_BEFORE_WIDENING",
                DEFAULT_SELECTION_SIZE,
            )?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            catalog,
            extractor,
            mail,
            selection,
        })
    }
}

fn optional_var(key: &'static str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(key) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the wine catalog is loaded from; `None` uses the bundled sample.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}

/// Language model used for preference extraction.
#[derive(Clone)]
pub struct ExtractorConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
}

impl ExtractorConfig {
    /// Settings for the model-backed extractor, when an API key is configured.
    pub fn llm_settings(&self) -> Option<LlmExtractorSettings> {
        self.api_key.as_ref().map(|api_key| LlmExtractorSettings {
            base_url: self.base_url.clone(),
            api_key: api_key.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
        })
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Outbound mail provider settings.
#[derive(Clone, Default)]
pub struct MailConfig {
    pub resend_api_key: Option<String>,
    pub sender: Option<String>,
    pub notification_recipient: Option<String>,
    pub booking_url: Option<String>,
}

impl MailConfig {
    /// Complete Resend settings, or `None` when any required value is missing.
    pub fn resend_settings(&self) -> Option<MailSettings> {
        Some(MailSettings {
            api_key: self.resend_api_key.clone()?,
            sender: self.sender.clone()?,
            notification_recipient: self.notification_recipient.clone()?,
            booking_url: self.booking_url.clone().unwrap_or_default(),
        })
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("resend_api_key", &self.resend_api_key.as_ref().map(|_| "***"))
            .field("sender", &self.sender)
            .field("notification_recipient", &self.notification_recipient)
            .field("booking_url", &self.booking_url)
            .finish()
    }
}

/// Selection sizing and retrieval widening knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionConfig {
    pub selection_size: usize,
    pub price_floor_margin: f64,
    pub fallback_limit: usize,
    pub min_results_before_widening: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        let policy = RetrievalPolicy::default();
        Self {
            selection_size: DEFAULT_SELECTION_SIZE,
            price_floor_margin: policy.price_floor_margin,
            fallback_limit: policy.fallback_limit,
            min_results_before_widening: policy.min_results_before_widening,
        }
    }
}

impl SelectionConfig {
    pub fn retrieval_policy(&self) -> RetrievalPolicy {
        RetrievalPolicy {
            price_floor_margin: self.price_floor_margin.max(0.0),
            fallback_limit: self.fallback_limit,
            min_results_before_widening: self.min_results_before_widening,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => write!(f, "{key} must be a valid number"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "CATALOG_PATH",
            "LLM_BASE_URL",
            "LLM_API_KEY",
            "LLM_MODEL",
            "LLM_TEMPERATURE",
            "RESEND_API_KEY",
            "SENDER_EMAIL",
            "NOTIFICATION_EMAIL",
            "BOOKING_URL",
            "SELECTION_SIZE",
            "PRICE_FLOOR_MARGIN",
            "FALLBACK_LIMIT",
            "MIN_RESULTS_BEFORE_WIDENING",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.catalog.path.is_none());
        assert_eq!(config.extractor.base_url, DEFAULT_LLM_BASE_URL);
        assert!(config.extractor.llm_settings().is_none());
        assert!(config.mail.resend_settings().is_none());
        assert_eq!(config.selection, SelectionConfig::default());
        assert_eq!(
            config.selection.retrieval_policy(),
            RetrievalPolicy::default()
        );
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn selection_knobs_come_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MIN_RESULTS_BEFORE_WIDENING", "4");
        env::set_var("PRICE_FLOOR_MARGIN", "5.5");
        env::set_var("LLM_API_KEY", "sk-test");
        let config = AppConfig::load().expect("config loads");
        let policy = config.selection.retrieval_policy();
        assert_eq!(policy.min_results_before_widening, 4);
        assert_eq!(policy.price_floor_margin, 5.5);
        let settings = config.extractor.llm_settings().expect("llm configured");
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.model, DEFAULT_LLM_MODEL);
        reset_env();
    }

    #[test]
    fn rejects_non_numeric_knobs() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FALLBACK_LIMIT", "plenty");
        match AppConfig::load() {
            Err(ConfigError::InvalidNumber { key }) => assert_eq!(key, "FALLBACK_LIMIT"),
            other => panic!("expected invalid number, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn resend_requires_key_sender_and_recipient() {
        let mail = MailConfig {
            resend_api_key: Some("re_test".to_string()),
            sender: Some("cellar@example.com".to_string()),
            notification_recipient: None,
            booking_url: None,
        };
        assert!(mail.resend_settings().is_none());

        let mail = MailConfig {
            notification_recipient: Some("team@example.com".to_string()),
            ..mail
        };
        let settings = mail.resend_settings().expect("complete settings");
        assert_eq!(settings.booking_url, "");
    }
}
