//! Configuration module
//!
//! Environment-driven configuration for the HTTP server, storage backends, the upload
//! pipeline, and the notification mailer. `.env` files are honoured through `dotenvy`.

use std::env;

use crate::constants::BYTES_PER_MB;
use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 80;
const MAX_REQUEST_SIZE_MB: u64 = 20;
const MAX_UPLOAD_MEMORY_MB: u64 = 15;
const UPLOAD_TIMEOUT_SECS: u64 = 120;
const RATE_LIMIT_PER_MINUTE: u32 = 5;
const LOCAL_STORAGE_LIMIT_MB: u64 = 1024;
const MEMORY_STORAGE_LIMIT_MB: u64 = 1024;
const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";
const NOTIFY_FROM: &str = "hey@skulpture.xyz";
const NOTIFY_SUBJECT: &str = "Thanks for your enquiry";

/// Server-wide settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub service_name: String,
    pub log_level: String,
    pub log_json: bool,
    pub rate_limit_per_minute: u32,
    pub trusted_proxy_count: usize,
}

/// Lead intake configuration
#[derive(Clone, Debug)]
pub struct LeadConfig {
    pub base: BaseConfig,
    // Request handling
    pub max_request_size_bytes: u64,
    pub max_upload_memory_bytes: u64,
    pub upload_timeout_secs: u64,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub drive_access_token: Option<String>,
    pub drive_api_url: String,
    pub drive_upload_url: String,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub local_storage_limit_bytes: u64,
    pub memory_storage_limit_bytes: u64,
    // Notification email
    pub notify_enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_tls: bool,
    pub notify_from: String,
    pub notify_subject: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<LeadConfig>);

impl Config {
    fn as_lead(&self) -> &LeadConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_lead().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    /// Check if the application is running in development mode
    pub fn is_development(&self) -> bool {
        let environment = self.as_lead().base.environment.to_lowercase();
        environment == "development" || environment == "dev"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = LeadConfig::from_lookup(lookup)?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_lead().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_lead().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.as_lead().base.environment
    }

    pub fn service_name(&self) -> &str {
        &self.as_lead().base.service_name
    }

    pub fn log_level(&self) -> &str {
        &self.as_lead().base.log_level
    }

    pub fn log_json(&self) -> bool {
        self.as_lead().base.log_json
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.as_lead().base.rate_limit_per_minute
    }

    /// Rate limiting is skipped in development.
    pub fn rate_limit_enabled(&self) -> bool {
        !self.is_development() && self.rate_limit_per_minute() > 0
    }

    pub fn trusted_proxy_count(&self) -> usize {
        self.as_lead().base.trusted_proxy_count
    }

    pub fn max_request_size_bytes(&self) -> u64 {
        self.as_lead().max_request_size_bytes
    }

    pub fn max_upload_memory_bytes(&self) -> u64 {
        self.as_lead().max_upload_memory_bytes
    }

    pub fn upload_timeout_secs(&self) -> u64 {
        self.as_lead().upload_timeout_secs
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_lead().storage_backend
    }

    pub fn drive_access_token(&self) -> Option<&str> {
        self.as_lead().drive_access_token.as_deref()
    }

    pub fn drive_api_url(&self) -> &str {
        &self.as_lead().drive_api_url
    }

    pub fn drive_upload_url(&self) -> &str {
        &self.as_lead().drive_upload_url
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_lead().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.as_lead().local_storage_base_url.as_deref()
    }

    pub fn local_storage_limit_bytes(&self) -> u64 {
        self.as_lead().local_storage_limit_bytes
    }

    pub fn memory_storage_limit_bytes(&self) -> u64 {
        self.as_lead().memory_storage_limit_bytes
    }

    pub fn notify_enabled(&self) -> bool {
        self.as_lead().notify_enabled
    }

    pub fn smtp_host(&self) -> Option<&str> {
        self.as_lead().smtp_host.as_deref()
    }

    pub fn smtp_port(&self) -> Option<u16> {
        self.as_lead().smtp_port
    }

    pub fn smtp_user(&self) -> Option<&str> {
        self.as_lead().smtp_user.as_deref()
    }

    pub fn smtp_password(&self) -> Option<&str> {
        self.as_lead().smtp_password.as_deref()
    }

    pub fn smtp_tls(&self) -> bool {
        self.as_lead().smtp_tls
    }

    pub fn notify_from(&self) -> &str {
        &self.as_lead().notify_from
    }

    pub fn notify_subject(&self) -> &str {
        &self.as_lead().notify_subject
    }
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| v.trim().to_lowercase())
        .and_then(|v| match v.as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

impl LeadConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let environment = non_empty("ENVIRONMENT")
            .or_else(|| non_empty("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let log_level = non_empty("LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .to_lowercase();
        if !["debug", "info", "warn", "error"].contains(&log_level.as_str()) {
            return Err(anyhow::anyhow!(
                "LOG_LEVEL must be one of debug, info, warn, error (got '{}')",
                log_level
            ));
        }

        let base = BaseConfig {
            server_port: non_empty("PORT")
                .unwrap_or_else(|| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            service_name: non_empty("SERVICE_NAME").unwrap_or_else(|| "leadrelay".to_string()),
            log_level,
            log_json: non_empty("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            rate_limit_per_minute: non_empty("RATE_LIMIT_PER_MINUTE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(RATE_LIMIT_PER_MINUTE),
            trusted_proxy_count: non_empty("TRUSTED_PROXY_COUNT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        };

        let storage_backend = match non_empty("STORAGE_BACKEND") {
            Some(s) => s.parse::<StorageBackend>()?,
            None => StorageBackend::Drive,
        };

        let mb = |key: &str, default: u64| -> u64 {
            non_empty(key)
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(default)
                * BYTES_PER_MB
        };

        let config = LeadConfig {
            base,
            max_request_size_bytes: mb("MAX_REQUEST_SIZE_MB", MAX_REQUEST_SIZE_MB),
            max_upload_memory_bytes: mb("MAX_UPLOAD_MEMORY_MB", MAX_UPLOAD_MEMORY_MB),
            upload_timeout_secs: non_empty("UPLOAD_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(UPLOAD_TIMEOUT_SECS),
            storage_backend,
            drive_access_token: non_empty("DRIVE_ACCESS_TOKEN"),
            drive_api_url: non_empty("DRIVE_API_URL").unwrap_or_else(|| DRIVE_API_URL.to_string()),
            drive_upload_url: non_empty("DRIVE_UPLOAD_URL")
                .unwrap_or_else(|| DRIVE_UPLOAD_URL.to_string()),
            local_storage_path: non_empty("LOCAL_STORAGE_PATH"),
            local_storage_base_url: non_empty("LOCAL_STORAGE_BASE_URL"),
            local_storage_limit_bytes: mb("LOCAL_STORAGE_LIMIT_MB", LOCAL_STORAGE_LIMIT_MB),
            memory_storage_limit_bytes: mb("MEMORY_STORAGE_LIMIT_MB", MEMORY_STORAGE_LIMIT_MB),
            notify_enabled: parse_bool(non_empty("NOTIFY_ENABLED"), false),
            smtp_host: non_empty("SMTP_HOST"),
            smtp_port: non_empty("SMTP_PORT")
                .and_then(|s| s.parse().ok())
                .filter(|&p| p > 0),
            smtp_user: non_empty("SMTP_USER"),
            smtp_password: non_empty("SMTP_PASSWORD"),
            smtp_tls: parse_bool(non_empty("SMTP_TLS"), true),
            notify_from: non_empty("NOTIFY_FROM").unwrap_or_else(|| NOTIFY_FROM.to_string()),
            notify_subject: non_empty("NOTIFY_SUBJECT")
                .unwrap_or_else(|| NOTIFY_SUBJECT.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_request_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_REQUEST_SIZE_MB must be greater than 0"));
        }

        if self.upload_timeout_secs == 0 {
            return Err(anyhow::anyhow!("UPLOAD_TIMEOUT_SECS must be greater than 0"));
        }

        if self.notify_enabled && self.smtp_host.is_none() {
            return Err(anyhow::anyhow!(
                "NOTIFY_ENABLED=true requires SMTP_HOST to be set"
            ));
        }

        match self.storage_backend {
            StorageBackend::Drive => {
                if self.drive_access_token.is_none() {
                    return Err(anyhow::anyhow!(
                        "DRIVE_ACCESS_TOKEN must be set when using the drive storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::Memory => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_memory_backend() {
        let config = Config::from_lookup(lookup(&[("STORAGE_BACKEND", "memory")])).unwrap();
        assert_eq!(config.server_port(), 80);
        assert_eq!(config.environment(), "development");
        assert!(config.is_development());
        assert!(!config.rate_limit_enabled());
        assert_eq!(config.max_request_size_bytes(), 20 * 1024 * 1024);
        assert_eq!(config.max_upload_memory_bytes(), 15 * 1024 * 1024);
        assert_eq!(config.rate_limit_per_minute(), 5);
        assert_eq!(config.notify_from(), "hey@skulpture.xyz");
        assert_eq!(config.log_level(), "info");
        assert!(!config.notify_enabled());
    }

    #[test]
    fn test_drive_backend_requires_token() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("DRIVE_ACCESS_TOKEN"));

        let config = Config::from_lookup(lookup(&[("DRIVE_ACCESS_TOKEN", "ya29.token")])).unwrap();
        assert_eq!(config.storage_backend(), StorageBackend::Drive);
        assert_eq!(config.drive_access_token(), Some("ya29.token"));
        assert_eq!(config.drive_api_url(), "https://www.googleapis.com/drive/v3");
    }

    #[test]
    fn test_local_backend_requires_path_and_url() {
        let err = Config::from_lookup(lookup(&[("STORAGE_BACKEND", "local")])).unwrap_err();
        assert!(err.to_string().contains("LOCAL_STORAGE_PATH"));

        let config = Config::from_lookup(lookup(&[
            ("STORAGE_BACKEND", "local"),
            ("LOCAL_STORAGE_PATH", "/tmp/leads"),
            ("LOCAL_STORAGE_BASE_URL", "http://localhost/files"),
            ("LOCAL_STORAGE_LIMIT_MB", "2"),
        ]))
        .unwrap();
        assert_eq!(config.local_storage_limit_bytes(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_production_enables_rate_limit() {
        let config = Config::from_lookup(lookup(&[
            ("STORAGE_BACKEND", "memory"),
            ("ENVIRONMENT", "Production"),
        ]))
        .unwrap();
        assert!(config.is_production());
        assert!(config.rate_limit_enabled());
    }

    #[test]
    fn test_notify_requires_smtp_host() {
        let err = Config::from_lookup(lookup(&[
            ("STORAGE_BACKEND", "memory"),
            ("NOTIFY_ENABLED", "true"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SMTP_HOST"));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("STORAGE_BACKEND", "memory"),
            ("LOG_LEVEL", "verbose"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("LOG_LEVEL"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("STORAGE_BACKEND", "memory"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
