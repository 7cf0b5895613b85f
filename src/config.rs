//! Worker configuration.
//!
//! The messaging project settings are environment-specific and are handed to
//! the worker by the host page (usually as `self.MESSAGING_SW_CONFIG`, set by
//! a generated script). Nothing here carries real credentials.
//!
//! ```json
//! {
//!   "messaging": {
//!     "apiKey": "...",
//!     "appId": "1:123:web:abc",
//!     "messagingSenderId": "123",
//!     "projectId": "my-project"
//!   },
//!   "defaultTitle": "New message",
//!   "encodeParams": true
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};

/// Title shown when the push carries none ("new message").
pub const DEFAULT_TITLE: &str = "رسالة جديدة";

/// Body shown when the push carries none ("you received a notification").
pub const DEFAULT_BODY: &str = "وصلك إشعار";

/// Application root the deep link is built against.
pub const DEFAULT_BASE_PATH: &str = "/";

/// Messaging backend project identification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingConfig {
    pub api_key: String,
    pub app_id: String,
    pub messaging_sender_id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_id: Option<String>,
}

impl MessagingConfig {
    /// Check that every field needed to identify the project is present.
    pub fn validate(&self) -> RelayResult<()> {
        let required = [
            ("apiKey", &self.api_key),
            ("appId", &self.app_id),
            ("messagingSenderId", &self.messaging_sender_id),
            ("projectId", &self.project_id),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RelayError::Config(format!(
                "missing messaging field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

/// Full worker configuration: messaging project plus relay behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    #[serde(alias = "firebase")]
    pub messaging: MessagingConfig,
    /// Fallback notification title.
    #[serde(default = "default_title")]
    pub default_title: String,
    /// Fallback notification body.
    #[serde(default = "default_body")]
    pub default_body: String,
    /// Path the deep link points at.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Percent-encode deep-link parameter values. Off by default so links
    /// stay byte-identical to what the application already parses.
    #[serde(default)]
    pub encode_params: bool,
    /// `log` level name for the console logger.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_body() -> String {
    DEFAULT_BODY.to_string()
}

fn default_base_path() -> String {
    DEFAULT_BASE_PATH.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RelayConfig {
    /// Build a config with default relay options around a messaging project.
    pub fn new(messaging: MessagingConfig) -> Self {
        Self {
            messaging,
            default_title: default_title(),
            default_body: default_body(),
            base_path: default_base_path(),
            encode_params: false,
            log_level: default_log_level(),
        }
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> RelayResult<Self> {
        let config: RelayConfig =
            serde_json::from_str(json).map_err(|e| RelayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the messaging project and relay options.
    pub fn validate(&self) -> RelayResult<()> {
        self.messaging.validate()?;

        if !self.base_path.starts_with('/') {
            return Err(RelayError::Config(format!(
                "basePath must start with '/': {}",
                self.base_path
            )));
        }

        self.level()?;
        Ok(())
    }

    /// The configured log level.
    pub fn level(&self) -> RelayResult<log::Level> {
        self.log_level
            .parse::<log::Level>()
            .map_err(|_| RelayError::Config(format!("unknown logLevel: {}", self.log_level)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messaging() -> MessagingConfig {
        MessagingConfig {
            api_key: "key".to_string(),
            app_id: "1:1:web:1".to_string(),
            messaging_sender_id: "1".to_string(),
            project_id: "demo".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let config = RelayConfig::from_json(
            r#"{"messaging":{"apiKey":"k","appId":"a","messagingSenderId":"s","projectId":"p"}}"#,
        )
        .expect("valid config");

        assert_eq!(config.default_title, DEFAULT_TITLE);
        assert_eq!(config.default_body, DEFAULT_BODY);
        assert_eq!(config.base_path, "/");
        assert!(!config.encode_params);
        assert_eq!(config.level().unwrap(), log::Level::Info);
        assert_eq!(config.messaging.auth_domain, None);
    }

    #[test]
    fn test_from_json_accepts_firebase_alias_and_optional_fields() {
        let config = RelayConfig::from_json(
            r#"{
                "firebase": {
                    "apiKey": "k", "appId": "a", "messagingSenderId": "s", "projectId": "p",
                    "authDomain": "p.example.com", "storageBucket": "p.bucket", "measurementId": "G-1"
                },
                "encodeParams": true,
                "logLevel": "debug"
            }"#,
        )
        .expect("valid config");

        assert_eq!(config.messaging.auth_domain.as_deref(), Some("p.example.com"));
        assert_eq!(config.messaging.storage_bucket.as_deref(), Some("p.bucket"));
        assert_eq!(config.messaging.measurement_id.as_deref(), Some("G-1"));
        assert!(config.encode_params);
        assert_eq!(config.level().unwrap(), log::Level::Debug);
    }

    #[test]
    fn test_missing_required_fields_are_reported() {
        let mut m = messaging();
        m.api_key = String::new();
        m.project_id = "  ".to_string();

        let err = m.validate().unwrap_err();
        assert_eq!(
            err,
            RelayError::Config("missing messaging field(s): apiKey, projectId".to_string())
        );
    }

    #[test]
    fn test_rejects_relative_base_path() {
        let mut config = RelayConfig::new(messaging());
        config.base_path = "app".to_string();
        assert!(matches!(config.validate(), Err(RelayError::Config(_))));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut config = RelayConfig::new(messaging());
        config.log_level = "loud".to_string();
        assert!(matches!(config.validate(), Err(RelayError::Config(_))));
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        assert!(matches!(
            RelayConfig::from_json("{not json"),
            Err(RelayError::Config(_))
        ));
    }
}
