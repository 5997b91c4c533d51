//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::onboarding::verification::DEFAULT_RESEND_COUNTDOWN_SECS;

/// Engine-level knobs for one onboarding workflow.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowConfig {
    /// Seed of the verification resend countdown.
    pub resend_countdown: Duration,
    /// How often the countdown ticks.
    pub tick_interval: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            resend_countdown: Duration::from_secs(u64::from(DEFAULT_RESEND_COUNTDOWN_SECS)),
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// Process configuration for the onboarding service binary.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Remote service root, without a trailing slash.
    pub api_base_url: String,
    /// Signed-in user token, used to read remote progress.
    pub auth_token: Option<SecretString>,
    pub db_path: PathBuf,
    pub http_timeout: Duration,
    pub port: u16,
    pub workflow: WorkflowConfig,
}

impl OnboardingConfig {
    /// Build config from environment variables.
    /// `ONBOARDING_API_BASE_URL` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = lookup("ONBOARDING_API_BASE_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("ONBOARDING_API_BASE_URL".to_string()))?;
        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "ONBOARDING_API_BASE_URL".to_string(),
                message: format!("expected an http(s) URL, got {api_base_url}"),
            });
        }

        let auth_token = lookup("ONBOARDING_AUTH_TOKEN")
            .filter(|s| !s.trim().is_empty())
            .map(SecretString::from);

        let db_path = lookup("ONBOARDING_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/seller-onboarding.db"));

        let http_timeout_secs: u64 = lookup("ONBOARDING_HTTP_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let resend_countdown_secs: u64 = lookup("ONBOARDING_RESEND_COUNTDOWN_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(u64::from(DEFAULT_RESEND_COUNTDOWN_SECS));

        let port: u16 = lookup("ONBOARDING_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(8090);

        Ok(Self {
            api_base_url,
            auth_token,
            db_path,
            http_timeout: Duration::from_secs(http_timeout_secs),
            port,
            workflow: WorkflowConfig {
                resend_countdown: Duration::from_secs(resend_countdown_secs),
                ..WorkflowConfig::default()
            },
        })
    }
}
