//! Configuration types.
//!
//! Both sides read their settings from `SAFESPACE_*` environment variables
//! with defaults. `from_lookup` takes any key lookup so tests don't touch the
//! process environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConfigError, SubmissionError};
use crate::onboarding::client::HttpOnboardingClient;
use crate::onboarding::submission::{DEFAULT_SUBMIT_TIMEOUT, Navigator, SubmissionCoordinator};
use crate::onboarding::validation::ValidationPolicy;
use crate::onboarding::wizard::OnboardingWizard;
use crate::session::{FileStorage, SessionContext};

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}

/// Onboarding service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Port the HTTP API listens on.
    pub port: u16,
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            db_path: PathBuf::from("./data/safespace.db"),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: parse_or(&lookup, "SAFESPACE_PORT", defaults.port)?,
            db_path: lookup("SAFESPACE_DB_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
        })
    }
}

/// Wizard-side configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the onboarding service.
    pub api_base_url: String,
    /// Upper bound on a single submit.
    pub submit_timeout: Duration,
    pub validation: ValidationPolicy,
    /// Where the signed-in identity is kept across restarts.
    pub session_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3001".to_string(),
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            validation: ValidationPolicy::default(),
            session_path: PathBuf::from("./data/session.json"),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let timeout_secs: u64 = parse_or(
            &lookup,
            "SAFESPACE_SUBMIT_TIMEOUT_SECS",
            defaults.submit_timeout.as_secs(),
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SAFESPACE_SUBMIT_TIMEOUT_SECS".into(),
                message: "must be at least 1 second".into(),
            });
        }

        Ok(Self {
            api_base_url: lookup("SAFESPACE_API_URL")
                .filter(|u| !u.trim().is_empty())
                .unwrap_or(defaults.api_base_url),
            submit_timeout: Duration::from_secs(timeout_secs),
            validation: parse_or(&lookup, "SAFESPACE_VALIDATION", defaults.validation)?,
            session_path: lookup("SAFESPACE_SESSION_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.session_path),
        })
    }

    /// Session context backed by the configured file.
    pub fn session_context(&self) -> SessionContext {
        SessionContext::new(Arc::new(FileStorage::new(&self.session_path)))
    }

    /// Coordinator talking to the configured service over HTTP.
    pub fn coordinator(
        &self,
        session: SessionContext,
        navigator: Arc<dyn Navigator>,
    ) -> Result<SubmissionCoordinator, SubmissionError> {
        let client = HttpOnboardingClient::with_timeout(&self.api_base_url, self.submit_timeout)?;
        Ok(SubmissionCoordinator::new(Arc::new(client), session, navigator)
            .with_timeout(self.submit_timeout))
    }

    /// A fresh wizard wired to the configured service and session file.
    pub fn wizard(&self, navigator: Arc<dyn Navigator>) -> Result<OnboardingWizard, SubmissionError> {
        let coordinator = self.coordinator(self.session_context(), navigator)?;
        Ok(OnboardingWizard::new(Arc::new(coordinator), self.validation))
    }
}
