//! Endpoint and timing configuration for the verification flow.
//!
//! Defaults match the two local backend services the job board talks to:
//! the employer service and the job seeker resend endpoint on port 8080, the
//! job seeker registration API on port 5000. Callers override individual
//! values (the CLI maps flags and `OTP_FLOW_*` variables onto
//! [`ConfigOverrides`]); blank overrides are ignored.

use super::{
    countdown::{INITIAL_COOLDOWN_SECS, RESEND_COOLDOWN_SECS},
    errors::FlowError,
};
use std::time::Duration;
use url::Url;

pub const DEFAULT_EMPLOYER_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_JOB_SEEKER_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_RESEND_BASE_URL: &str = "http://localhost:8080";
/// Default request timeout applied to verify and resend calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowConfig {
    /// Employer service, serves both employer verify and resend.
    pub employer_base_url: String,
    /// Job seeker registration API, serves verification.
    pub job_seeker_base_url: String,
    /// Service serving the job seeker resend endpoint.
    pub resend_base_url: String,
    pub initial_cooldown_secs: u32,
    pub resend_cooldown_secs: u32,
    pub request_timeout: Duration,
    /// Fire `on_success` after an employer verification too.
    pub notify_employer_success: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            employer_base_url: DEFAULT_EMPLOYER_BASE_URL.to_string(),
            job_seeker_base_url: DEFAULT_JOB_SEEKER_BASE_URL.to_string(),
            resend_base_url: DEFAULT_RESEND_BASE_URL.to_string(),
            initial_cooldown_secs: INITIAL_COOLDOWN_SECS,
            resend_cooldown_secs: RESEND_COOLDOWN_SECS,
            request_timeout: DEFAULT_TIMEOUT,
            notify_employer_success: false,
        }
    }
}

impl FlowConfig {
    /// Point every endpoint at one base URL, handy for a single mock server.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            employer_base_url: base_url.to_string(),
            job_seeker_base_url: base_url.to_string(),
            resend_base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Check that every base URL is an absolute http(s) URL.
    ///
    /// # Errors
    /// Returns `FlowError::Config` naming the first invalid URL.
    pub fn validate(&self) -> Result<(), FlowError> {
        for (name, value) in [
            ("employer base URL", &self.employer_base_url),
            ("job seeker base URL", &self.job_seeker_base_url),
            ("resend base URL", &self.resend_base_url),
        ] {
            let url = Url::parse(value)
                .map_err(|err| FlowError::Config(format!("invalid {name} {value:?}: {err}")))?;

            if !matches!(url.scheme(), "http" | "https") {
                return Err(FlowError::Config(format!(
                    "invalid {name} {value:?}: unsupported scheme {}",
                    url.scheme()
                )));
            }
        }

        if self.request_timeout.is_zero() {
            return Err(FlowError::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub employer_base_url: Option<String>,
    pub job_seeker_base_url: Option<String>,
    pub resend_base_url: Option<String>,
    pub initial_cooldown_secs: Option<u32>,
    pub resend_cooldown_secs: Option<u32>,
    pub request_timeout: Option<Duration>,
    pub notify_employer_success: Option<bool>,
}

pub fn apply_overrides(config: &mut FlowConfig, overrides: ConfigOverrides) {
    if let Some(value) = overrides.employer_base_url.and_then(normalize_value) {
        config.employer_base_url = value;
    }
    if let Some(value) = overrides.job_seeker_base_url.and_then(normalize_value) {
        config.job_seeker_base_url = value;
    }
    if let Some(value) = overrides.resend_base_url.and_then(normalize_value) {
        config.resend_base_url = value;
    }
    if let Some(value) = overrides.initial_cooldown_secs {
        config.initial_cooldown_secs = value;
    }
    if let Some(value) = overrides.resend_cooldown_secs {
        config.resend_cooldown_secs = value;
    }
    if let Some(value) = overrides.request_timeout {
        config.request_timeout = value;
    }
    if let Some(value) = overrides.notify_employer_success {
        config.notify_employer_success = value;
    }
}

fn normalize_value(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
