//! Backend channels for the two registration flows.
//!
//! Job seekers and employers register against different services that speak
//! different encodings. Each side is an [`OtpChannel`]; the flow receives one
//! at construction and never branches on the mode itself.

use super::{
    api,
    config::FlowConfig,
    errors::{FlowError, FlowResult},
    passcode::{self, PasscodeDigits},
};
use reqwest::{multipart::Form, Client};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::fmt;
use tracing::{debug, instrument};
use url::Url;

pub const EMPLOYER_VERIFY_PATH: &str = "/verify-otp-employer";
pub const EMPLOYER_RESEND_PATH: &str = "/resend-otp-employer";
pub const JOB_SEEKER_VERIFY_PATH: &str = "/api/user/verify-register";
pub const JOB_SEEKER_RESEND_PATH: &str = "/resend-otp";

pub const VERIFY_FALLBACK: &str = "OTP verification failed";
pub const RESEND_FALLBACK: &str = "Failed to resend OTP";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlowMode {
    #[default]
    JobSeeker,
    Employer,
}

impl FlowMode {
    #[must_use]
    pub fn from_is_employer(is_employer: bool) -> Self {
        if is_employer {
            Self::Employer
        } else {
            Self::JobSeeker
        }
    }

    #[must_use]
    pub fn is_employer(self) -> bool {
        matches!(self, Self::Employer)
    }
}

impl fmt::Display for FlowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JobSeeker => write!(f, "job seeker"),
            Self::Employer => write!(f, "employer"),
        }
    }
}

/// Verify/resend capability of one backend.
#[trait_variant::make(OtpChannel: Send)]
pub trait LocalOtpChannel {
    /// Exchange the entered digits, slot by slot, for a confirmed
    /// registration.
    async fn verify(&self, digits: &PasscodeDigits) -> FlowResult<()>;

    /// Ask the backend to issue a new code.
    async fn resend(&self) -> FlowResult<()>;
}

/// Employer service: multipart form fields, JSON `error` payloads.
#[derive(Clone, Debug)]
pub struct EmployerChannel {
    client: Client,
    verify_url: Url,
    resend_url: Url,
}

impl EmployerChannel {
    /// # Errors
    /// Returns `FlowError::Config` if the employer base URL is invalid.
    pub fn new(client: Client, config: &FlowConfig) -> FlowResult<Self> {
        Ok(Self {
            client,
            verify_url: api::endpoint_url(&config.employer_base_url, EMPLOYER_VERIFY_PATH)?,
            resend_url: api::endpoint_url(&config.employer_base_url, EMPLOYER_RESEND_PATH)?,
        })
    }
}

/// One text field per slot, `otp-input1` through `otp-input6`; an empty
/// slot posts an empty field.
fn passcode_form(digits: &PasscodeDigits) -> Form {
    digits
        .iter()
        .enumerate()
        .fold(Form::new(), |form, (index, digit)| {
            form.text(
                format!("otp-input{}", index + 1),
                digit.expose_secret().to_string(),
            )
        })
}

impl OtpChannel for EmployerChannel {
    #[instrument(skip_all, fields(url = %self.verify_url))]
    async fn verify(&self, digits: &PasscodeDigits) -> FlowResult<()> {
        let response =
            api::post_multipart(&self.client, self.verify_url.clone(), passcode_form(digits))
                .await?;
        api::ensure_success(response, VERIFY_FALLBACK).await?;

        debug!("employer verification accepted");

        Ok(())
    }

    #[instrument(skip_all, fields(url = %self.resend_url))]
    async fn resend(&self) -> FlowResult<()> {
        let response = api::post_empty(&self.client, self.resend_url.clone()).await?;
        api::ensure_success(response, RESEND_FALLBACK).await
    }
}

#[derive(Serialize)]
struct VerifyOtpRequest<'a> {
    otp: &'a str,
}

pub const MISSING_EMAIL: &str =
    "An email address is required to verify a job seeker registration";

/// Job seeker registration API: JSON body, email scoped verify URL.
///
/// The email only matters for verification; without one the channel can
/// still resend.
#[derive(Clone, Debug)]
pub struct JobSeekerChannel {
    client: Client,
    verify_url: Option<Url>,
    resend_url: Url,
}

impl JobSeekerChannel {
    /// # Errors
    /// Returns `FlowError::Config` if a base URL is invalid.
    pub fn new(client: Client, email: &str, config: &FlowConfig) -> FlowResult<Self> {
        let email = email.trim();
        let verify_url = if email.is_empty() {
            None
        } else {
            Some(api::push_segment(
                api::endpoint_url(&config.job_seeker_base_url, JOB_SEEKER_VERIFY_PATH)?,
                email,
            )?)
        };

        Ok(Self {
            client,
            verify_url,
            resend_url: api::endpoint_url(&config.resend_base_url, JOB_SEEKER_RESEND_PATH)?,
        })
    }
}

impl OtpChannel for JobSeekerChannel {
    #[instrument(skip_all)]
    async fn verify(&self, digits: &PasscodeDigits) -> FlowResult<()> {
        let Some(verify_url) = &self.verify_url else {
            return Err(FlowError::Config(MISSING_EMAIL.to_string()));
        };

        let code = passcode::join(digits);
        let body = VerifyOtpRequest {
            otp: code.expose_secret(),
        };
        let response = api::post_json(&self.client, verify_url.clone(), &body).await?;
        api::ensure_status(&response)?;

        debug!("job seeker verification accepted");

        Ok(())
    }

    #[instrument(skip_all, fields(url = %self.resend_url))]
    async fn resend(&self) -> FlowResult<()> {
        let response = api::post_empty(&self.client, self.resend_url.clone()).await?;
        api::ensure_success(response, RESEND_FALLBACK).await
    }
}

/// The channel matching a [`FlowMode`], chosen once at construction.
#[derive(Clone, Debug)]
pub enum Channel {
    Employer(EmployerChannel),
    JobSeeker(JobSeekerChannel),
}

impl Channel {
    /// Build the channel for `mode` with a fresh cookie-carrying client.
    ///
    /// # Errors
    /// Returns `FlowError::Config` for invalid configuration.
    pub fn new(mode: FlowMode, email: &str, config: &FlowConfig) -> FlowResult<Self> {
        config.validate()?;
        let client = api::build_client(config.request_timeout)?;
        Self::with_client(client, mode, email, config)
    }

    /// Build the channel on an existing client, sharing its cookie store.
    ///
    /// # Errors
    /// Returns `FlowError::Config` for an invalid base URL.
    pub fn with_client(
        client: Client,
        mode: FlowMode,
        email: &str,
        config: &FlowConfig,
    ) -> FlowResult<Self> {
        match mode {
            FlowMode::Employer => EmployerChannel::new(client, config).map(Self::Employer),
            FlowMode::JobSeeker => {
                JobSeekerChannel::new(client, email, config).map(Self::JobSeeker)
            }
        }
    }

    #[must_use]
    pub fn mode(&self) -> FlowMode {
        match self {
            Self::Employer(_) => FlowMode::Employer,
            Self::JobSeeker(_) => FlowMode::JobSeeker,
        }
    }
}

impl OtpChannel for Channel {
    async fn verify(&self, digits: &PasscodeDigits) -> FlowResult<()> {
        match self {
            Self::Employer(channel) => OtpChannel::verify(channel, digits).await,
            Self::JobSeeker(channel) => OtpChannel::verify(channel, digits).await,
        }
    }

    async fn resend(&self) -> FlowResult<()> {
        match self {
            Self::Employer(channel) => OtpChannel::resend(channel).await,
            Self::JobSeeker(channel) => OtpChannel::resend(channel).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_json, body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn code(value: &str) -> PasscodeDigits {
        let mut chars = value.chars();
        std::array::from_fn(|_| {
            SecretString::from(chars.next().map(String::from).unwrap_or_default())
        })
    }

    #[test]
    fn mode_from_flag() {
        assert_eq!(FlowMode::from_is_employer(true), FlowMode::Employer);
        assert_eq!(FlowMode::from_is_employer(false), FlowMode::JobSeeker);
        assert_eq!(FlowMode::default(), FlowMode::JobSeeker);
        assert!(FlowMode::Employer.is_employer());
        assert!(!FlowMode::JobSeeker.is_employer());
        assert_eq!(FlowMode::Employer.to_string(), "employer");
    }

    #[tokio::test]
    async fn job_seeker_without_email_cannot_verify() {
        let config = FlowConfig::default();
        let channel = Channel::new(FlowMode::JobSeeker, "  ", &config).unwrap();
        assert_eq!(channel.mode(), FlowMode::JobSeeker);

        let err = OtpChannel::verify(&channel, &code("123456")).await.unwrap_err();
        assert_eq!(err, FlowError::Config(MISSING_EMAIL.to_string()));

        // employer mode ignores the email
        let channel = Channel::new(FlowMode::Employer, "", &config).unwrap();
        assert_eq!(channel.mode(), FlowMode::Employer);
    }

    #[test]
    fn any_non_empty_email_is_accepted() {
        let config = FlowConfig::default();
        for email in ["user@localhost", "a@b.com", "first.last+tag@sub.example.org"] {
            assert!(Channel::new(FlowMode::JobSeeker, email, &config).is_ok(), "{email}");
        }
    }

    #[tokio::test]
    async fn employer_verify_posts_one_field_per_digit() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;

        let mut mock = Mock::given(method("POST"))
            .and(path(EMPLOYER_VERIFY_PATH))
            .and(header_exists("content-type"));
        for (position, digit) in ["1", "2", "3", "4", "5", "6"].iter().enumerate() {
            mock = mock.and(body_string_contains(format!(
                "name=\"otp-input{}\"\r\n\r\n{digit}\r\n",
                position + 1
            )));
        }
        mock.respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = Channel::new(
            FlowMode::Employer,
            "",
            &FlowConfig::with_base_url(&server.uri()),
        )
        .unwrap();

        OtpChannel::verify(&channel, &code("123456")).await.unwrap();
    }

    #[tokio::test]
    async fn employer_verify_keeps_slot_positions() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(EMPLOYER_VERIFY_PATH))
            .and(body_string_contains("name=\"otp-input1\"\r\n\r\n1\r\n"))
            .and(body_string_contains("name=\"otp-input2\"\r\n\r\n\r\n"))
            .and(body_string_contains("name=\"otp-input3\"\r\n\r\n3\r\n"))
            .and(body_string_contains("name=\"otp-input6\"\r\n\r\n6\r\n"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = Channel::new(
            FlowMode::Employer,
            "",
            &FlowConfig::with_base_url(&server.uri()),
        )
        .unwrap();

        let digits = ["1", "", "3", "4", "5", "6"].map(|d| SecretString::from(d.to_string()));
        OtpChannel::verify(&channel, &digits).await.unwrap();
    }

    #[tokio::test]
    async fn job_seeker_resend_needs_no_email() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(JOB_SEEKER_RESEND_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = Channel::new(
            FlowMode::JobSeeker,
            "",
            &FlowConfig::with_base_url(&server.uri()),
        )
        .unwrap();

        OtpChannel::resend(&channel).await.unwrap();
    }

    #[tokio::test]
    async fn employer_verify_failure_surfaces_error_field() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(EMPLOYER_VERIFY_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid OTP"})))
            .mount(&server)
            .await;

        let channel = Channel::new(
            FlowMode::Employer,
            "",
            &FlowConfig::with_base_url(&server.uri()),
        )
        .unwrap();

        let err = OtpChannel::verify(&channel, &code("000000")).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid OTP");
    }

    #[tokio::test]
    async fn job_seeker_verify_posts_json_to_email_url() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/user/verify-register/a@b.com"))
            .and(body_json(json!({"otp": "000000"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = Channel::new(
            FlowMode::JobSeeker,
            "a@b.com",
            &FlowConfig::with_base_url(&server.uri()),
        )
        .unwrap();

        OtpChannel::verify(&channel, &code("000000")).await.unwrap();
    }

    #[tokio::test]
    async fn job_seeker_verify_failure_names_status() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/user/verify-register/a@b.com"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "bad otp"})))
            .mount(&server)
            .await;

        let channel = Channel::new(
            FlowMode::JobSeeker,
            "a@b.com",
            &FlowConfig::with_base_url(&server.uri()),
        )
        .unwrap();

        let err = OtpChannel::verify(&channel, &code("111111")).await.unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status code 400");
    }

    #[tokio::test]
    async fn resend_endpoints_follow_mode() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(EMPLOYER_RESEND_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(JOB_SEEKER_RESEND_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let config = FlowConfig::with_base_url(&server.uri());

        let employer = Channel::new(FlowMode::Employer, "", &config).unwrap();
        OtpChannel::resend(&employer).await.unwrap();

        let job_seeker = Channel::new(FlowMode::JobSeeker, "a@b.com", &config).unwrap();
        let err = OtpChannel::resend(&job_seeker).await.unwrap_err();
        assert_eq!(err.to_string(), RESEND_FALLBACK);
    }

    #[tokio::test]
    async fn cookies_from_registration_are_sent_back() {
        if !can_bind_localhost() {
            return;
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/register"))
            .respond_with(ResponseTemplate::new(201).insert_header("set-cookie", "sid=abc; Path=/"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(EMPLOYER_RESEND_PATH))
            .and(wiremock::matchers::header("cookie", "sid=abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = FlowConfig::with_base_url(&server.uri());
        let client = api::build_client(config.request_timeout).unwrap();
        let register = api::endpoint_url(&server.uri(), "/register").unwrap();
        api::post_empty(&client, register).await.unwrap();

        let channel = Channel::with_client(client, FlowMode::Employer, "", &config).unwrap();
        OtpChannel::resend(&channel).await.unwrap();
    }
}
