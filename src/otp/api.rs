//! HTTP helpers for the verification backends with consistent timeouts and
//! error handling. Both channels of a flow share one client so cookies set by
//! the registration step are sent along ("credentials: include"). The helpers
//! never see the passcode in a loggable form; callers pass request bodies
//! already built.

use super::errors::{FlowError, FlowResult};
use crate::APP_USER_AGENT;
use reqwest::{multipart::Form, Client, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Maximum number of error characters surfaced to the user.
const MAX_ERROR_CHARS: usize = 200;

/// Build the cookie-carrying client shared by a flow's channels.
///
/// # Errors
/// Returns `FlowError::Config` if the TLS backend cannot be initialized.
pub fn build_client(timeout: Duration) -> FlowResult<Client> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .cookie_store(true)
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()
        .map_err(|err| FlowError::Config(format!("Failed to build HTTP client: {err}")))
}

/// Joins a base URL and a path without doubling or dropping slashes.
pub fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

/// Parsed endpoint URL for `path` under `base_url`.
///
/// # Errors
/// Returns `FlowError::Config` when the result is not a valid URL.
pub fn endpoint_url(base_url: &str, path: &str) -> FlowResult<Url> {
    let raw = build_url_with_base(base_url, path);
    Url::parse(&raw).map_err(|err| FlowError::Config(format!("Invalid endpoint {raw:?}: {err}")))
}

/// Append one path segment, escaping anything that would split it.
///
/// # Errors
/// Returns `FlowError::Config` for URLs that cannot carry a path.
pub fn push_segment(mut url: Url, segment: &str) -> FlowResult<Url> {
    if url.cannot_be_a_base() {
        return Err(FlowError::Config(format!("URL {url} cannot be a base")));
    }

    url.path_segments_mut()
        .map_err(|()| FlowError::Config("URL cannot be a base".to_string()))?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}

/// POST without a body.
///
/// # Errors
/// Returns `FlowError::Network` or `FlowError::Timeout` when no response arrives.
pub async fn post_empty(client: &Client, url: Url) -> FlowResult<Response> {
    debug!("POST {}", url);
    client.post(url).send().await.map_err(map_request_error)
}

/// POST a JSON body.
///
/// # Errors
/// Returns `FlowError::Network` or `FlowError::Timeout` when no response arrives.
pub async fn post_json<B: Serialize + ?Sized>(
    client: &Client,
    url: Url,
    body: &B,
) -> FlowResult<Response> {
    debug!("POST {} (json)", url);
    client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(map_request_error)
}

/// POST a multipart form.
///
/// # Errors
/// Returns `FlowError::Network` or `FlowError::Timeout` when no response arrives.
pub async fn post_multipart(client: &Client, url: Url, form: Form) -> FlowResult<Response> {
    debug!("POST {} (multipart)", url);
    client
        .post(url)
        .multipart(form)
        .send()
        .await
        .map_err(map_request_error)
}

/// Accept 2xx; otherwise surface the `error` field of the JSON payload, or
/// `fallback` when there is none.
///
/// # Errors
/// Returns `FlowError::Http` for non-success statuses.
pub async fn ensure_success(response: Response, fallback: &str) -> FlowResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    let message = json_error_message(&body).unwrap_or_else(|| fallback.to_string());

    Err(FlowError::Http {
        status: status.as_u16(),
        message,
    })
}

/// Accept 2xx; otherwise fail with a message naming only the status code.
///
/// # Errors
/// Returns `FlowError::Http` for non-success statuses.
pub fn ensure_status(response: &Response) -> FlowResult<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(FlowError::Http {
            status: status.as_u16(),
            message: format!("Request failed with status code {}", status.as_u16()),
        })
    }
}

/// The `error` field of a JSON error payload, trimmed and truncated.
pub fn json_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.get("error")
        .and_then(Value::as_str)
        .and_then(sanitize_message)
}

/// Maps transport errors into user-facing variants with timeout detection.
fn map_request_error(err: reqwest::Error) -> FlowError {
    if err.is_timeout() {
        FlowError::Timeout("Request timed out. Please try again.".to_string())
    } else {
        FlowError::Network(format!("Unable to reach the server: {err}"))
    }
}

fn sanitize_message(message: &str) -> Option<String> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(MAX_ERROR_CHARS).collect())
    }
}
