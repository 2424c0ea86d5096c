//! # otp-flow
//!
//! One-time passcode verification for job board registrations. After a job
//! seeker or an employer submits the registration form, the backend emails a
//! six digit code; this crate models the screen that collects it.
//!
//! The flow is headless: [`otp::OtpFlow`] owns the passcode slots, the focus
//! position, the resend cooldown and the in-flight flags, and exposes a
//! [`otp::FlowSnapshot`] for whatever renders it. The `otp-flow` binary is a
//! terminal renderer on top of it.
//!
//! ## Backends
//!
//! Job seekers and employers are served by different backend services, with
//! different wire formats:
//!
//! | Mode       | Verify                                        | Resend                 |
//! |------------|-----------------------------------------------|------------------------|
//! | Employer   | multipart `otp-input1..6` to `/verify-otp-employer` | `/resend-otp-employer` |
//! | Job seeker | JSON `{"otp"}` to `/api/user/verify-register/{email}` | `/resend-otp`          |
//!
//! Both channels share one cookie store, so session cookies issued during
//! registration travel with every request.

pub mod cli;
pub mod otp;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
