//! OTP verification flow: passcode capture, resend cooldown and the two
//! backend channels, tied together by [`OtpFlow`].

pub mod api;
pub mod channel;
pub mod config;
pub mod countdown;
pub mod errors;
pub mod flow;
pub mod passcode;

pub use self::channel::{Channel, EmployerChannel, FlowMode, JobSeekerChannel, OtpChannel};
pub use self::config::{ConfigOverrides, FlowConfig};
pub use self::countdown::{Countdown, CountdownTimer};
pub use self::errors::{FlowError, FlowResult};
pub use self::flow::{FlowSnapshot, OtpFlow, OtpFlowBuilder};
pub use self::passcode::{PasscodeDigits, PasscodeEntry, PASSCODE_LENGTH};
