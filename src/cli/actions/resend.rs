use crate::cli::globals::GlobalArgs;
use crate::otp::{flow::RESEND_SUCCESS, FlowConfig, FlowMode, OtpFlow};
use anyhow::{anyhow, Context, Result};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
}

/// Request a new passcode right away, without waiting for a cooldown.
/// Returns the message shown to the user.
async fn request(mode: FlowMode, email: &str, config: FlowConfig) -> Result<String> {
    let config = FlowConfig {
        initial_cooldown_secs: 0,
        ..config
    };

    let flow = OtpFlow::builder(mode)
        .email(email)
        .config(config)
        .build()
        .context("failed to start verification flow")?;

    let result = flow.resend().await;
    let snapshot = flow.snapshot();
    flow.close();

    match result {
        Ok(()) => Ok(snapshot
            .success
            .unwrap_or_else(|| RESEND_SUCCESS.to_string())),
        Err(err) => Err(anyhow!(snapshot.error.unwrap_or_else(|| err.to_string()))),
    }
}

/// Execute the resend action.
/// # Errors
/// Returns an error if the backend refuses to send a new code.
pub async fn execute(args: Args) -> Result<()> {
    let GlobalArgs {
        mode,
        email,
        config,
    } = args.globals;

    let message = request(mode, &email, config).await?;

    info!("{} code resent", mode);
    println!("{message}");

    Ok(())
}
