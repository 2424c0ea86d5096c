use crate::cli::{
    actions::{resend, verify, Action},
    globals::GlobalArgs,
};
use crate::otp::{
    config::{apply_overrides, ConfigOverrides},
    FlowMode,
};
use anyhow::{anyhow, Context, Result};
use std::time::Duration;

/// # Errors
/// Returns an error if no subcommand was given or the arguments are inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let (name, sub_m) = matches
        .subcommand()
        .context("missing subcommand: verify or resend")?;

    let globals = globals(sub_m)?;

    match name {
        "verify" => {
            if !globals.mode.is_employer() && globals.email.is_empty() {
                return Err(anyhow!(
                    "missing argument: --email (required to verify a job seeker registration)"
                ));
            }
            Ok(Action::Verify(verify::Args { globals }))
        }
        "resend" => Ok(Action::Resend(resend::Args { globals })),
        other => Err(anyhow!("unknown subcommand: {other}")),
    }
}

fn globals(matches: &clap::ArgMatches) -> Result<GlobalArgs> {
    let mode = FlowMode::from_is_employer(matches.get_flag("employer"));
    let mut globals = GlobalArgs::new(mode);

    if let Some(email) = matches.get_one::<String>("email") {
        globals.set_email(email);
    }

    let overrides = ConfigOverrides {
        employer_base_url: matches.get_one::<String>("employer-url").cloned(),
        job_seeker_base_url: matches.get_one::<String>("job-seeker-url").cloned(),
        resend_base_url: matches.get_one::<String>("resend-url").cloned(),
        initial_cooldown_secs: matches.get_one::<u32>("initial-cooldown").copied(),
        resend_cooldown_secs: matches.get_one::<u32>("resend-cooldown").copied(),
        request_timeout: matches
            .get_one::<u64>("timeout")
            .copied()
            .map(Duration::from_secs),
        notify_employer_success: Some(matches.get_flag("notify-employer-success")),
    };
    apply_overrides(&mut globals.config, overrides);

    globals
        .config
        .validate()
        .context("invalid endpoint configuration")?;

    Ok(globals)
}
