//! Interactive passcode entry on the terminal.
//!
//! Each input line is a batch of keystrokes for the focused slot onwards; a
//! line holding a whole code retypes it from the first slot. `<` is a
//! backspace, `resend` asks for a new code once the cooldown is over, `quit`
//! (or EOF / Ctrl-C) dismisses the flow. A complete code is
//! submitted right away, mirroring a form whose six inputs are all required.

use crate::cli::globals::GlobalArgs;
use crate::otp::{FlowError, FlowMode, FlowSnapshot, OtpChannel, OtpFlow, PASSCODE_LENGTH};
use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
}

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Keys(&'a str),
    Backspace,
    Resend,
    Quit,
    Refresh,
}

fn parse_input(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Refresh,
        "<" => Input::Backspace,
        "resend" | "r" => Input::Resend,
        "quit" | "q" | "exit" => Input::Quit,
        keys => Input::Keys(keys),
    }
}

/// Type a line of keys into the flow. A whole code replaces whatever the
/// slots held, anything shorter continues from the focused slot.
fn apply_keys<C>(flow: &OtpFlow<C>, keys: &str) -> usize
where
    C: OtpChannel + Send + Sync + 'static,
{
    if keys.len() == PASSCODE_LENGTH && keys.bytes().all(|b| b.is_ascii_digit()) {
        flow.replace(keys)
    } else {
        flow.fill(keys)
    }
}

/// Render the six slots, the focus marker and the status line.
fn render(snapshot: &FlowSnapshot) -> String {
    let mut out: String = snapshot
        .digits
        .iter()
        .enumerate()
        .map(|(index, digit)| {
            let value = if digit.is_empty() { "_" } else { digit };
            if index == snapshot.focus {
                format!("[{value}]")
            } else {
                format!(" {value} ")
            }
        })
        .collect();

    if snapshot.verifying {
        out.push_str("  verifying...");
    }
    if snapshot.resending {
        out.push_str("  resending...");
    }

    if snapshot.resend_disabled {
        out.push_str(&format!("  resend in {}s", snapshot.remaining_secs));
    } else {
        out.push_str("  resend available");
    }

    if let Some(error) = &snapshot.error {
        out.push_str(&format!("\n  error: {error}"));
    }
    if let Some(success) = &snapshot.success {
        out.push_str(&format!("\n  {success}"));
    }

    out
}

/// Execute the verify action.
/// # Errors
/// Returns an error if the flow cannot be built or stdin fails.
pub async fn execute(args: Args) -> Result<()> {
    let GlobalArgs {
        mode,
        email,
        config,
    } = args.globals;

    let flow = OtpFlow::builder(mode)
        .email(email.clone())
        .config(config)
        .on_success(|| println!("Registration verified."))
        .on_close(|| println!("Verification closed."))
        .build()
        .context("failed to start verification flow")?;

    match mode {
        FlowMode::JobSeeker => println!("Enter the 6 digit code sent to {email}."),
        FlowMode::Employer => println!("Enter the 6 digit code sent to your company email."),
    }
    println!("Type digits, '<' for backspace, 'resend' for a new code, 'quit' to leave.");
    println!("{}", render(&flow.snapshot()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };

        let Some(line) = line else {
            debug!("input closed");
            flow.close();
            break;
        };

        match parse_input(&line) {
            Input::Quit => {
                flow.close();
                break;
            }
            Input::Refresh => {}
            Input::Backspace => flow.backspace(),
            Input::Resend => {
                if flow.can_resend() {
                    // the message lands in the snapshot either way
                    let _ = flow.resend().await;
                } else {
                    println!(
                        "Resend available in {} seconds.",
                        flow.snapshot().remaining_secs
                    );
                }
            }
            Input::Keys(keys) => {
                apply_keys(&flow, keys);

                if flow.snapshot().is_complete() {
                    let result = tokio::select! {
                        result = flow.submit() => result,
                        _ = tokio::signal::ctrl_c() => {
                            flow.close();
                            Err(FlowError::Cancelled)
                        }
                    };

                    match result {
                        Ok(()) => {
                            info!("{} registration verified", mode);
                            if mode.is_employer() {
                                println!("Employer verification accepted.");
                            }
                            break;
                        }
                        Err(FlowError::Cancelled) => break,
                        Err(err) => debug!("verification failed: {err}"),
                    }
                }
            }
        }

        println!("{}", render(&flow.snapshot()));
    }

    Ok(())
}
