use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    Command::new("otp-flow")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("verify")
                .about("Enter the emailed passcode and verify the registration"),
        )
        .subcommand(Command::new("resend").about("Ask the backend to email a new passcode"))
        .arg(
            Arg::new("employer")
                .long("employer")
                .help("Verify an employer registration instead of a job seeker one")
                .env("OTP_FLOW_EMPLOYER")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("email")
                .short('e')
                .long("email")
                .help("Email address the passcode was sent to (job seekers)")
                .env("OTP_FLOW_EMAIL")
                .global(true),
        )
        .arg(
            Arg::new("employer-url")
                .long("employer-url")
                .help("Employer service base URL")
                .default_value("http://localhost:8080")
                .env("OTP_FLOW_EMPLOYER_URL")
                .global(true),
        )
        .arg(
            Arg::new("job-seeker-url")
                .long("job-seeker-url")
                .help("Job seeker registration API base URL")
                .default_value("http://localhost:5000")
                .env("OTP_FLOW_JOB_SEEKER_URL")
                .global(true),
        )
        .arg(
            Arg::new("resend-url")
                .long("resend-url")
                .help("Base URL serving the job seeker resend endpoint")
                .default_value("http://localhost:8080")
                .env("OTP_FLOW_RESEND_URL")
                .global(true),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .help("Request timeout in seconds")
                .default_value("10")
                .env("OTP_FLOW_TIMEOUT")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("initial-cooldown")
                .long("initial-cooldown")
                .help("Seconds before the first resend is allowed")
                .default_value("180")
                .env("OTP_FLOW_INITIAL_COOLDOWN")
                .global(true)
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("resend-cooldown")
                .long("resend-cooldown")
                .help("Seconds before another resend is allowed after a successful one")
                .default_value("60")
                .env("OTP_FLOW_RESEND_COOLDOWN")
                .global(true)
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("notify-employer-success")
                .long("notify-employer-success")
                .help("Report employer verifications through the success callback")
                .env("OTP_FLOW_NOTIFY_EMPLOYER_SUCCESS")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .help("Emit logs as JSON")
                .env("OTP_FLOW_LOG_JSON")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("OTP_FLOW_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "otp-flow");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some(env!("CARGO_PKG_DESCRIPTION").to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("OTP_FLOW_EMPLOYER", None::<&str>),
                ("OTP_FLOW_EMAIL", None),
                ("OTP_FLOW_EMPLOYER_URL", None),
                ("OTP_FLOW_JOB_SEEKER_URL", None),
                ("OTP_FLOW_RESEND_URL", None),
                ("OTP_FLOW_TIMEOUT", None),
                ("OTP_FLOW_INITIAL_COOLDOWN", None),
                ("OTP_FLOW_RESEND_COOLDOWN", None),
                ("OTP_FLOW_LOG_LEVEL", None),
            ],
            || {
                let matches = new().get_matches_from(vec!["otp-flow", "verify"]);

                assert_eq!(matches.subcommand_name(), Some("verify"));
                assert!(!matches.get_flag("employer"));
                assert_eq!(matches.get_one::<String>("email"), None);
                assert_eq!(
                    matches.get_one::<String>("employer-url").cloned(),
                    Some("http://localhost:8080".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("job-seeker-url").cloned(),
                    Some("http://localhost:5000".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("resend-url").cloned(),
                    Some("http://localhost:8080".to_string())
                );
                assert_eq!(matches.get_one::<u64>("timeout").copied(), Some(10));
                assert_eq!(matches.get_one::<u32>("initial-cooldown").copied(), Some(180));
                assert_eq!(matches.get_one::<u32>("resend-cooldown").copied(), Some(60));
            },
        );
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let matches = new().get_matches_from(vec![
            "otp-flow",
            "verify",
            "--employer",
            "--employer-url",
            "https://employers.jobboard.dev",
            "--timeout",
            "3",
        ]);

        let (name, sub_m) = matches.subcommand().unwrap();
        assert_eq!(name, "verify");
        assert!(sub_m.get_flag("employer"));
        assert_eq!(
            sub_m.get_one::<String>("employer-url").cloned(),
            Some("https://employers.jobboard.dev".to_string())
        );
        assert_eq!(sub_m.get_one::<u64>("timeout").copied(), Some(3));
    }

    #[test]
    fn test_subcommand_is_required() {
        let result = new().try_get_matches_from(vec!["otp-flow", "--employer"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result = new().try_get_matches_from(vec!["otp-flow", "resend", "--timeout", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("OTP_FLOW_EMAIL", Some("a@b.com")),
                ("OTP_FLOW_JOB_SEEKER_URL", Some("https://users.jobboard.dev")),
                ("OTP_FLOW_EMPLOYER", Some("true")),
                ("OTP_FLOW_RESEND_COOLDOWN", Some("30")),
                ("OTP_FLOW_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["otp-flow", "resend"]);
                assert_eq!(
                    matches.get_one::<String>("email").cloned(),
                    Some("a@b.com".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>("job-seeker-url").cloned(),
                    Some("https://users.jobboard.dev".to_string())
                );
                assert!(matches.get_flag("employer"));
                assert_eq!(matches.get_one::<u32>("resend-cooldown").copied(), Some(30));
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("OTP_FLOW_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(vec!["otp-flow", "verify"]);
                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(u8::try_from(index).unwrap())
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5usize {
            temp_env::with_vars([("OTP_FLOW_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["otp-flow".to_string(), "verify".to_string()];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(u8::try_from(index).unwrap())
                );
            });
        }
    }
}
