mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "botlink", version, about = "Robot serial command link")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level for botlink's own targets (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "BOTLINK_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use botlink_command::CommandCode;

    use super::*;

    #[test]
    fn parses_send_with_negative_params() {
        let cli = Cli::try_parse_from([
            "botlink", "send", "/tmp/bot.sock", "CLR", "-10.5", "20", "-1.57",
        ])
        .expect("send args should parse");

        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.code, CommandCode::Clear);
        assert_eq!(args.params, vec!["-10.5", "20", "-1.57"]);
        assert!(!args.link.serial);
    }

    #[test]
    fn parses_send_over_serial() {
        let cli = Cli::try_parse_from([
            "botlink",
            "send",
            "--serial",
            "/dev/ttyACM0",
            "MOVE",
            "500:500:1000",
        ])
        .expect("serial send should parse");

        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert!(args.link.serial);
        assert_eq!(args.code, CommandCode::Move);
    }

    #[test]
    fn rejects_unknown_code() {
        let err = Cli::try_parse_from(["botlink", "send", "/tmp/bot.sock", "XYZQ"])
            .expect_err("unknown code should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_simulate_defaults() {
        let cli = Cli::try_parse_from(["botlink", "simulate", "/tmp/bot.sock"])
            .expect("simulate args should parse");

        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.tone_ms, 100);
        assert_eq!(args.cycles, None);
        assert!(!args.banner);
    }

    #[test]
    fn simulate_rejects_zero_cycles() {
        let err = Cli::try_parse_from(["botlink", "simulate", "/tmp/bot.sock", "--cycles", "0"])
            .expect_err("zero cycles should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let cli = Cli::try_parse_from(["botlink", "simulate", "/tmp/bot.sock", "--cycles", "1"])
            .expect("one cycle should parse");
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.cycles, Some(1));
    }

    #[test]
    fn parses_probe_subcommand() {
        let cli = Cli::try_parse_from([
            "botlink",
            "probe",
            "/tmp/bot.sock",
            "0x41",
            "--timeout",
            "1s",
        ])
        .expect("probe args should parse");
        assert!(matches!(cli.command, Command::Probe(_)));
    }
}
