use std::path::PathBuf;
use std::time::Duration;

use botlink_command::CommandCode;
use botlink_transport::{Link, LinkConfig, UnixDomainSocket};
use clap::{Args, Subcommand};

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod probe;
pub mod send;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulated robot on a Unix socket.
    Simulate(SimulateArgs),
    /// Send one command frame and print the reply.
    Send(SendArgs),
    /// Send a single non-sentinel byte and print the robot's echo.
    Probe(ProbeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Simulate(args) => simulate::run(args),
        Command::Send(args) => send::run(args, format),
        Command::Probe(args) => probe::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// BEEP tone length in milliseconds.
    #[arg(long, default_value = "100")]
    pub tone_ms: u64,
    /// Write "in Main" after every listen cycle, like the firmware's main loop.
    #[arg(long)]
    pub banner: bool,
    /// Exit after executing N commands (at least 1).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub cycles: Option<u64>,
    /// Stream a telemetry block with the RGB565 frame after every PIC.
    #[arg(long)]
    pub stream_images: bool,
    /// Half the side length of the simulated square room.
    #[arg(long, default_value = "1000")]
    pub room_half_width_mm: f32,
}

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Unix socket path, or serial device with --serial.
    pub path: PathBuf,
    /// Treat PATH as a serial device node (e.g. /dev/ttyACM0).
    #[arg(long)]
    pub serial: bool,
    /// Reply timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Command code: CLR, PIC, POS, MOVE, STOP, SCAN or BEEP.
    pub code: CommandCode,
    /// After PIC, wait for the streamed image block (simulator
    /// `--stream-images`, or firmware with its image thread enabled).
    #[arg(long)]
    pub image: bool,
    /// Payload: CLR X Y HEADING | BEEP FREQ | MOVE LEFT:RIGHT:MS...
    #[arg(allow_hyphen_values = true, num_args = 0..)]
    pub params: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Byte to send: a single character or hex such as 0x41.
    pub byte: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Open the link named by `args` and apply the reply timeout.
pub fn open_link(args: &LinkArgs) -> CliResult<Link> {
    let timeout = parse_duration(&args.timeout)?;
    let opened = if args.serial {
        Link::open_serial(&args.path)
    } else {
        UnixDomainSocket::connect(&args.path)
    };
    let link = opened.map_err(|err| transport_error("connect failed", err))?;

    link.configure(&LinkConfig {
        read_timeout: Some(timeout),
        write_timeout: Some(timeout),
    })
    .map_err(|err| transport_error("configure failed", err))?;
    Ok(link)
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
