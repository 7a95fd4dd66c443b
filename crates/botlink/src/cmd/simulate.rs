use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use botlink::sim::SimRobot;
use botlink_command::{Cycle, DispatcherConfig, Robot};
use botlink_transport::{Link, UnixDomainSocket};
use tracing::{debug, info, warn};

use crate::cmd::SimulateArgs;
use crate::exit::{transport_error, CliError, CliResult, INTERNAL, SUCCESS};

/// Written after every listen cycle with `--banner`.
const BANNER: &[u8] = b"in Main\r\n";

/// Exit code for a second Ctrl-C while a host is still connected.
const INTERRUPTED: i32 = 130;

enum Session {
    /// Host went away or the stream broke; accept the next one.
    Ended,
    /// `--cycles` reached or shutdown requested.
    Finished,
}

pub fn run(args: SimulateArgs) -> CliResult<i32> {
    let socket =
        UnixDomainSocket::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone(), args.path.clone())?;

    let mut sim = SimRobot::new();
    sim.lidar.set_room_half_width(args.room_half_width_mm);
    let config = DispatcherConfig {
        tone_duration: Duration::from_millis(args.tone_ms),
    };

    info!(path = %socket.path().display(), "simulated robot listening");

    let mut executed = 0u64;
    while running.load(Ordering::SeqCst) {
        let link = socket
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        if !running.load(Ordering::SeqCst) {
            break;
        }
        info!("host connected");

        if args.stream_images {
            let images = link
                .try_clone()
                .map_err(|err| transport_error("link clone failed", err))?;
            sim.camera.set_sink(Some(Box::new(images)));
        }

        let mut robot = sim.robot(config.clone());
        let session = serve(&mut robot, link, &args, &running, &mut executed)?;
        sim.camera.set_sink(None);
        match session {
            Session::Ended => info!("host disconnected"),
            Session::Finished => break,
        }
    }

    info!(
        executed,
        segments = sim.motion.segments_run(),
        scans = sim.lidar.scans(),
        captures = sim.camera.captures(),
        "simulated robot stopped"
    );
    Ok(SUCCESS)
}

fn serve(
    robot: &mut Robot<'_>,
    link: Link,
    args: &SimulateArgs,
    running: &AtomicBool,
    executed: &mut u64,
) -> CliResult<Session> {
    let mut output = link
        .try_clone()
        .map_err(|err| transport_error("link clone failed", err))?;
    let mut input = link;

    while running.load(Ordering::SeqCst) {
        match robot.listen(&mut input, &mut output) {
            Ok(Cycle::Executed(code)) => {
                *executed += 1;
                debug!(%code, executed = *executed, "command executed");
            }
            Ok(Cycle::Probe(byte)) => debug!(byte, "probe echoed"),
            Ok(Cycle::Invalid(bytes)) => {
                warn!(code = %String::from_utf8_lossy(&bytes), "unknown command code")
            }
            Err(err) if err.is_disconnect() => return Ok(Session::Ended),
            Err(err) => {
                warn!(error = %err, "listen cycle failed, dropping host");
                return Ok(Session::Ended);
            }
        }

        let written = if args.banner {
            output.write_all(BANNER).and_then(|()| output.flush())
        } else {
            output.flush()
        };
        if let Err(err) = written {
            debug!(error = %err, "write after cycle failed");
            return Ok(Session::Ended);
        }

        if args.cycles.is_some_and(|limit| *executed >= limit) {
            return Ok(Session::Finished);
        }
    }
    Ok(Session::Finished)
}

/// First Ctrl-C stops after the current cycle. A blocked `accept` is woken by
/// connecting to our own socket. A second Ctrl-C exits immediately.
fn install_ctrlc_handler(running: Arc<AtomicBool>, path: PathBuf) -> CliResult<()> {
    ctrlc::set_handler(move || {
        if running.swap(false, Ordering::SeqCst) {
            let _ = UnixStream::connect(&path);
        } else {
            let _ = std::fs::remove_file(&path);
            std::process::exit(INTERRUPTED);
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
