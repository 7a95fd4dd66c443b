use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// Baud rate of the robot's serial port.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Timeouts applied to a freshly opened link.
#[derive(Debug, Clone, Default)]
pub struct LinkConfig {
    /// Read timeout for blocking operations. `None` blocks forever.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations. `None` blocks forever.
    pub write_timeout: Option<Duration>,
}

/// A connected byte link. Implements Read + Write.
///
/// On the simulator side this wraps a Unix domain socket stream.
/// Against real hardware it wraps a serial device node in raw mode.
pub struct Link {
    inner: LinkInner,
}

enum LinkInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Serial(SerialPort),
}

/// A serial device node plus the timeouts the OS cannot attach to it.
///
/// Sockets carry `SO_RCVTIMEO`; a tty fd does not, so each transfer first
/// waits for readiness with `poll(2)` and fails with `TimedOut` when the
/// deadline passes.
struct SerialPort {
    file: File,
    read_timeout: std::cell::Cell<Option<Duration>>,
    write_timeout: std::cell::Cell<Option<Duration>>,
}

impl SerialPort {
    fn new(file: File) -> Self {
        Self {
            file,
            read_timeout: std::cell::Cell::new(None),
            write_timeout: std::cell::Cell::new(None),
        }
    }

    fn try_clone(&self) -> std::io::Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            read_timeout: self.read_timeout.clone(),
            write_timeout: self.write_timeout.clone(),
        })
    }

    #[cfg(unix)]
    fn wait(&self, readable: bool, timeout: Option<Duration>) -> std::io::Result<()> {
        match timeout {
            Some(timeout) => wait_ready(&self.file, readable, timeout),
            None => Ok(()),
        }
    }

    #[cfg(not(unix))]
    fn wait(&self, _readable: bool, _timeout: Option<Duration>) -> std::io::Result<()> {
        Ok(())
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.wait(true, self.read_timeout.get())?;
        self.file.read(buf)
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.wait(false, self.write_timeout.get())?;
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl Read for Link {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkInner::Unix(stream) => stream.read(buf),
            LinkInner::Serial(port) => port.read(buf),
        }
    }
}

impl Write for Link {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkInner::Unix(stream) => stream.write(buf),
            LinkInner::Serial(port) => port.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            LinkInner::Unix(stream) => stream.flush(),
            LinkInner::Serial(port) => port.flush(),
        }
    }
}

impl Link {
    /// Create a link from a Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: LinkInner::Unix(stream),
        }
    }

    /// Open a serial device node (e.g. `/dev/ttyACM0`) for reading and writing.
    ///
    /// On Unix the terminal is switched to raw mode at [`DEFAULT_BAUD_RATE`] so
    /// binary payloads pass through untouched.
    pub fn open_serial(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| TransportError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        #[cfg(unix)]
        make_raw(&file).map_err(|source| TransportError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(?path, "opened serial device");
        Ok(Self {
            inner: LinkInner::Serial(SerialPort::new(file)),
        })
    }

    /// Apply the timeouts from `config`.
    pub fn configure(&self, config: &LinkConfig) -> Result<()> {
        self.set_read_timeout(config.read_timeout)?;
        self.set_write_timeout(config.write_timeout)
    }

    /// Set read timeout on the underlying stream.
    ///
    /// Expiry surfaces as `WouldBlock` on sockets and `TimedOut` on serial
    /// devices.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        check_timeout(timeout)?;
        match &self.inner {
            #[cfg(unix)]
            LinkInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            LinkInner::Serial(port) => {
                port.read_timeout.set(timeout);
                Ok(())
            }
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        check_timeout(timeout)?;
        match &self.inner {
            #[cfg(unix)]
            LinkInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            LinkInner::Serial(port) => {
                port.write_timeout.set(timeout);
                Ok(())
            }
        }
    }

    /// Try to clone this link (creates a new file descriptor).
    ///
    /// Used to hand the dispatcher separate input and output handles. A
    /// cloned serial link starts with the timeouts of the original.
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            LinkInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
            LinkInner::Serial(port) => Ok(Self {
                inner: LinkInner::Serial(port.try_clone()?),
            }),
        }
    }

    /// Link kind for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            LinkInner::Unix(_) => "unix",
            LinkInner::Serial(_) => "serial",
        }
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").field("type", &self.kind()).finish()
    }
}

// Sockets reject a zero timeout; serial links follow the same rule.
fn check_timeout(timeout: Option<Duration>) -> Result<()> {
    if timeout == Some(Duration::ZERO) {
        return Err(TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "cannot set a 0 duration timeout",
        )));
    }
    Ok(())
}

/// Block until `file` is ready for the requested direction or `timeout`
/// elapses.
#[cfg(unix)]
fn wait_ready(file: &File, readable: bool, timeout: Duration) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;
    use std::time::Instant;

    let deadline = Instant::now() + timeout;
    let mut pollfd = libc::pollfd {
        fd: file.as_raw_fd(),
        events: if readable { libc::POLLIN } else { libc::POLLOUT },
        revents: 0,
    };

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        // Round up so a sub-millisecond remainder still waits.
        let millis = remaining.as_nanos().div_ceil(1_000_000);
        let millis = libc::c_int::try_from(millis).unwrap_or(libc::c_int::MAX);

        // SAFETY: `pollfd` is a valid, initialized array of length 1 and the
        // descriptor stays open for the duration of the call.
        let ready = unsafe { libc::poll(&mut pollfd, 1, millis) };
        match ready {
            0 => {
                let direction = if readable { "read" } else { "write" };
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("serial {direction} timed out after {timeout:?}"),
                ));
            }
            n if n > 0 => return Ok(()),
            _ => {
                let err = std::io::Error::last_os_error();
                if err.kind() != std::io::ErrorKind::Interrupted {
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(unix)]
fn make_raw(file: &File) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;

    let fd = file.as_raw_fd();

    // SAFETY: isatty only inspects the descriptor, which `file` keeps open.
    if unsafe { libc::isatty(fd) } != 1 {
        // Plain files and pipes are accepted as-is (handy for captures).
        return Ok(());
    }

    // SAFETY: `termios` is plain old data and fully written by tcgetattr
    // before any field is read.
    let mut termios: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: `fd` is an open terminal and `termios` is a valid writable pointer.
    if unsafe { libc::tcgetattr(fd, &mut termios) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `termios` was initialized by tcgetattr above.
    unsafe {
        libc::cfmakeraw(&mut termios);
        libc::cfsetispeed(&mut termios, libc::B115200);
        libc::cfsetospeed(&mut termios, libc::B115200);
    }

    // SAFETY: `fd` is an open terminal and `termios` is fully initialized.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn unix_link_roundtrip_and_clone() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut host = Link::from_unix(left);
        let robot = Link::from_unix(right);
        let mut robot_in = robot.try_clone().unwrap();

        host.write_all(b"!POS").unwrap();
        let mut buf = [0u8; 4];
        robot_in.read_exact(&mut buf).unwrap();

        assert_eq!(&buf, b"!POS");
        assert_eq!(robot.kind(), "unix");
    }

    #[test]
    #[cfg(unix)]
    fn read_timeout_applies_to_unix_link() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut link = Link::from_unix(left);
        link.configure(&LinkConfig {
            read_timeout: Some(Duration::from_millis(20)),
            write_timeout: None,
        })
        .unwrap();

        let mut buf = [0u8; 1];
        let err = link.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn open_serial_accepts_regular_file() {
        let path = std::env::temp_dir().join(format!("botlink-serial-{}", std::process::id()));
        std::fs::write(&path, b"!PIC").unwrap();

        let mut link = Link::open_serial(&path).unwrap();
        let mut buf = [0u8; 4];
        link.read_exact(&mut buf).unwrap();

        assert_eq!(&buf, b"!PIC");
        assert_eq!(link.kind(), "serial");
        link.set_read_timeout(Some(Duration::from_secs(1))).unwrap();

        let _ = std::fs::remove_file(&path);
    }

    /// Open a pseudo-terminal and return the master side plus the path of
    /// the slave, which behaves like a serial device node.
    #[cfg(unix)]
    fn open_pty() -> (File, std::path::PathBuf) {
        use std::os::fd::FromRawFd;

        unsafe {
            let master = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
            assert!(master >= 0, "posix_openpt failed");
            assert_eq!(libc::grantpt(master), 0);
            assert_eq!(libc::unlockpt(master), 0);
            let name = libc::ptsname(master);
            assert!(!name.is_null(), "ptsname failed");
            let path = std::ffi::CStr::from_ptr(name).to_str().unwrap().into();
            (File::from_raw_fd(master), path)
        }
    }

    #[test]
    #[cfg(unix)]
    fn serial_read_timeout_expires() {
        let (_master, slave) = open_pty();
        let mut link = Link::open_serial(&slave).unwrap();
        link.configure(&LinkConfig {
            read_timeout: Some(Duration::from_millis(200)),
            write_timeout: None,
        })
        .unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let started = std::time::Instant::now();
            let mut buf = [0u8; 1];
            let result = link.read(&mut buf);
            let _ = tx.send((result.map_err(|err| err.kind()), started.elapsed()));
        });

        let (result, elapsed) = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("serial read should give up after its timeout");
        assert_eq!(result, Err(std::io::ErrorKind::TimedOut));
        assert!(elapsed >= Duration::from_millis(200), "returned after {elapsed:?}");
    }

    #[test]
    #[cfg(unix)]
    fn serial_read_with_timeout_returns_pending_bytes() {
        let (mut master, slave) = open_pty();
        let mut link = Link::open_serial(&slave).unwrap();
        link.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        master.write_all(b"!POS").unwrap();
        let mut buf = [0u8; 4];
        link.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"!POS");

        // A clone starts with the original's timeout.
        link.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
        let mut clone = link.try_clone().unwrap();
        let mut byte = [0u8; 1];
        let err = clone.read(&mut byte).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let path = std::env::temp_dir().join(format!("botlink-zero-{}", std::process::id()));
        std::fs::write(&path, b"").unwrap();

        let link = Link::open_serial(&path).unwrap();
        let err = link.set_read_timeout(Some(Duration::ZERO)).unwrap_err();
        assert!(matches!(err, TransportError::Io(e) if e.kind() == std::io::ErrorKind::InvalidInput));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn open_serial_missing_device() {
        let result = Link::open_serial("/nonexistent/botlink/ttyACM9");
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }
}
