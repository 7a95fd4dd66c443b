//! Byte links between a host computer and the robot command interface.
//!
//! The protocol layers above only need a blocking `Read + Write` channel.
//! This crate provides the concrete ones:
//! - Unix domain sockets (simulated robot on the same machine)
//! - Serial device nodes such as `/dev/ttyACM0` (real hardware)
//!
//! Everything else builds on top of the [`Link`] type provided here.

pub mod error;
pub mod link;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use link::{Link, LinkConfig, DEFAULT_BAUD_RATE};

#[cfg(unix)]
pub use uds::UnixDomainSocket;
