//! Sentinel-framed command parsing and dispatch for the robot interface.
//!
//! A command frame is the sentinel `'!'`, a 3- or 4-byte ASCII code and a
//! payload whose shape is fixed by the code. There is no length field and no
//! checksum: a sentinel seen where a code byte was expected throws away the
//! partial code and starts over.
//!
//! [`Robot::listen`] runs one listen cycle on the robot side.
//! [`Request`] builds the same frames on the host side.

pub mod code;
pub mod collab;
pub mod dispatcher;
pub mod error;
pub mod request;

pub use code::{CommandCode, UnknownCode, SENTINEL};
pub use collab::{Audio, Imaging, Motion, Pose, Scanner, StatusIndicator};
pub use dispatcher::{Cycle, DispatcherConfig, Robot, DEFAULT_TONE_DURATION, INVALID_MESSAGE};
pub use error::{CommandError, Result};
pub use request::{read_pose, write_pose, Request, ResponseKind, SpeedSegment};
