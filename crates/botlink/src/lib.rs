//! Serial command interface for a mobile robot.
//!
//! The robot listens on a byte link for sentinel-framed commands (`!POS`,
//! `!MOVE`, ...) and answers with raw binary values or short ASCII
//! diagnostics.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte links (Unix sockets, serial device nodes)
//! - [`codec`]: Fixed-width binary values and telemetry blocks
//! - [`command`]: Command parsing, dispatch and host-side frame building
//! - [`sim`]: In-memory collaborators that make up a simulated robot

/// Re-export transport types.
pub mod transport {
    pub use botlink_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use botlink_codec::*;
}

/// Re-export command types.
pub mod command {
    pub use botlink_command::*;
}

pub mod sim;
