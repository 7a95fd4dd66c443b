//! Fixed-width binary value marshalling for the botlink serial protocol.
//!
//! Numbers cross the wire as their raw IEEE-754 / two's complement bytes in
//! [`WIRE_BYTE_ORDER`]. There is no framing at this layer: the command that
//! was sent tells the receiver how many values follow.
//!
//! The only framed structure is the telemetry block used for bulk dumps:
//! - The 5-byte ASCII marker `START` for stream synchronization
//! - A 2-byte payload length in wire byte order
//! - The payload itself

#[cfg(feature = "async")]
pub mod async_io;
pub mod block;
pub mod error;
pub mod order;
pub mod value;

pub use block::{encode_block, receive_block, send_block, BLOCK_MARKER, MAX_BLOCK_PAYLOAD};
pub use error::{CodecError, Result};
pub use order::{ByteOrder, WIRE_BYTE_ORDER};
pub use value::{
    receive_float, receive_int16, receive_u8, receive_uint16, send_bytes, send_float, send_int16,
    send_uint16,
};
