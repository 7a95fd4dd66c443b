use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{CodecError, Result};
use crate::order::WIRE_BYTE_ORDER;
use crate::value::{receive_u8, receive_uint16};

/// Synchronization marker in front of every telemetry block.
pub const BLOCK_MARKER: &[u8; 5] = b"START";

/// Largest payload the 16-bit length field can describe.
pub const MAX_BLOCK_PAYLOAD: usize = u16::MAX as usize;

/// Encode a telemetry block.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────┬─────────────────┐
/// │ Marker (5B)  │ Length    │ Payload         │
/// │ "START"      │ (2B wire) │ (Length bytes)  │
/// └──────────────┴───────────┴─────────────────┘
/// ```
pub fn encode_block(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_BLOCK_PAYLOAD {
        return Err(CodecError::BlockTooLarge {
            size: payload.len(),
            max: MAX_BLOCK_PAYLOAD,
        });
    }
    dst.reserve(BLOCK_MARKER.len() + 2 + payload.len());
    dst.put_slice(BLOCK_MARKER);
    dst.put_slice(&WIRE_BYTE_ORDER.u16_to_bytes(payload.len() as u16));
    dst.put_slice(payload);
    Ok(())
}

/// Encode and write a telemetry block in one call.
pub fn send_block(dst: &mut impl Write, payload: &[u8]) -> Result<()> {
    let mut buf = BytesMut::new();
    encode_block(payload, &mut buf)?;
    dst.write_all(&buf).map_err(CodecError::from_write)
}

/// Read the next telemetry block (blocking).
///
/// Bytes before the marker are skipped. A mismatch mid-marker restarts the
/// match, and an `S` in that position counts as a fresh first marker byte, so
/// `SSTART` and `STSTART` both synchronize.
pub fn receive_block(src: &mut impl Read, max_payload: usize) -> Result<Bytes> {
    let mut matched = 0usize;
    let mut skipped = 0usize;
    while matched < BLOCK_MARKER.len() {
        let byte = receive_u8(src)?;
        matched = if byte == BLOCK_MARKER[matched] {
            matched + 1
        } else if byte == BLOCK_MARKER[0] {
            1
        } else {
            0
        };
        skipped += 1;
    }
    if skipped > BLOCK_MARKER.len() {
        trace!(skipped = skipped - BLOCK_MARKER.len(), "skipped bytes before block marker");
    }

    let len = receive_uint16(src)? as usize;
    if len > max_payload {
        return Err(CodecError::BlockTooLarge {
            size: len,
            max: max_payload,
        });
    }

    let mut payload = vec![0u8; len];
    src.read_exact(&mut payload).map_err(CodecError::from_read)?;
    Ok(Bytes::from(payload))
}
