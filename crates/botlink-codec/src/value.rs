use std::io::{Read, Write};

use crate::error::{CodecError, Result};
use crate::order::WIRE_BYTE_ORDER;

fn read_array<const N: usize>(src: &mut impl Read) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    src.read_exact(&mut buf).map_err(CodecError::from_read)?;
    Ok(buf)
}

fn write_all(dst: &mut impl Write, bytes: &[u8]) -> Result<()> {
    dst.write_all(bytes).map_err(CodecError::from_write)
}

/// Read one byte (blocking).
pub fn receive_u8(src: &mut impl Read) -> Result<u8> {
    let [byte] = read_array::<1>(src)?;
    Ok(byte)
}

/// Write the 4-byte representation of `value`.
pub fn send_float(dst: &mut impl Write, value: f32) -> Result<()> {
    write_all(dst, &WIRE_BYTE_ORDER.f32_to_bytes(value))
}

/// Read 4 bytes and reassemble them into an `f32` (blocking).
pub fn receive_float(src: &mut impl Read) -> Result<f32> {
    Ok(WIRE_BYTE_ORDER.f32_from_bytes(read_array(src)?))
}

/// Write the 2-byte representation of `value`.
pub fn send_uint16(dst: &mut impl Write, value: u16) -> Result<()> {
    write_all(dst, &WIRE_BYTE_ORDER.u16_to_bytes(value))
}

/// Read 2 bytes and reassemble them into a `u16` (blocking).
pub fn receive_uint16(src: &mut impl Read) -> Result<u16> {
    Ok(WIRE_BYTE_ORDER.u16_from_bytes(read_array(src)?))
}

pub fn send_int16(dst: &mut impl Write, value: i16) -> Result<()> {
    write_all(dst, &WIRE_BYTE_ORDER.i16_to_bytes(value))
}

pub fn receive_int16(src: &mut impl Read) -> Result<i16> {
    Ok(WIRE_BYTE_ORDER.i16_from_bytes(read_array(src)?))
}

/// Write the first `size` bytes of `buffer` verbatim.
///
/// Used for coarse telemetry dumps where the host already knows the layout.
pub fn send_bytes(dst: &mut impl Write, buffer: &[u8], size: usize) -> Result<()> {
    let bytes = buffer.get(..size).ok_or(CodecError::SizeExceedsBuffer {
        size,
        len: buffer.len(),
    })?;
    write_all(dst, bytes)
}
