//! Async variants of the value primitives for tokio-based host tooling.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{CodecError, Result};
use crate::order::WIRE_BYTE_ORDER;

pub async fn send_float_async<W: AsyncWrite + Unpin>(dst: &mut W, value: f32) -> Result<()> {
    dst.write_all(&WIRE_BYTE_ORDER.f32_to_bytes(value))
        .await
        .map_err(CodecError::from_write)
}

pub async fn receive_float_async<R: AsyncRead + Unpin>(src: &mut R) -> Result<f32> {
    let mut buf = [0u8; 4];
    src.read_exact(&mut buf)
        .await
        .map_err(CodecError::from_read)?;
    Ok(WIRE_BYTE_ORDER.f32_from_bytes(buf))
}

pub async fn receive_uint16_async<R: AsyncRead + Unpin>(src: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    src.read_exact(&mut buf)
        .await
        .map_err(CodecError::from_read)?;
    Ok(WIRE_BYTE_ORDER.u16_from_bytes(buf))
}
