//! Host-side view of the protocol: building command frames and reading the
//! replies they produce.

use std::io::{Read, Write};

use botlink_codec::{
    receive_float, receive_int16, receive_uint16, send_float, ByteOrder, WIRE_BYTE_ORDER,
};
use bytes::{BufMut, BytesMut};

use crate::code::{CommandCode, SENTINEL};
use crate::collab::Pose;
use crate::error::{CommandError, Result};

/// Write a pose as three floats: x, y, heading.
pub fn write_pose(dst: &mut impl Write, pose: Pose) -> botlink_codec::Result<()> {
    send_float(dst, pose.x)?;
    send_float(dst, pose.y)?;
    send_float(dst, pose.heading)
}

/// Read a pose written by [`write_pose`].
pub fn read_pose(src: &mut impl Read) -> botlink_codec::Result<Pose> {
    let x = receive_float(src)?;
    let y = receive_float(src)?;
    let heading = receive_float(src)?;
    Ok(Pose { x, y, heading })
}

/// One segment of a `MOVE` instruction: wheel speeds held for a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedSegment {
    /// Left wheel speed in steps per second.
    pub left: i16,
    /// Right wheel speed in steps per second.
    pub right: i16,
    pub duration_ms: u16,
}

impl SpeedSegment {
    pub const WIRE_SIZE: usize = 6;
    /// Most segments one `MOVE` can carry.
    pub const MAX_PER_INSTRUCTION: usize = u16::MAX as usize;

    fn put(&self, dst: &mut BytesMut, order: ByteOrder) {
        dst.put_slice(&order.i16_to_bytes(self.left));
        dst.put_slice(&order.i16_to_bytes(self.right));
        dst.put_slice(&order.u16_to_bytes(self.duration_ms));
    }

    /// Read a full `MOVE` payload: a `u16` segment count, then the segments.
    pub fn read_instruction(src: &mut impl Read) -> botlink_codec::Result<Vec<SpeedSegment>> {
        let count = receive_uint16(src)? as usize;
        let mut segments = Vec::with_capacity(count);
        for _ in 0..count {
            segments.push(SpeedSegment {
                left: receive_int16(src)?,
                right: receive_int16(src)?,
                duration_ms: receive_uint16(src)?,
            });
        }
        Ok(segments)
    }
}

/// What the robot sends back after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Nothing.
    None,
    /// Three floats.
    Pose,
    /// One telemetry block.
    Block,
}

/// A command as the host wants to send it.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Clear(Pose),
    Picture,
    Position,
    Move(Vec<SpeedSegment>),
    Stop,
    Scan,
    Beep(u16),
}

impl Request {
    pub fn code(&self) -> CommandCode {
        match self {
            Request::Clear(_) => CommandCode::Clear,
            Request::Picture => CommandCode::Picture,
            Request::Position => CommandCode::Position,
            Request::Move(_) => CommandCode::Move,
            Request::Stop => CommandCode::Stop,
            Request::Scan => CommandCode::Scan,
            Request::Beep(_) => CommandCode::Beep,
        }
    }

    /// Reply the robot writes for this request.
    ///
    /// `SCAN` replies with whatever the scanner streams; the bundled scanners
    /// send one telemetry block.
    pub fn response(&self) -> ResponseKind {
        match self {
            Request::Position | Request::Stop => ResponseKind::Pose,
            Request::Scan => ResponseKind::Block,
            _ => ResponseKind::None,
        }
    }

    /// Encode the complete frame: sentinel, code, payload.
    ///
    /// Fails, leaving `dst` untouched, when a `MOVE` instruction has more
    /// than [`SpeedSegment::MAX_PER_INSTRUCTION`] segments.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let order = WIRE_BYTE_ORDER;
        if let Request::Move(segments) = self {
            if segments.len() > SpeedSegment::MAX_PER_INSTRUCTION {
                return Err(CommandError::TooManySegments {
                    count: segments.len(),
                    max: SpeedSegment::MAX_PER_INSTRUCTION,
                });
            }
        }

        dst.put_u8(SENTINEL);
        dst.put_slice(self.code().as_bytes());
        match self {
            Request::Clear(pose) => {
                dst.put_slice(&order.f32_to_bytes(pose.x));
                dst.put_slice(&order.f32_to_bytes(pose.y));
                dst.put_slice(&order.f32_to_bytes(pose.heading));
            }
            Request::Move(segments) => {
                dst.reserve(2 + segments.len() * SpeedSegment::WIRE_SIZE);
                dst.put_slice(&order.u16_to_bytes(segments.len() as u16));
                for segment in segments {
                    segment.put(dst, order);
                }
            }
            Request::Beep(frequency) => dst.put_slice(&order.u16_to_bytes(*frequency)),
            Request::Picture | Request::Position | Request::Stop | Request::Scan => {}
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<BytesMut> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf)
    }
}
