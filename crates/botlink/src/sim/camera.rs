use std::f32::consts::TAU;
use std::io::Write;

use botlink_codec::{send_block, WIRE_BYTE_ORDER};
use botlink_command::Imaging;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, info};

use super::SharedPose;

/// Frame width after the firmware's 4x subsampling of the 640-pixel sensor.
pub const IMAGE_WIDTH: usize = 160;
/// Frame height after subsampling.
pub const IMAGE_HEIGHT: usize = 30;
/// RGB565 payload size of one frame.
pub const IMAGE_BYTES: usize = IMAGE_WIDTH * IMAGE_HEIGHT * 2;

const STRIPE_HALF_WIDTH: usize = 4;

/// Camera that renders a synthetic RGB565 frame on every capture.
///
/// The scene is a bright wall with a dark vertical landmark; the landmark's
/// column follows the robot's heading so successive frames differ after a
/// turn. With a sink attached each frame is also streamed as a telemetry
/// block, the way the firmware's image thread pushes pictures to the host
/// independently of the command reply.
pub struct SimCamera {
    pose: SharedPose,
    captures: usize,
    last_frame: Option<Bytes>,
    sink: Option<Box<dyn Write>>,
}

impl SimCamera {
    pub fn new(pose: SharedPose) -> Self {
        Self {
            pose,
            captures: 0,
            last_frame: None,
            sink: None,
        }
    }

    /// Stream every captured frame to `sink`, or stop streaming with `None`.
    pub fn set_sink(&mut self, sink: Option<Box<dyn Write>>) {
        self.sink = sink;
    }

    pub fn captures(&self) -> usize {
        self.captures
    }

    /// RGB565 pixels of the most recent capture, row-major, wire byte order.
    pub fn last_frame(&self) -> Option<&Bytes> {
        self.last_frame.as_ref()
    }

    /// Column of the landmark for the current heading.
    fn stripe_column(&self) -> usize {
        let turn = self.pose.get().heading.rem_euclid(TAU) / TAU;
        ((turn * IMAGE_WIDTH as f32) as usize).min(IMAGE_WIDTH - 1)
    }

    pub fn render(&self) -> Bytes {
        let stripe = self.stripe_column();
        let mut frame = BytesMut::with_capacity(IMAGE_BYTES);
        for row in 0..IMAGE_HEIGHT {
            // Slightly darker toward the floor.
            let wall = 230 - (row * 60 / IMAGE_HEIGHT) as u8;
            for col in 0..IMAGE_WIDTH {
                let luma = if col.abs_diff(stripe) <= STRIPE_HALF_WIDTH {
                    20
                } else {
                    wall
                };
                frame.put_slice(&WIRE_BYTE_ORDER.u16_to_bytes(gray_rgb565(luma)));
            }
        }
        frame.freeze()
    }
}

impl Default for SimCamera {
    fn default() -> Self {
        Self::new(SharedPose::default())
    }
}

impl std::fmt::Debug for SimCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimCamera")
            .field("captures", &self.captures)
            .field("streaming", &self.sink.is_some())
            .finish()
    }
}

impl Imaging for SimCamera {
    fn capture(&mut self) -> std::io::Result<()> {
        let frame = self.render();
        self.captures += 1;
        info!(capture = self.captures, "image captured");

        if let Some(sink) = self.sink.as_mut() {
            send_block(sink, &frame)?;
            sink.flush()?;
            debug!(bytes = frame.len(), "image streamed");
        }
        self.last_frame = Some(frame);
        Ok(())
    }
}

/// Pack an 8-bit gray level into RGB565.
pub fn gray_rgb565(luma: u8) -> u16 {
    let luma = u16::from(luma);
    ((luma >> 3) << 11) | ((luma >> 2) << 5) | (luma >> 3)
}
