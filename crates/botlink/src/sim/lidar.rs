use std::io::Write;

use botlink_codec::{send_block, WIRE_BYTE_ORDER};
use botlink_command::Scanner;
use bytes::{BufMut, BytesMut};
use tracing::debug;

use super::SharedPose;

/// One reading per degree.
pub const SCAN_READINGS: usize = 360;
/// Range limit of the time-of-flight sensor.
pub const TOF_MAX_DISTANCE_MM: f32 = 2000.0;
pub const DEFAULT_ROOM_HALF_WIDTH_MM: f32 = 1000.0;

/// Rotating time-of-flight scan inside an empty square room centred on the
/// origin.
///
/// A scan is one telemetry block of [`SCAN_READINGS`] `u16` distances in
/// millimetres, starting at the current heading and turning
/// counter-clockwise one degree per reading.
#[derive(Debug)]
pub struct SimLidar {
    pose: SharedPose,
    room_half_width_mm: f32,
    scans: usize,
}

impl SimLidar {
    pub fn new(pose: SharedPose) -> Self {
        Self {
            pose,
            room_half_width_mm: DEFAULT_ROOM_HALF_WIDTH_MM,
            scans: 0,
        }
    }

    pub fn set_room_half_width(&mut self, half_width_mm: f32) {
        self.room_half_width_mm = half_width_mm;
    }

    pub fn scans(&self) -> usize {
        self.scans
    }

    /// Distances for a full turn from the current pose.
    pub fn measure(&self) -> Vec<u16> {
        let pose = self.pose.get();
        let half = self.room_half_width_mm;
        (0..SCAN_READINGS)
            .map(|i| {
                let angle = pose.heading + (i as f32).to_radians();
                let (dy, dx) = angle.sin_cos();
                let tx = wall_distance(pose.x, dx, half);
                let ty = wall_distance(pose.y, dy, half);
                tx.min(ty).clamp(0.0, TOF_MAX_DISTANCE_MM).round() as u16
            })
            .collect()
    }
}

/// Ray length from `pos` along direction component `d` to the wall at
/// `±half` on that axis.
fn wall_distance(pos: f32, d: f32, half: f32) -> f32 {
    if d > f32::EPSILON {
        (half - pos) / d
    } else if d < -f32::EPSILON {
        (-half - pos) / d
    } else {
        f32::INFINITY
    }
}

impl Scanner for SimLidar {
    fn scan(&mut self, output: &mut dyn Write) -> std::io::Result<()> {
        let readings = self.measure();
        let mut payload = BytesMut::with_capacity(readings.len() * 2);
        for distance in &readings {
            payload.put_slice(&WIRE_BYTE_ORDER.u16_to_bytes(*distance));
        }
        let mut output = output;
        send_block(&mut output, &payload).map_err(std::io::Error::from)?;
        self.scans += 1;
        debug!(readings = readings.len(), "scan streamed");
        Ok(())
    }
}
