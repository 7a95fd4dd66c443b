use std::io::{Read, Write};

use botlink_command::{Motion, Pose, SpeedSegment};
use tracing::{debug, info, warn};

use super::SharedPose;

/// Distance between the wheel contact points.
pub const WHEEL_SPACING_MM: f32 = 54.0;
const WHEEL_DIAMETER_MM: f32 = 41.0;
const STEPS_PER_TURN: f32 = 1000.0;
/// Wheel travel per motor step.
pub const MM_PER_STEP: f32 = std::f32::consts::PI * WHEEL_DIAMETER_MM / STEPS_PER_TURN;
/// Fastest either wheel may turn.
pub const MAX_STEPS_PER_SECOND: i16 = 1000;

/// Differential-drive odometry that applies each `MOVE` instantly.
///
/// `MOVE` payload: a `u16` segment count, then per segment the left and right
/// wheel speeds (`i16`, steps/s) and a duration (`u16`, ms). Segments asking
/// for more than [`MAX_STEPS_PER_SECOND`] on either wheel are skipped.
///
/// Heading is measured counter-clockwise from the x axis.
#[derive(Debug)]
pub struct SimMotion {
    pose: SharedPose,
    moving: bool,
    segments_run: usize,
}

impl SimMotion {
    pub fn new(pose: SharedPose) -> Self {
        Self {
            pose,
            moving: false,
            segments_run: 0,
        }
    }

    /// True between a `MOVE` and the next `STOP`.
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn segments_run(&self) -> usize {
        self.segments_run
    }

    fn apply(&mut self, segment: SpeedSegment) {
        let seconds = f32::from(segment.duration_ms) / 1000.0;
        let left = f32::from(segment.left) * MM_PER_STEP;
        let right = f32::from(segment.right) * MM_PER_STEP;
        let speed = (left + right) / 2.0;
        let turn_rate = (right - left) / WHEEL_SPACING_MM;

        let Pose { x, y, heading } = self.pose.get();
        let next = if turn_rate.abs() < 1e-6 {
            Pose::new(
                x + speed * seconds * heading.cos(),
                y + speed * seconds * heading.sin(),
                heading,
            )
        } else {
            let radius = speed / turn_rate;
            let end = heading + turn_rate * seconds;
            Pose::new(
                x + radius * (end.sin() - heading.sin()),
                y - radius * (end.cos() - heading.cos()),
                end,
            )
        };
        self.pose.set(next);
        self.segments_run += 1;
    }
}

impl Motion for SimMotion {
    fn set_pose(&mut self, x: f32, y: f32, heading: f32) {
        info!(x, y, heading, "pose reset");
        self.pose.set(Pose::new(x, y, heading));
    }

    fn x(&self) -> f32 {
        self.pose.get().x
    }

    fn y(&self) -> f32 {
        self.pose.get().y
    }

    fn heading(&self) -> f32 {
        self.pose.get().heading
    }

    fn receive_speed_instruction(
        &mut self,
        mut input: &mut dyn Read,
        _output: &mut dyn Write,
    ) -> std::io::Result<()> {
        let segments =
            SpeedSegment::read_instruction(&mut input).map_err(std::io::Error::from)?;
        debug!(count = segments.len(), "speed instruction received");

        for segment in segments {
            if segment.left.unsigned_abs() > MAX_STEPS_PER_SECOND as u16
                || segment.right.unsigned_abs() > MAX_STEPS_PER_SECOND as u16
            {
                warn!(
                    left = segment.left,
                    right = segment.right,
                    "speed above limit, segment skipped"
                );
                continue;
            }
            self.apply(segment);
            self.moving = true;
        }
        Ok(())
    }

    fn stop(&mut self) {
        debug!(was_moving = self.moving, "motors stopped");
        self.moving = false;
    }
}
