//! Interfaces of the hardware-facing collaborators the dispatcher drives.
//!
//! Implementations own the hardware; the dispatcher only calls into them for
//! the duration of one command.

use std::io::{Read, Write};

/// Tracked robot pose: millimetres and radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub heading: f32,
}

impl Pose {
    pub fn new(x: f32, y: f32, heading: f32) -> Self {
        Self { x, y, heading }
    }
}

/// Motion control and odometry.
pub trait Motion {
    /// Overwrite the tracked pose.
    fn set_pose(&mut self, x: f32, y: f32, heading: f32);

    fn x(&self) -> f32;

    fn y(&self) -> f32;

    fn heading(&self) -> f32;

    /// Read a speed instruction from `input` and act on it.
    ///
    /// The payload format belongs to the implementation; the dispatcher does
    /// not look at it.
    fn receive_speed_instruction(
        &mut self,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> std::io::Result<()>;

    /// Halt the wheels.
    fn stop(&mut self);

    fn pose(&self) -> Pose {
        Pose::new(self.x(), self.y(), self.heading())
    }
}

pub trait Imaging {
    fn capture(&mut self) -> std::io::Result<()>;
}

pub trait Scanner {
    /// Run a full rotational scan, streaming results straight to `output`.
    fn scan(&mut self, output: &mut dyn Write) -> std::io::Result<()>;
}

/// Tone generator.
pub trait Audio {
    fn tone_start(&mut self);

    fn tone_play(&mut self, frequency: u16);

    fn tone_stop(&mut self);
}

/// On while the robot listens, off while it works on a command.
pub trait StatusIndicator {
    fn set(&mut self, on: bool);
}
