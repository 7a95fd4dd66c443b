//! A simulated robot: every collaborator the dispatcher needs, in memory.
//!
//! Good enough to drive the protocol end to end from a host; not a physics
//! model.

mod camera;
mod lidar;
mod motion;
mod peripherals;

pub use camera::{gray_rgb565, SimCamera, IMAGE_BYTES, IMAGE_HEIGHT, IMAGE_WIDTH};
pub use lidar::{SimLidar, DEFAULT_ROOM_HALF_WIDTH_MM, SCAN_READINGS, TOF_MAX_DISTANCE_MM};
pub use motion::{SimMotion, MAX_STEPS_PER_SECOND, MM_PER_STEP, WHEEL_SPACING_MM};
pub use peripherals::{LogIndicator, SimBuzzer};

use std::cell::Cell;
use std::rc::Rc;

use botlink_command::{DispatcherConfig, Pose, Robot};

/// Pose shared between odometry and the sensors that measure from it.
pub type SharedPose = Rc<Cell<Pose>>;

/// Owns one of each simulated collaborator.
#[derive(Debug)]
pub struct SimRobot {
    pub motion: SimMotion,
    pub camera: SimCamera,
    pub lidar: SimLidar,
    pub buzzer: SimBuzzer,
    pub indicator: LogIndicator,
}

impl SimRobot {
    pub fn new() -> Self {
        let pose = SharedPose::default();
        Self {
            motion: SimMotion::new(pose.clone()),
            camera: SimCamera::new(pose.clone()),
            lidar: SimLidar::new(pose),
            buzzer: SimBuzzer::default(),
            indicator: LogIndicator::default(),
        }
    }

    /// Borrow everything as a dispatcher context.
    pub fn robot(&mut self, config: DispatcherConfig) -> Robot<'_> {
        Robot {
            motion: &mut self.motion,
            imaging: &mut self.camera,
            scanner: &mut self.lidar,
            audio: &mut self.buzzer,
            indicator: &mut self.indicator,
            config,
        }
    }
}

impl Default for SimRobot {
    fn default() -> Self {
        Self::new()
    }
}
