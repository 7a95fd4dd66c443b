use botlink_command::{Audio, StatusIndicator};
use tracing::{debug, info};

/// Tone generator that logs what it would play.
#[derive(Debug, Default)]
pub struct SimBuzzer {
    enabled: bool,
    playing: Option<u16>,
    history: Vec<u16>,
}

impl SimBuzzer {
    /// Frequency currently sounding.
    pub fn playing(&self) -> Option<u16> {
        self.playing
    }

    /// Every frequency played, oldest first.
    pub fn history(&self) -> &[u16] {
        &self.history
    }
}

impl Audio for SimBuzzer {
    fn tone_start(&mut self) {
        self.enabled = true;
    }

    fn tone_play(&mut self, frequency: u16) {
        if !self.enabled {
            debug!(frequency, "tone requested before start; ignored");
            return;
        }
        info!(frequency, "beep");
        self.playing = Some(frequency);
        self.history.push(frequency);
    }

    fn tone_stop(&mut self) {
        self.enabled = false;
        self.playing = None;
    }
}

/// Status LED that reports its transitions through the log.
#[derive(Debug, Default)]
pub struct LogIndicator {
    on: bool,
    transitions: usize,
}

impl LogIndicator {
    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn transitions(&self) -> usize {
        self.transitions
    }
}

impl StatusIndicator for LogIndicator {
    fn set(&mut self, on: bool) {
        if self.on != on {
            self.transitions += 1;
            debug!(state = if on { "listening" } else { "busy" }, "status indicator");
        }
        self.on = on;
    }
}
