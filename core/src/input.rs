use serde::{Deserialize, Serialize};

use crate::timing::due_since;

/// Digital input lines the core reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Up,
    Down,
    /// Joystick click; the first press claims leadership.
    Commit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Pressed,
    #[default]
    Released,
}

impl Level {
    pub fn is_pressed(self) -> bool { self == Level::Pressed }
}

/// Source of raw digital levels. Reads must not block.
pub trait InputSource {
    fn read_digital(&self, channel: Channel) -> Level;
}

/// Debounces one raw line without blocking: a new level is accepted only after the raw
/// signal has held it for `hold_ms`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Debouncer {
    hold_ms: u32,
    stable: Level,
    candidate: Level,
    since_ms: u32,
}

impl Debouncer {
    pub fn new(hold_ms: u32, now_ms: u32) -> Self {
        Self { hold_ms, stable: Level::Released, candidate: Level::Released, since_ms: now_ms }
    }

    pub fn level(&self) -> Level { self.stable }

    /// Feeds one raw sample and returns the debounced level.
    pub fn update(&mut self, raw: Level, now_ms: u32) -> Level {
        if raw != self.candidate {
            self.candidate = raw;
            self.since_ms = now_ms;
        }
        if self.candidate != self.stable && due_since(self.since_ms, self.hold_ms, now_ms) {
            self.stable = self.candidate;
        }
        self.stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_accepted_after_hold() {
        let mut d = Debouncer::new(150, 0);
        assert_eq!(d.update(Level::Pressed, 10), Level::Released);
        assert_eq!(d.update(Level::Pressed, 159), Level::Released);
        assert_eq!(d.update(Level::Pressed, 160), Level::Pressed);
    }

    #[test]
    fn bounce_restarts_hold() {
        let mut d = Debouncer::new(150, 0);
        d.update(Level::Pressed, 0);
        d.update(Level::Released, 100);
        d.update(Level::Pressed, 120);
        assert_eq!(d.update(Level::Pressed, 200), Level::Released);
        assert_eq!(d.update(Level::Pressed, 270), Level::Pressed);
    }

    #[test]
    fn zero_hold_follows_raw_signal() {
        let mut d = Debouncer::new(0, 0);
        assert_eq!(d.update(Level::Pressed, 1), Level::Pressed);
        assert_eq!(d.update(Level::Released, 2), Level::Released);
        assert_eq!(d.level(), Level::Released);
    }
}
