// Desktop stand-ins for the board peripherals: clock, buttons, display.

use std::cell::Cell;
use std::rc::Rc;

use canpong_core::{Channel, Clock, InputSource, Level, Renderer, Snapshot};
use serde::{Deserialize, Serialize};

/// Simulated wall time in milliseconds, shared by every device of a session.
#[derive(Debug, Clone, Default)]
pub struct SimTime(Rc<Cell<u64>>);

impl SimTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.0.get()
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

/// A board's millisecond counter: its own power-on offset plus a drift in parts per thousand.
/// Wraps at `u32::MAX` like the hardware tick counter.
#[derive(Debug, Clone)]
pub struct SkewedClock {
    time: SimTime,
    offset_ms: u32,
    drift_permille: i32,
}

impl SkewedClock {
    pub fn new(time: SimTime, offset_ms: u32, drift_permille: i32) -> Self {
        Self { time, offset_ms, drift_permille }
    }
}

impl Clock for SkewedClock {
    fn now_ms(&self) -> u32 {
        let t = self.time.now() as i64;
        let local = t + t * i64::from(self.drift_permille) / 1000;
        self.offset_ms.wrapping_add(local as u32)
    }
}

/// One scheduled level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputStep {
    pub at_ms: u64,
    pub channel: Channel,
    pub level: Level,
}

/// Replays level changes against simulated time. Every line starts released.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    time: SimTime,
    steps: Vec<InputStep>,
}

impl ScriptedInput {
    pub fn new(time: SimTime) -> Self {
        Self { time, steps: Vec::new() }
    }

    pub fn set(mut self, at_ms: u64, channel: Channel, level: Level) -> Self {
        self.steps.push(InputStep { at_ms, channel, level });
        self.steps.sort_by_key(|s| s.at_ms);
        self
    }

    /// Press `channel` at `at_ms` and release it `hold_ms` later.
    pub fn press(self, at_ms: u64, hold_ms: u64, channel: Channel) -> Self {
        self.set(at_ms, channel, Level::Pressed).set(at_ms + hold_ms, channel, Level::Released)
    }
}

impl InputSource for ScriptedInput {
    fn read_digital(&self, channel: Channel) -> Level {
        let now = self.time.now();
        self.steps
            .iter()
            .take_while(|s| s.at_ms <= now)
            .filter(|s| s.channel == channel)
            .last()
            .map_or(Level::Released, |s| s.level)
    }
}

/// Plays the paddle like the single-player opponent does: steer toward the drawn ball, hold
/// still inside a dead zone. Commit comes from an optional script.
#[derive(Debug, Clone)]
pub struct AutoPilot {
    paddle_height: i32,
    dead_zone: i32,
    seen: Cell<Option<Snapshot>>,
    buttons: Option<ScriptedInput>,
}

impl AutoPilot {
    pub fn new(paddle_height: i32, dead_zone: i32) -> Self {
        Self { paddle_height, dead_zone, seen: Cell::new(None), buttons: None }
    }

    pub fn with_buttons(mut self, buttons: ScriptedInput) -> Self {
        self.buttons = Some(buttons);
        self
    }

    /// Latest state of the node this pilot plays.
    pub fn observe(&self, snapshot: Snapshot) {
        self.seen.set(Some(snapshot));
    }

    fn steer(&self) -> (bool, bool) {
        let Some(s) = self.seen.get() else { return (false, false) };
        if !s.ball.visible {
            return (false, false);
        }
        let diff = s.ball.y - (s.own_top + self.paddle_height / 2);
        (diff < -self.dead_zone, diff > self.dead_zone)
    }
}

impl InputSource for AutoPilot {
    fn read_digital(&self, channel: Channel) -> Level {
        let pressed = match channel {
            Channel::Up => self.steer().0,
            Channel::Down => self.steer().1,
            Channel::Commit => {
                return self.buttons.as_ref().map_or(Level::Released, |b| b.read_digital(channel));
            }
        };
        if pressed { Level::Pressed } else { Level::Released }
    }
}

/// Renderer that keeps what it was last asked to draw.
#[derive(Debug, Clone, Default)]
pub struct SnapshotLog {
    pub frames: u64,
    pub last: Option<Snapshot>,
}

impl Renderer for SnapshotLog {
    fn render(&mut self, snapshot: &Snapshot) {
        self.frames += 1;
        self.last = Some(*snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canpong_core::{BallView, NodeRole, ScoreState};

    #[test]
    fn skewed_clock_drifts_and_wraps() {
        let time = SimTime::new();
        let fast = SkewedClock::new(time.clone(), u32::MAX - 99, 10);
        assert_eq!(fast.now_ms(), u32::MAX - 99);
        time.advance(1000);
        assert_eq!(fast.now_ms(), 910);
    }

    #[test]
    fn script_holds_last_level() {
        let time = SimTime::new();
        let input = ScriptedInput::new(time.clone()).press(100, 200, Channel::Commit);
        assert_eq!(input.read_digital(Channel::Commit), Level::Released);
        time.advance(100);
        assert_eq!(input.read_digital(Channel::Commit), Level::Pressed);
        assert_eq!(input.read_digital(Channel::Up), Level::Released);
        time.advance(200);
        assert_eq!(input.read_digital(Channel::Commit), Level::Released);
    }

    fn snapshot(ball_y: i32, own_top: i32, visible: bool) -> Snapshot {
        Snapshot {
            role: NodeRole::Follower,
            own_top,
            opponent_top: 21,
            ball: BallView { x: 60, y: ball_y, visible, velocity: None },
            score: ScoreState::default(),
        }
    }

    #[test]
    fn autopilot_chases_ball() {
        let pilot = AutoPilot::new(20, 1);
        pilot.observe(snapshot(10, 21, true));
        assert_eq!(pilot.read_digital(Channel::Up), Level::Pressed);
        assert_eq!(pilot.read_digital(Channel::Down), Level::Released);
        pilot.observe(snapshot(50, 21, true));
        assert_eq!(pilot.read_digital(Channel::Down), Level::Pressed);
        pilot.observe(snapshot(31, 21, true));
        assert_eq!(pilot.read_digital(Channel::Up), Level::Released);
        assert_eq!(pilot.read_digital(Channel::Down), Level::Released);
    }

    #[test]
    fn autopilot_waits_for_visible_ball() {
        let pilot = AutoPilot::new(20, 1);
        pilot.observe(snapshot(5, 21, false));
        assert_eq!(pilot.read_digital(Channel::Up), Level::Released);
        assert_eq!(pilot.read_digital(Channel::Commit), Level::Released);
    }
}
