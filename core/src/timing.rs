//! Interval gating on a wrapping 32-bit millisecond clock.

use serde::{Deserialize, Serialize};

use crate::config::Intervals;

/// Monotonic millisecond counter. Allowed to wrap at `u32::MAX`.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Whether `interval_ms` has elapsed since `last_ms`. Correct across counter wraparound
/// as long as checks happen at least once per half counter period.
#[inline]
pub fn due_since(last_ms: u32, interval_ms: u32, now_ms: u32) -> bool {
    now_ms.wrapping_sub(last_ms) >= interval_ms
}

/// One periodic activity and the time it last ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Periodic {
    pub interval_ms: u32,
    pub last_ms: u32,
}

impl Periodic {
    pub fn new(interval_ms: u32, now_ms: u32) -> Self {
        Self { interval_ms, last_ms: now_ms }
    }

    pub fn is_due(&self, now_ms: u32) -> bool {
        due_since(self.last_ms, self.interval_ms, now_ms)
    }

    /// Returns true and records `now_ms` when due, otherwise leaves the cell untouched.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        if self.is_due(now_ms) {
            self.last_ms = now_ms;
            true
        } else {
            false
        }
    }

    /// Restarts the period from `now_ms`.
    pub fn reset(&mut self, now_ms: u32) {
        self.last_ms = now_ms;
    }
}

/// The cells of every activity a node schedules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub paddle_send: Periodic,
    pub physics: Periodic,
    pub paddle_move: Periodic,
    pub render: Periodic,
    /// Present when the leader periodically resends the score.
    pub score_refresh: Option<Periodic>,
}

impl Schedule {
    pub fn new(intervals: &Intervals, score_refresh_ms: u32, now_ms: u32) -> Self {
        Self {
            paddle_send: Periodic::new(intervals.paddle_send_ms, now_ms),
            physics: Periodic::new(intervals.physics_ms, now_ms),
            paddle_move: Periodic::new(intervals.paddle_move_ms, now_ms),
            render: Periodic::new(intervals.render_ms, now_ms),
            score_refresh: (score_refresh_ms > 0).then(|| Periodic::new(score_refresh_ms, now_ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_exactly_at_interval() {
        assert!(!due_since(100, 10, 109));
        assert!(due_since(100, 10, 110));
        assert!(due_since(100, 10, 500));
    }

    #[test]
    fn due_across_counter_wrap() {
        let last = u32::MAX - 4;
        assert!(!due_since(last, 10, 4));
        assert!(due_since(last, 10, 5));
    }

    #[test]
    fn poll_only_moves_timestamp_when_run() {
        let mut p = Periodic::new(40, 0);
        assert!(!p.poll(39));
        assert_eq!(p.last_ms, 0);
        assert!(p.poll(45));
        assert_eq!(p.last_ms, 45);
        assert!(!p.poll(80));
        assert!(p.poll(85));
    }

    #[test]
    fn score_refresh_cell_only_when_enabled() {
        let intervals = Intervals::default();
        assert!(Schedule::new(&intervals, 0, 0).score_refresh.is_none());
        assert_eq!(Schedule::new(&intervals, 500, 7).score_refresh, Some(Periodic::new(500, 7)));
    }
}
