use serde::{Deserialize, Serialize};

use crate::config::Geometry;
use crate::constants::MAX_PAYLOAD;
use crate::fixed::{from_fixed_round, to_fixed_int, I};

/// Authority of a node for the current session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum NodeRole {
    #[default]
    Undecided = 0,
    Leader = 1,
    Follower = 2,
}

impl NodeRole {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => NodeRole::Leader,
            2 => NodeRole::Follower,
            _ => NodeRole::Undecided,
        }
    }
}

impl core::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NodeRole::Undecided => write!(f, "undecided"),
            NodeRole::Leader => write!(f, "leader"),
            NodeRole::Follower => write!(f, "follower"),
        }
    }
}

/// Side of the screen as drawn on this device. Every device draws itself on the right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Sign of the x direction pointing at this side.
    pub fn direction(self) -> i32 {
        match self {
            Side::Left => -1,
            Side::Right => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddleState {
    /// Row of the paddle's top pixel.
    pub top: i32,
    pub height: i32,
}

impl PaddleState {
    pub fn centered(geometry: &Geometry) -> Self {
        Self { top: geometry.centered_paddle_top(), height: geometry.paddle_height }
    }

    pub fn center(&self) -> i32 { self.top + self.height / 2 }
}

/// Authoritative ball, Q16.16 pixels and pixels per physics tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BallState {
    pub x: I,
    pub y: I,
    pub vx: I,
    pub vy: I,
}

impl BallState {
    pub fn at_pixel(x: i32, y: i32, vx: I, vy: I) -> Self {
        Self { x: to_fixed_int(x), y: to_fixed_int(y), vx, vy }
    }

    pub fn pixel_x(&self) -> i32 { from_fixed_round(self.x) }
    pub fn pixel_y(&self) -> i32 { from_fixed_round(self.y) }
}

/// What a node draws for the ball. Followers fill it from Ball frames only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallView {
    pub x: i32,
    pub y: i32,
    pub visible: bool,
    /// Present when the Ball layout carries velocity.
    pub velocity: Option<(I, I)>,
}

/// Points per side as drawn on this device: `right` is this device's own score. Every device,
/// leader or follower, keeps its score this way round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreState {
    pub left: u8,
    pub right: u8,
}

impl ScoreState {
    pub fn own(&self) -> u8 { self.right }
    pub fn opponent(&self) -> u8 { self.left }

    /// The same score as drawn by the device on the other end of the bus.
    pub fn seen_from_peer(&self) -> Self {
        Self { left: self.right, right: self.left }
    }

    pub fn credit(&mut self, side: Side) {
        match side {
            Side::Left => self.left = self.left.saturating_add(1),
            Side::Right => self.right = self.right.saturating_add(1),
        }
    }
}

/// Sign memory carried between serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServeMemory {
    pub last_vy_sign: i32,
}

impl Default for ServeMemory {
    fn default() -> Self {
        Self { last_vy_sign: 1 }
    }
}

/// All shared game entities of one node. Only the synchronizer mutates it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub own: PaddleState,
    pub opponent: PaddleState,
    pub ball: BallState,
    pub view: BallView,
    pub score: ScoreState,
    pub serve: ServeMemory,
}

impl GameState {
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            own: PaddleState::centered(geometry),
            opponent: PaddleState::centered(geometry),
            ball: BallState::at_pixel(geometry.center_x(), geometry.center_y(), 0, 0),
            view: BallView { x: geometry.center_x(), y: geometry.center_y(), visible: false, velocity: None },
            score: ScoreState::default(),
            serve: ServeMemory::default(),
        }
    }
}

/// Read-only copy handed to the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub role: NodeRole,
    pub own_top: i32,
    pub opponent_top: i32,
    pub ball: BallView,
    pub score: ScoreState,
}

/// Draws a snapshot. Invoked only when the render interval elapsed; never mutates game state.
pub trait Renderer {
    fn render(&mut self, snapshot: &Snapshot);
}

/// One fixed-size bus frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusFrame {
    pub id: u32,
    pub len: u8,
    pub data: [u8; MAX_PAYLOAD],
}

impl BusFrame {
    /// Payload bytes past the frame capacity are cut off.
    pub fn new(id: u32, payload: &[u8]) -> Self {
        let len = payload.len().min(MAX_PAYLOAD);
        let mut data = [0u8; MAX_PAYLOAD];
        data[..len].copy_from_slice(&payload[..len]);
        Self { id, len: len as u8, data }
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.len).min(MAX_PAYLOAD)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_payload_is_truncated_to_capacity() {
        let f = BusFrame::new(7, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(f.len as usize, MAX_PAYLOAD);
        assert_eq!(f.payload(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn forged_length_never_reads_past_buffer() {
        let mut f = BusFrame::new(7, &[1]);
        f.len = 200;
        assert_eq!(f.payload().len(), MAX_PAYLOAD);
    }

    #[test]
    fn score_saturates() {
        let mut s = ScoreState { left: 254, right: 0 };
        s.credit(Side::Left);
        s.credit(Side::Left);
        assert_eq!(s.left, 255);
        assert_eq!(s.opponent(), 255);
        assert_eq!(s.own(), 0);
    }

    #[test]
    fn peer_view_swaps_own_and_opponent() {
        let leader = ScoreState { left: 0, right: 3 };
        let follower = leader.seen_from_peer();
        assert_eq!(follower.own(), 0);
        assert_eq!(follower.opponent(), 3);
        assert_eq!(follower.seen_from_peer(), leader);
    }

    #[test]
    fn role_round_trips_through_u8() {
        for role in [NodeRole::Undecided, NodeRole::Leader, NodeRole::Follower] {
            assert_eq!(NodeRole::from_u8(role as u8), role);
        }
    }
}
