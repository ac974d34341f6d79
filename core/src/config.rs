use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigError;
use crate::fixed::{from_permille, I};

/// Display and playfield dimensions, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub screen_width: i32,
    pub screen_height: i32,
    pub border: i32,
    pub paddle_width: i32,
    pub paddle_height: i32,
    pub paddle_inset: i32,
    pub ball_radius: i32,
    pub paddle_step: i32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            screen_width: SCREEN_WIDTH,
            screen_height: SCREEN_HEIGHT,
            border: BORDER,
            paddle_width: PADDLE_WIDTH,
            paddle_height: PADDLE_HEIGHT,
            paddle_inset: PADDLE_INSET,
            ball_radius: BALL_RADIUS,
            paddle_step: PADDLE_STEP,
        }
    }
}

impl Geometry {
    pub fn play_left(&self) -> i32 { self.border + 1 }
    pub fn play_right(&self) -> i32 { self.screen_width - self.border - 2 }
    pub fn play_top(&self) -> i32 { self.border + 1 }
    pub fn play_bottom(&self) -> i32 { self.screen_height - self.border - 2 }

    /// Left edge of the paddle this device controls. Every device draws itself on the right.
    pub fn own_paddle_x(&self) -> i32 { self.play_right() - self.paddle_inset - self.paddle_width }

    pub fn opponent_paddle_x(&self) -> i32 { self.play_left() + self.paddle_inset }

    pub fn paddle_top_min(&self) -> i32 { self.play_top() }
    pub fn paddle_top_max(&self) -> i32 { self.play_bottom() - self.paddle_height }

    pub fn clamp_paddle_top(&self, top: i32) -> i32 {
        top.clamp(self.paddle_top_min(), self.paddle_top_max())
    }

    /// Paddle top row in the middle of the playfield.
    pub fn centered_paddle_top(&self) -> i32 {
        self.clamp_paddle_top((self.play_top() + self.play_bottom() - self.paddle_height) / 2)
    }

    pub fn paddle_top_to_center(&self, top: i32) -> i32 { top + self.paddle_height / 2 }

    pub fn paddle_center_to_top(&self, center: i32) -> i32 {
        self.clamp_paddle_top(center - self.paddle_height / 2)
    }

    pub fn center_x(&self) -> i32 { (self.play_left() + self.play_right()) / 2 }
    pub fn center_y(&self) -> i32 { (self.play_top() + self.play_bottom()) / 2 }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=256).contains(&self.screen_width) {
            return Err(ConfigError::AxisTooLarge { axis: "screen width", extent: self.screen_width });
        }
        if !(1..=256).contains(&self.screen_height) {
            return Err(ConfigError::AxisTooLarge { axis: "screen height", extent: self.screen_height });
        }
        if self.border < 0 || self.ball_radius < 0 || self.paddle_inset < 0 {
            return Err(ConfigError::InvalidGeometry { reason: "negative border, inset or radius" });
        }
        if self.paddle_width <= 0 || self.paddle_height <= 0 || self.paddle_step <= 0 {
            return Err(ConfigError::InvalidGeometry { reason: "paddle dimensions and step must be positive" });
        }
        if self.paddle_top_max() < self.paddle_top_min() {
            return Err(ConfigError::InvalidGeometry { reason: "paddle taller than the playfield" });
        }
        let lane = self.own_paddle_x() - (self.opponent_paddle_x() + self.paddle_width);
        if lane <= 4 * self.ball_radius {
            return Err(ConfigError::InvalidGeometry { reason: "no room for the ball between the paddles" });
        }
        if self.play_bottom() - self.play_top() <= 2 * self.ball_radius {
            return Err(ConfigError::InvalidGeometry { reason: "playfield shorter than the ball" });
        }
        Ok(())
    }
}

/// Per-activity periods in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intervals {
    pub paddle_send_ms: u32,
    pub physics_ms: u32,
    pub paddle_move_ms: u32,
    pub render_ms: u32,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            paddle_send_ms: PADDLE_SEND_INTERVAL_MS,
            physics_ms: PHYSICS_INTERVAL_MS,
            paddle_move_ms: PADDLE_MOVE_INTERVAL_MS,
            render_ms: RENDER_INTERVAL_MS,
        }
    }
}

impl Intervals {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("paddle send", self.paddle_send_ms),
            ("physics", self.physics_ms),
            ("paddle move", self.paddle_move_ms),
            ("render", self.render_ms),
        ];
        for (activity, ms) in named {
            if ms == 0 {
                return Err(ConfigError::ZeroInterval { activity });
            }
        }
        Ok(())
    }
}

/// How followers learn the score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    /// The leader sends Score frames.
    #[default]
    Broadcast,
    /// No Score frames; followers infer points from serve resets and never reconcile.
    Inferred,
}

/// Which received axes are reflected into the receiver's frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub paddle: bool,
    pub ball_x: bool,
    pub ball_y: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self { paddle: false, ball_x: true, ball_y: false }
    }
}

/// Optional Ball payload extensions after the mandatory x, y bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallLayout {
    /// vx, vy as signed bytes in 1/16 pixel per tick.
    pub velocity: bool,
    /// Trailing sender node id, enables loopback filtering.
    pub sender_id: bool,
}

impl BallLayout {
    pub fn payload_len(&self) -> usize {
        2 + if self.velocity { 2 } else { 0 } + usize::from(self.sender_id)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub score_mode: ScoreMode,
    pub mirror: MirrorConfig,
    pub ball_layout: BallLayout,
    /// Leader resends the score this often; 0 sends only on a point.
    pub score_refresh_ms: u32,
}

/// Where a new serve starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServeOrigin {
    #[default]
    Center,
    /// In front of the leader's own paddle, at its center row.
    OwnPaddle,
}

/// Horizontal direction of the serve that follows a point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServeDirection {
    #[default]
    AwayFromConceder,
    TowardConceder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub serve_vx_permille: i32,
    pub serve_vy_permille: i32,
    /// Extra vy per pixel of contact offset from the paddle center; 0 disables spin.
    pub spin_permille: i32,
    pub max_vy_permille: i32,
    pub serve_origin: ServeOrigin,
    pub serve_direction: ServeDirection,
    /// Flip the vy sign on every serve instead of keeping the ball's current sign.
    pub alternate_serve_vy: bool,
    pub initial_serve_direction: i32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            serve_vx_permille: SERVE_VX * 1000,
            serve_vy_permille: SERVE_VY * 1000,
            spin_permille: 0,
            max_vy_permille: MAX_VY_PERMILLE,
            serve_origin: ServeOrigin::default(),
            serve_direction: ServeDirection::default(),
            alternate_serve_vy: false,
            initial_serve_direction: INITIAL_SERVE_DIRECTION,
        }
    }
}

impl PhysicsConfig {
    pub fn serve_vx(&self) -> I { from_permille(self.serve_vx_permille) }
    pub fn serve_vy(&self) -> I { from_permille(self.serve_vy_permille) }
    pub fn spin(&self) -> I { from_permille(self.spin_permille) }
    pub fn max_vy(&self) -> I { from_permille(self.max_vy_permille) }

    pub fn validate(&self, geometry: &Geometry) -> Result<(), ConfigError> {
        if self.serve_vx_permille <= 0 || self.serve_vy_permille < 0 {
            return Err(ConfigError::InvalidPhysics { reason: "serve speeds must be positive" });
        }
        // A ball faster than the paddle is wide can tunnel through it in one tick.
        if self.serve_vx_permille > geometry.paddle_width * 1000 + geometry.ball_radius * 1000 {
            return Err(ConfigError::InvalidPhysics { reason: "serve vx skips over the paddle" });
        }
        if self.spin_permille < 0 {
            return Err(ConfigError::InvalidPhysics { reason: "spin must not be negative" });
        }
        if self.max_vy_permille < self.serve_vy_permille {
            return Err(ConfigError::InvalidPhysics { reason: "max vy below serve vy" });
        }
        if self.initial_serve_direction != 1 && self.initial_serve_direction != -1 {
            return Err(ConfigError::InvalidPhysics { reason: "initial serve direction must be 1 or -1" });
        }
        Ok(())
    }
}

/// Bus identifiers of one installation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameIds {
    pub paddle: u32,
    pub ball: u32,
    pub score: u32,
}

impl FrameIds {
    pub fn from_group(group: u16) -> Self {
        let base = u32::from(group);
        Self {
            paddle: base + u32::from(PADDLE_ID_OFFSET),
            ball: base + u32::from(BALL_ID_OFFSET),
            score: base + u32::from(SCORE_ID_OFFSET),
        }
    }
}

/// Everything one board needs to join a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub group: u16,
    pub node_id: u8,
    pub commit_debounce_ms: u32,
    pub geometry: Geometry,
    pub intervals: Intervals,
    pub protocol: ProtocolConfig,
    pub physics: PhysicsConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            group: GROUP_ID,
            node_id: 0,
            commit_debounce_ms: COMMIT_DEBOUNCE_MS,
            geometry: Geometry::default(),
            intervals: Intervals::default(),
            protocol: ProtocolConfig::default(),
            physics: PhysicsConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn frame_ids(&self) -> FrameIds { FrameIds::from_group(self.group) }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry.validate()?;
        self.intervals.validate()?;
        self.physics.validate(&self.geometry)?;
        let ids = self.frame_ids();
        let highest = ids.paddle.max(ids.ball).max(ids.score);
        if highest > MAX_STANDARD_ID {
            return Err(ConfigError::IdentifierOutOfRange { group: self.group, id: highest });
        }
        if self.protocol.ball_layout.payload_len() > MAX_PAYLOAD {
            return Err(ConfigError::InvalidGeometry { reason: "ball payload exceeds one frame" });
        }
        if self.protocol.ball_layout.velocity {
            let wire_max = (i8::MAX as i32 * 1000) >> VELOCITY_WIRE_FRAC_BITS;
            if self.physics.max_vy_permille > wire_max || self.physics.serve_vx_permille > wire_max {
                return Err(ConfigError::InvalidPhysics { reason: "velocity exceeds the wire byte range" });
            }
        }
        // A paddle serve lands a few pixels from where the point was lost, too close to tell
        // from ordinary motion.
        if self.protocol.score_mode == ScoreMode::Inferred && self.physics.serve_origin == ServeOrigin::OwnPaddle {
            return Err(ConfigError::IncompatibleProtocol { reason: "inferred scoring needs center serves" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployed_board() {
        let g = Geometry::default();
        assert_eq!(g.play_left(), 4);
        assert_eq!(g.play_right(), 123);
        assert_eq!(g.play_top(), 4);
        assert_eq!(g.play_bottom(), 59);
        assert_eq!(g.own_paddle_x(), 119);
        assert_eq!(g.opponent_paddle_x(), 6);
        assert_eq!(g.centered_paddle_top(), 21);
        assert!(NodeConfig::default().validate().is_ok());
    }

    #[test]
    fn identifiers_follow_group_offset() {
        let ids = FrameIds::from_group(5);
        assert_eq!((ids.paddle, ids.ball, ids.score), (25, 55, 60));
    }

    #[test]
    fn group_past_standard_range_is_rejected() {
        let cfg = NodeConfig { group: 2040, ..NodeConfig::default() };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::IdentifierOutOfRange { group: 2040, id: 2095 })
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        let mut cfg = NodeConfig::default();
        cfg.intervals.physics_ms = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroInterval { activity: "physics" }));
    }

    #[test]
    fn inferred_score_with_paddle_serve_is_rejected() {
        let mut cfg = NodeConfig::default();
        cfg.protocol.score_mode = ScoreMode::Inferred;
        assert!(cfg.validate().is_ok());
        cfg.physics.serve_origin = ServeOrigin::OwnPaddle;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::IncompatibleProtocol { reason: "inferred scoring needs center serves" })
        );
        cfg.protocol.score_mode = ScoreMode::Broadcast;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn oversized_screen_is_rejected() {
        let mut cfg = NodeConfig::default();
        cfg.geometry.screen_width = 320;
        assert!(matches!(cfg.validate(), Err(ConfigError::AxisTooLarge { .. })));
    }

    #[test]
    fn paddle_clamp_keeps_paddle_inside() {
        let g = Geometry::default();
        assert_eq!(g.clamp_paddle_top(-10), g.paddle_top_min());
        assert_eq!(g.clamp_paddle_top(200), g.paddle_top_max());
        assert_eq!(g.paddle_center_to_top(g.paddle_top_to_center(30)), 30);
    }

    #[test]
    fn ball_layout_lengths() {
        assert_eq!(BallLayout::default().payload_len(), 2);
        assert_eq!(BallLayout { velocity: true, sender_id: false }.payload_len(), 4);
        assert_eq!(BallLayout { velocity: true, sender_id: true }.payload_len(), 5);
    }
}
