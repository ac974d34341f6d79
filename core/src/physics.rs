use crate::config::{Geometry, PhysicsConfig, ServeDirection, ServeOrigin};
use crate::fixed::*;
use crate::types::{BallState, GameState, PaddleState, ScoreState, ServeMemory, Side};

/// Result of one physics tick. The caller writes it back into the game state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickOutput {
    pub ball: BallState,
    pub score: ScoreState,
    pub serve: ServeMemory,
    /// Side credited with a point on this tick.
    pub scored: Option<Side>,
    /// Paddle the ball bounced off on this tick.
    pub paddle_hit: Option<Side>,
}

/// Leader-only ball simulation. Deterministic: no clock, no randomness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysicsEngine {
    cfg: PhysicsConfig,
    radius: I,
    x_min: I,
    x_max: I,
    y_min: I,
    y_max: I,
    left_face: I,
    right_face: I,
    paddle_height: I,
    center_x: i32,
    center_y: i32,
    serve_gap: i32,
    own_paddle_x: i32,
}

impl PhysicsEngine {
    pub fn new(geometry: &Geometry, cfg: &PhysicsConfig) -> Self {
        let radius = to_fixed_int(geometry.ball_radius);
        Self {
            cfg: *cfg,
            radius,
            x_min: to_fixed_int(geometry.play_left()) + radius,
            x_max: to_fixed_int(geometry.play_right()) - radius,
            y_min: to_fixed_int(geometry.play_top()) + radius,
            y_max: to_fixed_int(geometry.play_bottom()) - radius,
            left_face: to_fixed_int(geometry.opponent_paddle_x() + geometry.paddle_width),
            right_face: to_fixed_int(geometry.own_paddle_x()),
            paddle_height: to_fixed_int(geometry.paddle_height),
            center_x: geometry.center_x(),
            center_y: geometry.center_y(),
            serve_gap: geometry.ball_radius + 2,
            own_paddle_x: geometry.own_paddle_x(),
        }
    }

    /// First serve of a session, toward the configured side with a downward vy.
    pub fn initial_serve(&self, own: &PaddleState) -> (BallState, ServeMemory) {
        let toward = if self.cfg.initial_serve_direction < 0 { Side::Left } else { Side::Right };
        let memory = ServeMemory { last_vy_sign: 1 };
        (self.place_serve(toward, 1, own), memory)
    }

    /// Serve that follows a point conceded by `conceder`.
    pub fn serve_after_point(
        &self,
        conceder: Side,
        own: &PaddleState,
        vy_at_score: I,
        memory: ServeMemory,
    ) -> (BallState, ServeMemory) {
        let toward = match (self.cfg.serve_origin, self.cfg.serve_direction) {
            // Serving from the own paddle only makes sense toward the opponent.
            (ServeOrigin::OwnPaddle, _) => Side::Left,
            (ServeOrigin::Center, ServeDirection::AwayFromConceder) => conceder.opposite(),
            (ServeOrigin::Center, ServeDirection::TowardConceder) => conceder,
        };
        let vy_sign = if self.cfg.alternate_serve_vy {
            -memory.last_vy_sign
        } else if vy_at_score >= 0 {
            1
        } else {
            -1
        };
        (self.place_serve(toward, vy_sign, own), ServeMemory { last_vy_sign: vy_sign })
    }

    fn place_serve(&self, toward: Side, vy_sign: i32, own: &PaddleState) -> BallState {
        let vx = self.cfg.serve_vx() * toward.direction() as I;
        let vy = self.cfg.serve_vy() * vy_sign as I;
        let (x, y) = match self.cfg.serve_origin {
            ServeOrigin::Center => (self.center_x, self.center_y),
            ServeOrigin::OwnPaddle => (self.own_paddle_x - self.serve_gap, own.center()),
        };
        let mut ball = BallState::at_pixel(x, y, vx, vy);
        ball.y = i_clamp(ball.y, self.y_min, self.y_max);
        ball
    }

    /// Advances the ball by one tick. The left paddle is the opponent's, the right one is ours.
    pub fn step(&self, game: &GameState) -> TickOutput {
        let mut b = game.ball;
        let mut score = game.score;
        let mut serve = game.serve;

        b.x += b.vx;
        b.y += b.vy;

        if b.y <= self.y_min {
            b.y = self.y_min;
            b.vy = i_abs(b.vy);
        }
        if b.y >= self.y_max {
            b.y = self.y_max;
            b.vy = -i_abs(b.vy);
        }

        let mut paddle_hit = None;
        if b.vx < 0 && b.x - self.radius <= self.left_face && self.within(&game.opponent, b.y) {
            b.x = self.left_face + self.radius;
            b.vx = i_abs(b.vx);
            b.vy = self.spin(b.vy, b.y, &game.opponent);
            paddle_hit = Some(Side::Left);
        } else if b.vx > 0 && b.x + self.radius >= self.right_face && self.within(&game.own, b.y) {
            b.x = self.right_face - self.radius;
            b.vx = -i_abs(b.vx);
            b.vy = self.spin(b.vy, b.y, &game.own);
            paddle_hit = Some(Side::Right);
        }

        let scored = if b.x < self.x_min {
            Some(Side::Right)
        } else if b.x > self.x_max {
            Some(Side::Left)
        } else {
            None
        };

        match scored {
            Some(scorer) => {
                score.credit(scorer);
                tracing::info!(left = score.left, right = score.right, "point for {:?}", scorer);
                let (next, memory) = self.serve_after_point(scorer.opposite(), &game.own, b.vy, serve);
                b = next;
                serve = memory;
            }
            None => b.x = i_clamp(b.x, self.x_min, self.x_max),
        }

        TickOutput { ball: b, score, serve, scored, paddle_hit }
    }

    fn within(&self, paddle: &PaddleState, y: I) -> bool {
        let top = to_fixed_int(paddle.top);
        y >= top && y <= top + self.paddle_height
    }

    fn spin(&self, vy: I, y: I, paddle: &PaddleState) -> I {
        if self.cfg.spin_permille == 0 {
            return vy;
        }
        let center = to_fixed_int(paddle.top) + self.paddle_height / 2;
        let max = self.cfg.max_vy();
        i_clamp(vy + i_mul(y - center, self.cfg.spin()), -max, max)
    }
}
