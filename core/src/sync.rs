//! The per-iteration control pass of one node.
//!
//! [`Synchronizer`] owns the [`GameState`] and is the only code that writes to it. Each
//! call to [`Synchronizer::run_iteration`] makes one bounded, non-blocking pass:
//!
//! 1. drain inbound frames and apply them (last value wins),
//! 2. leader election against the commit input,
//! 3. own paddle motion, if due,
//! 4. own paddle broadcast, if due,
//! 5. leader only: physics tick, Ball broadcast, Score broadcast on a point,
//! 6. render, if due.
//!
//! Motion precedes transmission so the freshest paddle position is what goes out.

use crate::bus::BusAdapter;
use crate::config::{NodeConfig, ScoreMode};
use crate::election::{LeaderElection, RoleChange};
use crate::error::ConfigError;
use crate::fixed::to_fixed_int;
use crate::input::{Channel, Debouncer, InputSource};
use crate::link::{BallUpdate, Inbound, LinkCodec};
use crate::physics::PhysicsEngine;
use crate::timing::Schedule;
use crate::types::{BallView, BusFrame, GameState, NodeRole, Renderer, Side, Snapshot};

/// What one iteration did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IterationReport {
    pub role_change: RoleChange,
    pub frames_applied: u32,
    pub frames_dropped: u32,
    pub frames_sent: u32,
    pub send_failures: u32,
    pub physics_ran: bool,
    pub scored: Option<Side>,
    pub rendered: bool,
}

pub struct Synchronizer {
    config: NodeConfig,
    codec: LinkCodec,
    physics: PhysicsEngine,
    election: LeaderElection,
    state: GameState,
    schedule: Schedule,
    commit: Debouncer,
}

impl Synchronizer {
    /// Builds a node in the `Undecided` role. An invalid configuration is fatal for the board.
    pub fn new(config: NodeConfig, now_ms: u32) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::info!(
            group = config.group,
            node_id = config.node_id,
            "node ready, press commit to become leader"
        );
        Ok(Self {
            codec: LinkCodec::new(&config),
            physics: PhysicsEngine::new(&config.geometry, &config.physics),
            election: LeaderElection::new(),
            state: GameState::new(&config.geometry),
            schedule: Schedule::new(&config.intervals, config.protocol.score_refresh_ms, now_ms),
            commit: Debouncer::new(config.commit_debounce_ms, now_ms),
            config,
        })
    }

    pub fn config(&self) -> &NodeConfig { &self.config }
    pub fn codec(&self) -> &LinkCodec { &self.codec }
    pub fn state(&self) -> &GameState { &self.state }
    pub fn role(&self) -> NodeRole { self.election.role() }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            role: self.election.role(),
            own_top: self.state.own.top,
            opponent_top: self.state.opponent.top,
            ball: self.state.view,
            score: self.state.score,
        }
    }

    pub fn run_iteration<B, S, R>(
        &mut self,
        now_ms: u32,
        bus: &mut B,
        input: &S,
        renderer: &mut R,
    ) -> IterationReport
    where
        B: BusAdapter,
        S: InputSource,
        R: Renderer,
    {
        let mut report = IterationReport::default();

        for frame in bus.poll_received() {
            self.apply(&frame, &mut report);
        }

        let commit = self.commit.update(input.read_digital(Channel::Commit), now_ms);
        if self.election.try_become_leader(commit.is_pressed()) == RoleChange::BecameLeader {
            self.start_serving(now_ms);
            report.role_change = RoleChange::BecameLeader;
        }

        if self.schedule.paddle_move.poll(now_ms) {
            self.move_own_paddle(input);
        }

        if self.schedule.paddle_send.poll(now_ms) {
            let center = self.config.geometry.paddle_top_to_center(self.state.own.top);
            let frame = self.codec.encode_paddle(center);
            Self::transmit(bus, &frame, &mut report);
        }

        if self.election.is_leader() {
            self.lead(now_ms, bus, &mut report);
        }

        if self.schedule.render.poll(now_ms) {
            renderer.render(&self.snapshot());
            report.rendered = true;
        }

        report
    }

    fn lead<B: BusAdapter>(&mut self, now_ms: u32, bus: &mut B, report: &mut IterationReport) {
        let broadcast_score = self.config.protocol.score_mode == ScoreMode::Broadcast;

        if self.schedule.physics.poll(now_ms) {
            let out = self.physics.step(&self.state);
            self.state.ball = out.ball;
            self.state.score = out.score;
            self.state.serve = out.serve;
            self.show_authoritative_ball();
            report.physics_ran = true;
            report.scored = out.scored;

            let frame = self.codec.encode_ball(&self.state.ball);
            Self::transmit(bus, &frame, report);

            if out.scored.is_some() && broadcast_score {
                let frame = self.codec.encode_score(&self.state.score);
                Self::transmit(bus, &frame, report);
                if let Some(refresh) = self.schedule.score_refresh.as_mut() {
                    refresh.reset(now_ms);
                }
            }
        }

        if broadcast_score {
            if let Some(refresh) = self.schedule.score_refresh.as_mut() {
                if refresh.poll(now_ms) {
                    tracing::debug!(left = self.state.score.left, right = self.state.score.right, "score refresh");
                    let frame = self.codec.encode_score(&self.state.score);
                    Self::transmit(bus, &frame, report);
                }
            }
        }
    }

    fn start_serving(&mut self, now_ms: u32) {
        let (ball, serve) = self.physics.initial_serve(&self.state.own);
        self.state.ball = ball;
        self.state.serve = serve;
        self.show_authoritative_ball();
        self.schedule.physics.reset(now_ms);
        tracing::debug!(x = ball.pixel_x(), y = ball.pixel_y(), "first serve");
    }

    fn show_authoritative_ball(&mut self) {
        let b = self.state.ball;
        self.state.view = BallView {
            x: b.pixel_x(),
            y: b.pixel_y(),
            visible: true,
            velocity: Some((b.vx, b.vy)),
        };
    }

    fn move_own_paddle<S: InputSource>(&mut self, input: &S) {
        let up = input.read_digital(Channel::Up).is_pressed();
        let down = input.read_digital(Channel::Down).is_pressed();
        let step = self.config.geometry.paddle_step;
        let top = match (up, down) {
            (true, false) => self.state.own.top - step,
            (false, true) => self.state.own.top + step,
            _ => self.state.own.top,
        };
        self.state.own.top = self.config.geometry.clamp_paddle_top(top);
    }

    fn apply(&mut self, frame: &BusFrame, report: &mut IterationReport) {
        match self.codec.decode(frame) {
            Ok(Inbound::Paddle(center)) => {
                self.state.opponent.top = self.config.geometry.paddle_center_to_top(center);
            }
            Ok(Inbound::Ball(update)) => {
                if self.election.observe_remote_leader() == RoleChange::BecameFollower {
                    report.role_change = RoleChange::BecameFollower;
                }
                self.apply_ball(update);
            }
            Ok(Inbound::Score(score)) => {
                // The sender draws itself on the right.
                self.state.score = score.seen_from_peer();
            }
            Err(reason) => {
                tracing::trace!(?reason, id = frame.id, "frame dropped");
                report.frames_dropped += 1;
                return;
            }
        }
        report.frames_applied += 1;
    }

    fn apply_ball(&mut self, update: BallUpdate) {
        if self.config.protocol.score_mode == ScoreMode::Inferred && !self.election.is_leader() {
            self.infer_point(&update);
        }

        self.state.view = BallView { x: update.x, y: update.y, visible: true, velocity: update.velocity };

        if self.election.is_leader() {
            // Only reachable with two leaders: the latest writer's ball wins.
            tracing::warn!("ball frame from another leader, adopting it");
            self.state.ball.x = to_fixed_int(update.x);
            self.state.ball.y = to_fixed_int(update.y);
            if let Some((vx, vy)) = update.velocity {
                self.state.ball.vx = vx;
                self.state.ball.vy = vy;
            }
        }
    }

    /// Credits a point when the ball view jumps by more than a quarter of the playfield, which
    /// only a center serve does. The side the ball was closest to conceded.
    fn infer_point(&mut self, update: &BallUpdate) {
        let prev = self.state.view;
        if !prev.visible {
            return;
        }
        let geometry = &self.config.geometry;
        let threshold = (geometry.play_right() - geometry.play_left()) / 4;
        if (update.x - prev.x).abs() <= threshold {
            return;
        }
        let conceder = if prev.x < geometry.center_x() { Side::Left } else { Side::Right };
        self.state.score.credit(conceder.opposite());
        tracing::info!(
            left = self.state.score.left,
            right = self.state.score.right,
            "inferred point for {:?}",
            conceder.opposite()
        );
    }

    fn transmit<B: BusAdapter>(bus: &mut B, frame: &BusFrame, report: &mut IterationReport) {
        match bus.send(frame) {
            Ok(()) => report.frames_sent += 1,
            Err(e) => {
                tracing::warn!(id = frame.id, error = %e, "send failed, next cycle resends");
                report.send_failures += 1;
            }
        }
    }
}
