use canpong_core::{
    Channel, Clock, ConfigError, IterationReport, NodeConfig, NodeRole, RoleChange, ScoreState, Snapshot,
    Synchronizer, TraceDigest,
};
use serde::{Deserialize, Serialize};

use crate::devices::{AutoPilot, ScriptedInput, SimTime, SkewedClock, SnapshotLog};
use crate::sim_bus::{BusPort, BusStats, SimBus};

/// How a simulated pair is wired and played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub loss_permille: u32,
    pub seed: u32,
    /// Echo each node's frames back to it. See [`SimBus::with_loopback`] for what breaks.
    pub loopback: bool,
    /// Session time at which each player clicks commit. `None` never clicks.
    pub commit_at_ms: [Option<u64>; 2],
    pub commit_hold_ms: u64,
    pub clock_offset_ms: [u32; 2],
    pub drift_permille: [i32; 2],
    pub dead_zone_px: i32,
    /// Largest per-axis gap between the follower's ball and the leader's that still counts
    /// as agreement.
    pub agreement_tolerance_px: i32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            loss_permille: 0,
            seed: 0x5EED,
            loopback: false,
            commit_at_ms: [Some(200), None],
            commit_hold_ms: 300,
            clock_offset_ms: [0, 7_919],
            drift_permille: [0, 2],
            dead_zone_px: 2,
            agreement_tolerance_px: 3,
        }
    }
}

/// Per-node totals over a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    pub role: NodeRole,
    pub score: ScoreState,
    pub frames_sent: u64,
    pub frames_applied: u64,
    pub frames_dropped: u64,
    pub send_failures: u64,
    pub physics_ticks: u64,
    pub points: u64,
    pub renders: u64,
    pub trace_samples: u64,
    /// Hex SHA-256 over every ball state this node computed as leader.
    pub trace_digest: Option<String>,
}

impl NodeReport {
    fn absorb(&mut self, r: &IterationReport) {
        self.frames_sent += u64::from(r.frames_sent);
        self.frames_applied += u64::from(r.frames_applied);
        self.frames_dropped += u64::from(r.frames_dropped);
        self.send_failures += u64::from(r.send_failures);
        self.physics_ticks += u64::from(r.physics_ran);
        self.points += u64::from(r.scored.is_some());
        self.renders += u64::from(r.rendered);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub elapsed_ms: u64,
    pub options: SessionOptions,
    pub nodes: Vec<NodeReport>,
    pub bus: BusStats,
    pub view_samples: u64,
    /// Share of samples, in thousandths, where the follower drew the leader's ball.
    pub view_agreement_permille: u64,
    pub leader_trace: Option<String>,
}

impl SessionReport {
    pub fn leaders(&self) -> usize {
        self.nodes.iter().filter(|n| n.role == NodeRole::Leader).count()
    }
}

struct Node {
    sync: Synchronizer,
    port: BusPort,
    clock: SkewedClock,
    pilot: AutoPilot,
    screen: SnapshotLog,
    totals: NodeReport,
    trace: TraceDigest,
}

/// Two boards on one simulated bus, stepped one millisecond at a time.
pub struct PairSession {
    time: SimTime,
    bus: SimBus,
    nodes: [Node; 2],
    options: SessionOptions,
    view_samples: u64,
    view_agreed: u64,
}

impl PairSession {
    /// Both boards share `base`; they get node ids 1 and 2.
    pub fn new(base: &NodeConfig, options: SessionOptions) -> Result<Self, ConfigError> {
        let mut a = *base;
        let mut b = *base;
        a.node_id = 1;
        b.node_id = 2;
        Self::with_configs([a, b], options)
    }

    pub fn with_configs(configs: [NodeConfig; 2], options: SessionOptions) -> Result<Self, ConfigError> {
        let time = SimTime::new();
        let bus = SimBus::new(options.loss_permille, options.seed).with_loopback(options.loopback);
        let [a, b] = configs;
        let nodes = [
            Self::build_node(0, a, &time, &bus, &options)?,
            Self::build_node(1, b, &time, &bus, &options)?,
        ];
        tracing::info!(loss_permille = options.loss_permille, seed = options.seed, "pair session ready");
        Ok(Self { time, bus, nodes, options, view_samples: 0, view_agreed: 0 })
    }

    fn build_node(
        i: usize,
        config: NodeConfig,
        time: &SimTime,
        bus: &SimBus,
        options: &SessionOptions,
    ) -> Result<Node, ConfigError> {
        let clock = SkewedClock::new(time.clone(), options.clock_offset_ms[i], options.drift_permille[i]);
        let mut buttons = ScriptedInput::new(time.clone());
        if let Some(at) = options.commit_at_ms[i] {
            buttons = buttons.press(at, options.commit_hold_ms, Channel::Commit);
        }
        let pilot = AutoPilot::new(config.geometry.paddle_height, options.dead_zone_px).with_buttons(buttons);
        Ok(Node {
            sync: Synchronizer::new(config, clock.now_ms())?,
            port: bus.attach(),
            clock,
            pilot,
            screen: SnapshotLog::default(),
            totals: NodeReport::default(),
            trace: TraceDigest::new(),
        })
    }

    pub fn bus(&self) -> &SimBus {
        &self.bus
    }

    pub fn node(&self, i: usize) -> &Synchronizer {
        &self.nodes[i].sync
    }

    pub fn last_frame(&self, i: usize) -> Option<Snapshot> {
        self.nodes[i].screen.last
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.time.now()
    }

    /// Takes node `i` off the bus for sending. It keeps receiving.
    pub fn set_offline(&self, i: usize, offline: bool) {
        self.bus.set_offline(self.nodes[i].port.index(), offline);
    }

    /// One simulated millisecond: each node runs one loop iteration on its own clock.
    pub fn step(&mut self) {
        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.pilot.observe(node.sync.snapshot());
            let now = node.clock.now_ms();
            let r = node.sync.run_iteration(now, &mut node.port, &node.pilot, &mut node.screen);
            if r.role_change != RoleChange::Unchanged {
                tracing::debug!(node = i, at_ms = self.time.now(), "role settled: {}", node.sync.role());
            }
            if r.physics_ran {
                node.trace.push(&node.sync.state().ball);
            }
            node.totals.absorb(&r);
        }
        self.sample_views();
        self.time.advance(1);
    }

    pub fn run(&mut self, duration_ms: u64) -> SessionReport {
        for _ in 0..duration_ms {
            self.step();
        }
        let report = self.report();
        tracing::info!(
            elapsed_ms = report.elapsed_ms,
            leaders = report.leaders(),
            agreement = report.view_agreement_permille,
            "session finished"
        );
        report
    }

    fn sample_views(&mut self) {
        let (a, b) = (&self.nodes[0].sync, &self.nodes[1].sync);
        let (leader, follower) = match (a.role(), b.role()) {
            (NodeRole::Leader, NodeRole::Follower) => (a, b),
            (NodeRole::Follower, NodeRole::Leader) => (b, a),
            _ => return,
        };
        let view = follower.state().view;
        if !view.visible {
            return;
        }
        // What the follower would draw had it heard the leader's latest ball.
        let frame = leader.codec().encode_ball(&leader.state().ball);
        let Some(expected) = follower.codec().decode_ball(&frame) else { return };
        let tol = self.options.agreement_tolerance_px;
        self.view_samples += 1;
        if (view.x - expected.x).abs() <= tol && (view.y - expected.y).abs() <= tol {
            self.view_agreed += 1;
        }
    }

    pub fn report(&self) -> SessionReport {
        let nodes: Vec<NodeReport> = self
            .nodes
            .iter()
            .map(|n| {
                let mut r = n.totals.clone();
                r.role = n.sync.role();
                r.score = n.sync.state().score;
                r.trace_samples = n.trace.samples();
                if r.trace_samples > 0 {
                    r.trace_digest = Some(hex::encode(n.trace.clone().finish()));
                }
                r
            })
            .collect();
        let leader_trace = nodes.iter().find(|n| n.role == NodeRole::Leader).and_then(|n| n.trace_digest.clone());
        let view_agreement_permille = if self.view_samples == 0 { 0 } else { self.view_agreed * 1000 / self.view_samples };
        SessionReport {
            elapsed_ms: self.time.now(),
            options: self.options.clone(),
            nodes,
            bus: self.bus.stats(),
            view_samples: self.view_samples,
            view_agreement_permille,
            leader_trace,
        }
    }
}
