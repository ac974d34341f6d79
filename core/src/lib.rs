//! Link and game core for a pair of CAN Pong boards.
//!
//! Two boards share one broadcast bus and nothing else: no clock sync, no acknowledgments,
//! one to five payload bytes per message. The first board whose commit button is pressed
//! becomes leader and runs the ball physics; both boards broadcast their own paddle and
//! mirror what they receive into their own right-hand perspective.
//!
//! | Module | Purpose |
//! | ------ | ------- |
//! | [`link`] | Paddle / Ball / Score frame codec and coordinate mirroring |
//! | [`timing`] | Interval gating on a wrapping millisecond clock |
//! | [`election`] | First-press leader election |
//! | [`physics`] | Deterministic leader-only ball simulation |
//! | [`sync`] | The per-iteration control pass that owns the game state |

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod bus;
pub mod config;
pub mod constants;
pub mod election;
pub mod error;
pub mod fixed;
pub mod input;
pub mod link;
pub mod physics;
pub mod sync;
pub mod timing;
pub mod trace;
pub mod types;

pub use bus::{BusAdapter, RxQueue, SendError};
pub use config::{
    BallLayout, FrameIds, Geometry, Intervals, MirrorConfig, NodeConfig, PhysicsConfig, ProtocolConfig,
    ScoreMode, ServeDirection, ServeOrigin,
};
pub use election::{LeaderElection, RoleChange};
pub use error::ConfigError;
pub use input::{Channel, InputSource, Level};
pub use link::{Inbound, LinkCodec};
pub use physics::{PhysicsEngine, TickOutput};
pub use sync::{IterationReport, Synchronizer};
pub use timing::{due_since, Clock, Periodic};
pub use trace::{compute_trace_hash, TraceDigest};
pub use types::{BallState, BallView, BusFrame, GameState, NodeRole, PaddleState, Renderer, ScoreState, Side, Snapshot};
