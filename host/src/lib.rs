//! Desktop harness for the CAN Pong link: two simulated boards on a lossy shared bus.

use std::fs;
use std::path::Path;

use canpong_core::NodeConfig;

pub mod devices;
pub mod session;
pub mod sim_bus;

pub use devices::{AutoPilot, InputStep, ScriptedInput, SimTime, SkewedClock, SnapshotLog};
pub use session::{NodeReport, PairSession, SessionOptions, SessionReport};
pub use sim_bus::{BusPort, BusStats, SimBus};

// Config files are tiny; anything bigger is not one.
const MAX_CONFIG_SIZE: u64 = 64 * 1024;

/// Reads and validates a node configuration. Missing fields take the firmware defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<NodeConfig, Box<dyn std::error::Error>> {
    let path = path.as_ref();
    let size = fs::metadata(path)?.len();
    if size > MAX_CONFIG_SIZE {
        return Err(format!("config file too large: {} bytes (max {})", size, MAX_CONFIG_SIZE).into());
    }
    let json = fs::read_to_string(path)?;
    let config: NodeConfig = serde_json::from_str(&json)?;
    config.validate()?;
    tracing::debug!(path = %path.display(), group = config.group, "config loaded");
    Ok(config)
}

/// Runs one pair session from a base config and returns its report.
pub fn simulate(
    config: &NodeConfig,
    options: SessionOptions,
    duration_ms: u64,
) -> Result<SessionReport, Box<dyn std::error::Error>> {
    let mut session = PairSession::new(config, options)?;
    Ok(session.run(duration_ms))
}

pub fn save_report(report: &SessionReport, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_report(path: impl AsRef<Path>) -> Result<SessionReport, Box<dyn std::error::Error>> {
    let json = fs::read_to_string(path)?;
    let report: SessionReport = serde_json::from_str(&json)?;
    Ok(report)
}
