use thiserror::Error;

/// Rejected node configuration. A board refuses to start with one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: &'static str },

    /// A display axis does not fit a single wire byte.
    #[error("{axis} extent {extent} does not fit one wire byte (max 256)")]
    AxisTooLarge { axis: &'static str, extent: i32 },

    #[error("group {group} puts identifier {id:#x} outside the 11-bit range")]
    IdentifierOutOfRange { group: u16, id: u32 },

    #[error("{activity} interval must be non-zero")]
    ZeroInterval { activity: &'static str },

    #[error("invalid physics: {reason}")]
    InvalidPhysics { reason: &'static str },

    /// Two protocol settings that cannot work together.
    #[error("incompatible protocol settings: {reason}")]
    IncompatibleProtocol { reason: &'static str },
}
