// Deployed board defaults. Both nodes of a pair must be flashed with matching values.

/// Display width (pixels)
pub const SCREEN_WIDTH: i32 = 128;

/// Display height (pixels)
pub const SCREEN_HEIGHT: i32 = 64;

/// Frame border thickness (pixels)
pub const BORDER: i32 = 3;

/// Paddle width (pixels)
pub const PADDLE_WIDTH: i32 = 2;

/// Paddle height (pixels)
pub const PADDLE_HEIGHT: i32 = 20;

/// Gap between a paddle and the playfield edge behind it (pixels)
pub const PADDLE_INSET: i32 = 2;

/// Ball radius (pixels)
pub const BALL_RADIUS: i32 = 2;

/// Pixels the own paddle moves per motion step
pub const PADDLE_STEP: i32 = 1;

/// Bus group number; identifiers are derived from it
pub const GROUP_ID: u16 = 5;

pub const PADDLE_ID_OFFSET: u16 = 20;
pub const BALL_ID_OFFSET: u16 = 50;
pub const SCORE_ID_OFFSET: u16 = 55;

/// Highest 11-bit standard identifier
pub const MAX_STANDARD_ID: u32 = 0x7FF;

/// Maximum payload of one bus frame (bytes)
pub const MAX_PAYLOAD: usize = 8;

pub const PADDLE_SEND_INTERVAL_MS: u32 = 40;
pub const PHYSICS_INTERVAL_MS: u32 = 10;
pub const PADDLE_MOVE_INTERVAL_MS: u32 = 15;
pub const RENDER_INTERVAL_MS: u32 = 33;

/// Commit button must read stable this long before it counts
pub const COMMIT_DEBOUNCE_MS: u32 = 150;

/// Serve velocity, pixels per physics tick
pub const SERVE_VX: i32 = 1;
pub const SERVE_VY: i32 = 1;

/// Initial serve direction: 1 = right, -1 = left (toward the opponent)
pub const INITIAL_SERVE_DIRECTION: i32 = -1;

/// Vertical speed ceiling, pixels per tick, in thousandths
pub const MAX_VY_PERMILLE: i32 = 3000;

/// Wire velocity unit is 1/16 pixel per tick
pub const VELOCITY_WIRE_FRAC_BITS: u32 = 4;

/// Receive queue depth on the bus controller
pub const RX_QUEUE_DEPTH: usize = 256;
