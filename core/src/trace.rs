use sha2::{Digest, Sha256};

use crate::types::BallState;

const TRACE_PREFIX: &[u8] = b"CANPONGv1";

/// Running SHA-256 over a ball trajectory. Two leaders fed the same inputs must agree on it.
#[derive(Clone)]
pub struct TraceDigest {
    h: Sha256,
    samples: u64,
}

impl Default for TraceDigest {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceDigest {
    pub fn new() -> Self {
        let mut h = Sha256::new();
        h.update(TRACE_PREFIX);
        Self { h, samples: 0 }
    }

    /// x, y, vx, vy as little-endian 8 bytes each
    pub fn push(&mut self, ball: &BallState) {
        let mut buf = [0u8; 32];
        buf[0..8].copy_from_slice(&ball.x.to_le_bytes());
        buf[8..16].copy_from_slice(&ball.y.to_le_bytes());
        buf[16..24].copy_from_slice(&ball.vx.to_le_bytes());
        buf[24..32].copy_from_slice(&ball.vy.to_le_bytes());
        self.h.update(buf);
        self.samples += 1;
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn finish(self) -> [u8; 32] {
        let out = self.h.finalize();
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&out);
        arr
    }
}

/// Digest of a complete trajectory.
pub fn compute_trace_hash(samples: &[BallState]) -> [u8; 32] {
    let mut d = TraceDigest::new();
    for s in samples {
        d.push(s);
    }
    d.finish()
}
