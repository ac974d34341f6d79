use alloc::collections::VecDeque;
use alloc::vec::Vec;
use thiserror::Error;

use crate::types::BusFrame;

/// A transmit the bus controller refused. The next periodic send covers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("bus is off")]
    BusOff,
    #[error("transmit mailbox full")]
    TxQueueFull,
}

/// Shared broadcast bus, unordered and unacknowledged. Both calls must return immediately.
pub trait BusAdapter {
    /// Queues one frame for transmission, fire-and-forget.
    fn send(&mut self, frame: &BusFrame) -> Result<(), SendError>;

    /// Returns every frame received since the previous call.
    fn poll_received(&mut self) -> Vec<BusFrame>;
}

/// Bounded receive buffer between the controller's delivery callback and the control loop.
///
/// The owner must not let a delivery re-enter `push` while one is running. On overflow the
/// oldest frame is dropped, so the loop always sees the most recent state.
#[derive(Clone, Debug)]
pub struct RxQueue {
    frames: VecDeque<BusFrame>,
    capacity: usize,
    overflowed: u64,
}

impl RxQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { frames: VecDeque::with_capacity(capacity), capacity, overflowed: 0 }
    }

    pub fn push(&mut self, frame: BusFrame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
            self.overflowed += 1;
        }
        self.frames.push_back(frame);
    }

    pub fn drain(&mut self) -> Vec<BusFrame> {
        self.frames.drain(..).collect()
    }

    pub fn len(&self) -> usize { self.frames.len() }
    pub fn is_empty(&self) -> bool { self.frames.is_empty() }

    /// Frames lost to overflow since creation.
    pub fn overflowed(&self) -> u64 { self.overflowed }
}
