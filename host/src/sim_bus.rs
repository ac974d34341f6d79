use std::cell::RefCell;
use std::rc::Rc;

use canpong_core::constants::RX_QUEUE_DEPTH;
use canpong_core::{BusAdapter, BusFrame, RxQueue, SendError};
use serde::{Deserialize, Serialize};

/// Counters kept by the simulated medium.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    /// Frames accepted for transmission.
    pub sent: u64,
    /// Frame copies that reached a receive queue.
    pub delivered: u64,
    /// Frame copies dropped by the loss model.
    pub lost: u64,
    /// Sends refused because the port was offline.
    pub rejected: u64,
    /// Frames evicted from a full receive queue.
    pub overflowed: u64,
}

/// 32-bit LCG, deterministic per seed.
#[derive(Debug, Clone)]
struct Lcg {
    state: u32,
}

impl Lcg {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.state
    }

    /// Uniform in 0..1000.
    fn permille(&mut self) -> u32 {
        (self.next_u32() >> 8) % 1000
    }
}

struct Port {
    rx: RxQueue,
    offline: bool,
}

struct Medium {
    ports: Vec<Port>,
    rng: Lcg,
    loss_permille: u32,
    loopback: bool,
    stats: BusStats,
}

impl Medium {
    fn broadcast(&mut self, from: usize, frame: &BusFrame) {
        self.stats.sent += 1;
        for i in 0..self.ports.len() {
            if i == from && !self.loopback {
                continue;
            }
            if self.loss_permille > 0 && self.rng.permille() < self.loss_permille {
                self.stats.lost += 1;
                continue;
            }
            let rx = &mut self.ports[i].rx;
            let before = rx.overflowed();
            rx.push(*frame);
            self.stats.overflowed += rx.overflowed() - before;
            self.stats.delivered += 1;
        }
    }
}

/// Shared broadcast medium. Every attached port hears every frame, minus the ones the loss
/// model eats. Single-threaded: the session steps all ports from one loop.
#[derive(Clone)]
pub struct SimBus {
    medium: Rc<RefCell<Medium>>,
}

impl SimBus {
    pub fn new(loss_permille: u32, seed: u32) -> Self {
        Self {
            medium: Rc::new(RefCell::new(Medium {
                ports: Vec::new(),
                rng: Lcg::new(seed),
                loss_permille: loss_permille.min(1000),
                loopback: false,
                stats: BusStats::default(),
            })),
        }
    }

    /// Deliver a sender's own frames back to it, as controllers in loopback mode do.
    ///
    /// Only Ball frames can carry a sender id. A node on a loopback bus takes its own Paddle
    /// frames for the opponent's, so the paddle drawn opposite and used for the leader's
    /// collisions is wrong. Use it to exercise Ball filtering, not to play.
    pub fn with_loopback(self, loopback: bool) -> Self {
        self.medium.borrow_mut().loopback = loopback;
        self
    }

    pub fn attach(&self) -> BusPort {
        let mut medium = self.medium.borrow_mut();
        medium.ports.push(Port { rx: RxQueue::with_capacity(RX_QUEUE_DEPTH), offline: false });
        BusPort { index: medium.ports.len() - 1, medium: Rc::clone(&self.medium) }
    }

    /// An offline port refuses to send. It still receives.
    pub fn set_offline(&self, port: usize, offline: bool) {
        if let Some(p) = self.medium.borrow_mut().ports.get_mut(port) {
            p.offline = offline;
            tracing::debug!(port, offline, "port state changed");
        }
    }

    pub fn stats(&self) -> BusStats {
        self.medium.borrow().stats
    }
}

/// One node's connection to a [`SimBus`].
pub struct BusPort {
    index: usize,
    medium: Rc<RefCell<Medium>>,
}

impl BusPort {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl BusAdapter for BusPort {
    fn send(&mut self, frame: &BusFrame) -> Result<(), SendError> {
        let mut medium = self.medium.borrow_mut();
        if medium.ports[self.index].offline {
            medium.stats.rejected += 1;
            return Err(SendError::BusOff);
        }
        medium.broadcast(self.index, frame);
        Ok(())
    }

    fn poll_received(&mut self) -> Vec<BusFrame> {
        self.medium.borrow_mut().ports[self.index].rx.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_reach_every_other_port() {
        let bus = SimBus::new(0, 1);
        let mut a = bus.attach();
        let mut b = bus.attach();
        let mut c = bus.attach();
        a.send(&BusFrame::new(25, &[7])).unwrap();
        assert!(a.poll_received().is_empty());
        assert_eq!(b.poll_received(), vec![BusFrame::new(25, &[7])]);
        assert_eq!(c.poll_received().len(), 1);
        assert_eq!(bus.stats().delivered, 2);
    }

    #[test]
    fn loopback_returns_own_frames() {
        let bus = SimBus::new(0, 1).with_loopback(true);
        let mut a = bus.attach();
        a.send(&BusFrame::new(25, &[7])).unwrap();
        assert_eq!(a.poll_received().len(), 1);
    }

    #[test]
    fn offline_port_fails_to_send() {
        let bus = SimBus::new(0, 1);
        let mut a = bus.attach();
        let mut b = bus.attach();
        bus.set_offline(a.index(), true);
        assert_eq!(a.send(&BusFrame::new(25, &[7])), Err(SendError::BusOff));
        assert!(b.poll_received().is_empty());
        assert_eq!(bus.stats().rejected, 1);
        b.send(&BusFrame::new(25, &[9])).unwrap();
        assert_eq!(a.poll_received().len(), 1);
    }

    #[test]
    fn loss_rate_is_roughly_honoured() {
        let bus = SimBus::new(300, 42);
        let mut a = bus.attach();
        let _b = bus.attach();
        for _ in 0..10_000 {
            a.send(&BusFrame::new(25, &[1])).unwrap();
        }
        let lost = bus.stats().lost;
        assert!((2_500..3_500).contains(&lost), "lost {lost}");
    }

    #[test]
    fn total_loss_delivers_nothing() {
        let bus = SimBus::new(1000, 3);
        let mut a = bus.attach();
        let mut b = bus.attach();
        a.send(&BusFrame::new(25, &[1])).unwrap();
        assert!(b.poll_received().is_empty());
    }
}
