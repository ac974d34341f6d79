//! First-press leader election.
//!
//! There is no negotiation on the bus: the first node whose commit input reads pressed
//! becomes leader. A node that hears a remote Ball frame first settles as follower. Both
//! transitions start from `Undecided` and are final for the session. If both buttons are
//! pressed before either node has broadcast, both become leader and the pair runs in a
//! degraded last-writer-wins mode.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::types::NodeRole;

/// Outcome of one election check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoleChange {
    #[default]
    Unchanged,
    BecameLeader,
    BecameFollower,
}

/// Role published atomically, so a transition made in one context is visible to any other
/// on its next read.
#[derive(Debug, Default)]
pub struct RoleCell(AtomicU8);

impl RoleCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(NodeRole::Undecided as u8))
    }

    pub fn load(&self) -> NodeRole {
        NodeRole::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves from `Undecided` to `role`. Fails once any role has been set.
    pub fn settle(&self, role: NodeRole) -> bool {
        self.0
            .compare_exchange(NodeRole::Undecided as u8, role as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[derive(Debug, Default)]
pub struct LeaderElection {
    role: RoleCell,
}

impl LeaderElection {
    pub fn new() -> Self {
        Self { role: RoleCell::new() }
    }

    pub fn role(&self) -> NodeRole {
        self.role.load()
    }

    pub fn is_leader(&self) -> bool {
        self.role() == NodeRole::Leader
    }

    /// Called every loop iteration with the commit input. Reports `BecameLeader` at most once
    /// per session; every later call is a no-op.
    pub fn try_become_leader(&self, trigger: bool) -> RoleChange {
        if trigger && self.role.settle(NodeRole::Leader) {
            tracing::info!("commit pressed first, this node is leader");
            RoleChange::BecameLeader
        } else {
            RoleChange::Unchanged
        }
    }

    /// Called when authoritative remote state arrives.
    pub fn observe_remote_leader(&self) -> RoleChange {
        if self.role.settle(NodeRole::Follower) {
            tracing::info!("remote leader heard, this node is follower");
            RoleChange::BecameFollower
        } else {
            RoleChange::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_undecided() {
        let e = LeaderElection::new();
        assert_eq!(e.role(), NodeRole::Undecided);
        assert_eq!(e.try_become_leader(false), RoleChange::Unchanged);
        assert_eq!(e.role(), NodeRole::Undecided);
    }

    #[test]
    fn repeated_presses_transition_once() {
        let e = LeaderElection::new();
        let changes = (0..25)
            .map(|_| e.try_become_leader(true))
            .filter(|c| *c == RoleChange::BecameLeader)
            .count();
        assert_eq!(changes, 1);
        assert!(e.is_leader());
    }

    #[test]
    fn leader_ignores_remote_leader() {
        let e = LeaderElection::new();
        e.try_become_leader(true);
        assert_eq!(e.observe_remote_leader(), RoleChange::Unchanged);
        assert_eq!(e.role(), NodeRole::Leader);
    }

    #[test]
    fn follower_cannot_claim_leadership() {
        let e = LeaderElection::new();
        assert_eq!(e.observe_remote_leader(), RoleChange::BecameFollower);
        assert_eq!(e.try_become_leader(true), RoleChange::Unchanged);
        assert_eq!(e.role(), NodeRole::Follower);
    }

    #[test]
    fn role_cell_settles_once() {
        let cell = RoleCell::new();
        assert!(cell.settle(NodeRole::Follower));
        assert!(!cell.settle(NodeRole::Leader));
        assert_eq!(cell.load(), NodeRole::Follower);
    }
}
