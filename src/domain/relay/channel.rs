//! Per-channel membership record and activation state machine.
//!
//! # Lifecycle
//!
//! ```text
//!            first member joins, activation succeeds
//!   Inactive ─────────────────────────────────────────▶ Active
//!      ▲                                                  │
//!      └──────────────── last member leaves ──────────────┘
//! ```
//!
//! The reference count is the member set's size, so it cannot drift from
//! membership. The record is generic over the upstream handle so the domain
//! stays free of port types; callers keep it behind a per-channel lock and
//! perform the open/close side effects themselves.

use std::collections::BTreeSet;

use crate::domain::foundation::ConnectionId;

/// Activation state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No upstream work. May still hold members if the last activation failed.
    Inactive,
    /// At least one member; upstream subscription held when bridging is enabled.
    Active,
}

/// Result of adding a connection to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Newly added; `first` is true on the 0 → 1 transition.
    Joined { first: bool },
    /// The connection was already a member. Nothing changed.
    AlreadyMember,
}

/// Result of removing a connection from a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Removed; other members remain.
    Left { remaining: usize },
    /// Removed the last member (1 → 0). The caller must tear down.
    Emptied,
    /// The connection was not a member. Nothing changed.
    NotMember,
}

/// Members, state and owned upstream handle of one channel.
#[derive(Debug)]
pub struct ChannelRecord<S> {
    members: BTreeSet<ConnectionId>,
    state: ChannelState,
    upstream: Option<S>,
}

impl<S> ChannelRecord<S> {
    pub fn new() -> Self {
        Self {
            members: BTreeSet::new(),
            state: ChannelState::Inactive,
            upstream: None,
        }
    }

    /// Adds a member. Idempotent.
    pub fn join(&mut self, connection: ConnectionId) -> JoinOutcome {
        if self.members.insert(connection) {
            JoinOutcome::Joined {
                first: self.members.len() == 1,
            }
        } else {
            JoinOutcome::AlreadyMember
        }
    }

    /// Removes a member. A no-op for non-members.
    pub fn leave(&mut self, connection: &ConnectionId) -> LeaveOutcome {
        if !self.members.remove(connection) {
            return LeaveOutcome::NotMember;
        }
        match self.members.len() {
            0 => LeaveOutcome::Emptied,
            remaining => LeaveOutcome::Left { remaining },
        }
    }

    /// True when the channel has members but no successful activation yet.
    ///
    /// This is the only gate for opening an upstream subscription; an
    /// Active channel never asks for a second one.
    pub fn needs_activation(&self) -> bool {
        self.state == ChannelState::Inactive && !self.members.is_empty()
    }

    /// Marks the channel Active, taking ownership of the upstream handle
    /// (`None` when bridging is disabled).
    ///
    /// Ignored if the channel is already Active or has no members.
    pub fn activate(&mut self, upstream: Option<S>) -> Option<S> {
        if !self.needs_activation() {
            return upstream;
        }
        self.state = ChannelState::Active;
        self.upstream = upstream;
        None
    }

    /// Transitions an empty channel back to Inactive and hands the upstream
    /// handle to the caller for release.
    ///
    /// Re-checks emptiness at call time: returns `None` and changes nothing
    /// if a member is present.
    pub fn deactivate(&mut self) -> Option<S> {
        if !self.members.is_empty() {
            return None;
        }
        self.state = ChannelState::Inactive;
        self.upstream.take()
    }

    /// Takes the upstream handle unconditionally (process shutdown).
    pub fn release_upstream(&mut self) -> Option<S> {
        self.state = ChannelState::Inactive;
        self.upstream.take()
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ChannelState::Active
    }

    pub fn has_upstream(&self) -> bool {
        self.upstream.is_some()
    }

    /// Reference count: number of member connections.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, connection: &ConnectionId) -> bool {
        self.members.contains(connection)
    }

    /// Members in a stable order.
    pub fn members(&self) -> impl Iterator<Item = &ConnectionId> {
        self.members.iter()
    }
}

impl<S> Default for ChannelRecord<S> {
    fn default() -> Self {
        Self::new()
    }
}
