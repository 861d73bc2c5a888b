//! Per-surface client state.

use crate::api::stats::ManagedMemoryStats;
use crate::notify::message::MemoryAllocation;

use super::arena::Handle;
use super::plan::{ClientAllocation, ClientDemand};
use super::tracking::TrackingGroupHandle;

/// Opaque reference to the surface owner (e.g. a command-buffer stub).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Wrap a raw owner id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Handle to a client state owned by the manager.
pub type ClientHandle = Handle<ClientState>;

/// Where a client stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    /// Invisible and has not reported stats yet.
    InvisibleNoStats,
    /// Invisible with stats, no surface to hibernate.
    InvisibleWithStats,
    /// Visible; served from the foreground tier once stats arrive.
    VisibleActive,
    /// Invisible surface that the next pressured pass will hibernate.
    HibernationCandidate,
    /// Stripped of its budget until it becomes visible again.
    Hibernated,
}

/// Demand, visibility and granted budget of one rendering surface.
#[derive(Debug, Clone)]
pub struct ClientState {
    owner: OwnerId,
    tracking_group: TrackingGroupHandle,
    registration: u64,
    has_surface: bool,
    visible: bool,
    hibernated: bool,
    managed_memory_stats_received: bool,
    managed_memory_stats: ManagedMemoryStats,
    allocation: ClientAllocation,
    last_sent: Option<MemoryAllocation>,
}

impl ClientState {
    pub(crate) fn new(
        owner: OwnerId,
        tracking_group: TrackingGroupHandle,
        registration: u64,
        has_surface: bool,
        visible: bool,
    ) -> Self {
        Self {
            owner,
            tracking_group,
            registration,
            has_surface,
            visible,
            hibernated: false,
            managed_memory_stats_received: false,
            managed_memory_stats: ManagedMemoryStats::default(),
            allocation: ClientAllocation::default(),
            last_sent: None,
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn tracking_group(&self) -> TrackingGroupHandle {
        self.tracking_group
    }

    /// Position in registration order; lower registered first.
    pub fn registration(&self) -> u64 {
        self.registration
    }

    pub fn has_surface(&self) -> bool {
        self.has_surface
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn hibernated(&self) -> bool {
        self.hibernated
    }

    pub fn managed_memory_stats_received(&self) -> bool {
        self.managed_memory_stats_received
    }

    pub fn managed_memory_stats(&self) -> ManagedMemoryStats {
        self.managed_memory_stats
    }

    /// All fields computed by the most recent pass.
    pub fn allocation(&self) -> &ClientAllocation {
        &self.allocation
    }

    /// Budget currently granted.
    pub fn bytes_allocation(&self) -> usize {
        self.allocation.bytes_allocation
    }

    pub fn bytes_allocation_when_visible(&self) -> usize {
        self.allocation.bytes_allocation_when_visible
    }

    pub fn bytes_nicetohave_limit_low(&self) -> usize {
        self.allocation.bytes_nicetohave_limit_low
    }

    pub fn bytes_nicetohave_limit_high(&self) -> usize {
        self.allocation.bytes_nicetohave_limit_high
    }

    pub fn bytes_allocation_ideal_nicetohave(&self) -> usize {
        self.allocation.bytes_allocation_ideal_nicetohave
    }

    pub fn bytes_allocation_ideal_required(&self) -> usize {
        self.allocation.bytes_allocation_ideal_required
    }

    pub fn bytes_allocation_ideal_minimum(&self) -> usize {
        self.allocation.bytes_allocation_ideal_minimum
    }

    pub fn phase(&self) -> ClientPhase {
        if self.hibernated && !self.visible {
            ClientPhase::Hibernated
        } else if self.visible {
            ClientPhase::VisibleActive
        } else if !self.managed_memory_stats_received {
            ClientPhase::InvisibleNoStats
        } else if self.has_surface {
            ClientPhase::HibernationCandidate
        } else {
            ClientPhase::InvisibleWithStats
        }
    }

    /// Update visibility; returns false when nothing changed.
    ///
    /// Any change clears hibernation, including degraded-mode hibernation
    /// of a surface that is now hidden.
    pub(crate) fn set_visible(&mut self, visible: bool) -> bool {
        if self.visible == visible {
            return false;
        }
        self.visible = visible;
        self.hibernated = false;
        true
    }

    pub(crate) fn set_managed_memory_stats(&mut self, stats: ManagedMemoryStats) {
        self.managed_memory_stats = stats;
        self.managed_memory_stats_received = true;
    }

    pub(crate) fn demand(&self) -> ClientDemand {
        ClientDemand {
            has_surface: self.has_surface,
            visible: self.visible,
            hibernated: self.hibernated,
            stats: self
                .managed_memory_stats_received
                .then_some(self.managed_memory_stats),
        }
    }

    /// Store a pass result. Returns the message to send, if the outward
    /// budget changed since the last one sent.
    pub(crate) fn apply(&mut self, allocation: ClientAllocation) -> Option<MemoryAllocation> {
        self.allocation = allocation;
        self.hibernated = allocation.hibernated;

        let outgoing = MemoryAllocation::from(&allocation);
        if self.last_sent == Some(outgoing) {
            return None;
        }
        self.last_sent = Some(outgoing);
        Some(outgoing)
    }
}
