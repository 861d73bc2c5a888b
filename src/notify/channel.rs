//! Outbound budget delivery.
//!
//! The manager never calls surface owners directly. It enqueues a
//! [`BudgetMessage`] and moves on; whoever owns the transport drains the
//! queue on its own schedule. Delivery is best effort: messages for owners
//! that have already gone away are dropped without error.

use std::collections::HashMap;

use crossbeam_queue::SegQueue;

use crate::api::stats::ManagedMemoryStats;
use crate::core::client::OwnerId;

use super::message::{BudgetMessage, MemoryAllocation};

/// The surface owner side of a client, usually in another process.
pub trait SurfaceOwner {
    /// Whether the surface is currently shown.
    fn is_visible(&self) -> bool;

    /// The latest self-reported demand, if any.
    fn managed_memory_stats(&self) -> Option<ManagedMemoryStats>;

    /// Receive a new budget.
    fn set_memory_allocation(&self, allocation: &MemoryAllocation);
}

/// Sink for budget messages. Sending must not block or fail.
pub trait BudgetChannel: Send + Sync {
    fn send(&self, message: BudgetMessage);
}

/// Resolves owner ids to live surface owners.
pub trait OwnerDirectory {
    fn lookup(&self, owner: OwnerId) -> Option<&dyn SurfaceOwner>;
}

impl<S: SurfaceOwner> OwnerDirectory for HashMap<OwnerId, S> {
    fn lookup(&self, owner: OwnerId) -> Option<&dyn SurfaceOwner> {
        self.get(&owner).map(|surface| surface as &dyn SurfaceOwner)
    }
}

/// Outcome of a dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Messages handed to an owner.
    pub delivered: usize,
    /// Messages whose owner was gone.
    pub dropped: usize,
}

/// Lock-free message queue; doubles as a recorder in tests.
pub struct QueueChannel {
    queue: SegQueue<BudgetMessage>,
}

impl QueueChannel {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }

    /// Take the oldest pending message.
    pub fn pop(&self) -> Option<BudgetMessage> {
        self.queue.pop()
    }

    /// Take all pending messages, oldest first.
    pub fn drain(&self) -> Vec<BudgetMessage> {
        let mut messages = Vec::with_capacity(self.queue.len());
        while let Some(message) = self.queue.pop() {
            messages.push(message);
        }
        messages
    }

    /// Deliver all pending messages through `directory`.
    pub fn dispatch(&self, directory: &dyn OwnerDirectory) -> DispatchStats {
        let mut stats = DispatchStats::default();

        while let Some(message) = self.queue.pop() {
            match directory.lookup(message.owner) {
                Some(owner) => {
                    owner.set_memory_allocation(&message.allocation);
                    stats.delivered += 1;
                }
                None => {
                    log::trace!(
                        "dropping budget for departed owner {} (client {})",
                        message.owner.raw(),
                        message.client
                    );
                    stats.dropped += 1;
                }
            }
        }

        stats
    }

    /// Check if there are pending messages.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Get the number of pending messages.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

impl Default for QueueChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl BudgetChannel for QueueChannel {
    fn send(&self, message: BudgetMessage) {
        self.queue.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arena::Handle;
    use std::cell::Cell;

    struct FakeSurface {
        received: Cell<usize>,
    }

    impl SurfaceOwner for FakeSurface {
        fn is_visible(&self) -> bool {
            true
        }

        fn managed_memory_stats(&self) -> Option<ManagedMemoryStats> {
            None
        }

        fn set_memory_allocation(&self, allocation: &MemoryAllocation) {
            self.received.set(allocation.bytes_limit);
        }
    }

    fn message(owner: u64, bytes: usize) -> BudgetMessage {
        BudgetMessage {
            owner: OwnerId::new(owner),
            client: Handle::dangling(),
            allocation: MemoryAllocation {
                bytes_limit: bytes,
                ..MemoryAllocation::default()
            },
            pass: 1,
        }
    }

    #[test]
    fn test_queue_records_in_order() {
        let channel = QueueChannel::new();
        assert!(channel.is_empty());

        channel.send(message(1, 100));
        channel.send(message(2, 200));
        assert_eq!(channel.len(), 2);

        let drained = channel.drain();
        assert_eq!(drained[0].allocation.bytes_limit, 100);
        assert_eq!(drained[1].allocation.bytes_limit, 200);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_dispatch_drops_departed_owners() {
        let channel = QueueChannel::new();
        let mut owners = HashMap::new();
        owners.insert(
            OwnerId::new(1),
            FakeSurface {
                received: Cell::new(0),
            },
        );

        channel.send(message(1, 512));
        channel.send(message(9, 64));

        let stats = channel.dispatch(&owners);
        assert_eq!(stats, DispatchStats { delivered: 1, dropped: 1 });
        assert_eq!(owners[&OwnerId::new(1)].received.get(), 512);
        assert!(channel.is_empty());
    }
}
