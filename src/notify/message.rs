//! Budget messages pushed to surface owners.

use crate::core::client::{ClientHandle, OwnerId};
use crate::core::plan::ClientAllocation;

/// The budget a surface owner is told about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryAllocation {
    /// Bytes the owner may keep in its texture cache right now.
    pub bytes_limit: usize,

    /// Bytes the owner may use once it is visible.
    pub bytes_limit_when_visible: usize,

    /// The owner should drop everything it can rebuild.
    pub hibernated: bool,
}

impl From<&ClientAllocation> for MemoryAllocation {
    fn from(allocation: &ClientAllocation) -> Self {
        Self {
            bytes_limit: allocation.bytes_allocation,
            bytes_limit_when_visible: allocation.bytes_allocation_when_visible,
            hibernated: allocation.hibernated,
        }
    }
}

/// One outbound notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetMessage {
    /// Surface owner the message is addressed to.
    pub owner: OwnerId,

    /// Client state the budget was computed for.
    pub client: ClientHandle,

    pub allocation: MemoryAllocation,

    /// Pass that produced the budget.
    pub pass: u64,
}
