//! Budget notifications to surface owners.
//!
//! Budgets flow out of the manager as messages on a [`BudgetChannel`]. The
//! default channel is [`QueueChannel`], a lock-free queue the IPC side can
//! drain from any thread.

pub mod channel;
pub mod message;

pub use channel::{BudgetChannel, DispatchStats, OwnerDirectory, QueueChannel, SurfaceOwner};
pub use message::{BudgetMessage, MemoryAllocation};
