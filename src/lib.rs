//! # gpubudget
//!
//! Arbitration of a global GPU memory budget between rendering surfaces.
//!
//! ## Features
//!
//! - One budget for every surface in the system, recomputed on each change
//! - Visible surfaces first, background helpers next, idle clients last
//! - Hibernation of invisible surfaces when memory runs short
//! - Per-process usage tracking with optional ceilings
//! - Budget messages pushed through a lock-free queue, sent only on change
//! - Coded diagnostics with optional strict mode
//! - Optional Tracy plots
//!
//! ## Quick Start
//!
//! ```rust
//! use gpubudget::{mb, ArbiterConfig, GpuMemoryManager, ManagedMemoryStats, OwnerId, ProcessId};
//!
//! let (mut manager, queue) = GpuMemoryManager::with_queue(ArbiterConfig::default());
//!
//! let renderer = manager.tracking_group(ProcessId::new(7))?;
//! let tab = manager.create_client_state(OwnerId::new(1), renderer, true, true)?;
//! manager.set_client_managed_memory_stats(tab, ManagedMemoryStats::new(mb(64), mb(32), 0))?;
//!
//! for message in queue.drain() {
//!     println!("{:?} may use {} bytes", message.owner, message.allocation.bytes_limit);
//! }
//! # Ok::<(), gpubudget::ArbiterError>(())
//! ```
//!
//! ## Threading
//!
//! The manager is not locked. It binds to the first thread that mutates it
//! and reports calls from other threads as [`ArbiterError::WrongSequence`].
//! Owners receive their budgets through a [`BudgetChannel`], which may be
//! drained from any thread.

pub mod api;
pub mod core;
pub mod diagnostics;
pub mod notify;

mod sync;
mod util;

// Re-export public API at crate root for convenience
pub use api::config::ArbiterConfig;
pub use api::error::ArbiterError;
pub use api::manager::GpuMemoryManager;
pub use api::stats::{ManagedMemoryStats, MemoryUsageStats, ProcessUsage};

// Client and group state
pub use crate::core::arena::Handle;
pub use crate::core::client::{ClientHandle, ClientPhase, ClientState, OwnerId};
pub use crate::core::plan::{ClientAllocation, PlanSummary};
pub use crate::core::tracking::{BudgetStatus, ProcessId, TrackingGroup, TrackingGroupHandle};

// Notification
pub use notify::{
    BudgetChannel, BudgetMessage, DispatchStats, MemoryAllocation, OwnerDirectory, QueueChannel,
    SurfaceOwner,
};

// Diagnostics
pub use diagnostics::{
    set_sink, set_strict_mode, ArbiterEvent, CollectingSink, Diagnostic, DiagnosticKind,
    DiagnosticSink, StrictMode, StrictModeGuard,
};

// Size helpers
pub use util::size::{format_bytes, gb, kb, mb};
