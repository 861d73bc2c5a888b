//! Public API for gpubudget.
//!
//! This module contains all user-facing types and functions.
//! Most users should only interact with [`manager::GpuMemoryManager`].

pub mod config;
pub mod error;
pub mod manager;
pub mod stats;
