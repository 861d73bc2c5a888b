//! Arbiter internals: storage, records and the allocation pass.

pub mod arena;
pub mod client;
pub mod plan;
pub(crate) mod sequence;
pub mod tracking;
