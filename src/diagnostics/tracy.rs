//! Tracy profiler integration.
//!
//! With the `tracy` feature, every pass plots the granted and used byte
//! totals so budget changes line up with frames in the Tracy timeline.
//! Without it these calls compile to nothing.

use crate::core::plan::PlanSummary;

#[cfg(feature = "tracy")]
pub use tracy_client;

/// Plot the outcome of a pass.
#[cfg(feature = "tracy")]
pub fn plot_pass(summary: &PlanSummary, bytes_allocated_current: usize) {
    if let Some(client) = tracy_client::Client::running() {
        client.plot(
            tracy_client::plot_name!("gpubudget granted"),
            summary.bytes_granted as f64,
        );
        client.plot(
            tracy_client::plot_name!("gpubudget used"),
            bytes_allocated_current as f64,
        );
        client.plot(
            tracy_client::plot_name!("gpubudget hibernated"),
            summary.hibernated_clients as f64,
        );
    }
}

/// Plot the outcome of a pass.
#[cfg(not(feature = "tracy"))]
#[inline(always)]
pub fn plot_pass(_summary: &PlanSummary, _bytes_allocated_current: usize) {}
