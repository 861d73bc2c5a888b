//! Memory statistics reported by clients and by the manager.

use crate::core::plan::PlanSummary;
use crate::core::tracking::ProcessId;
use crate::util::size::format_bytes;

/// Memory demand self-reported by a rendering surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagedMemoryStats {
    /// Bytes the surface needs to render correctly.
    pub bytes_required: usize,

    /// Additional bytes that would improve quality or performance.
    pub bytes_nice_to_have: usize,

    /// Bytes the surface holds but is not using.
    pub bytes_unused: usize,
}

impl ManagedMemoryStats {
    /// Create stats from the three reported byte counts.
    pub const fn new(bytes_required: usize, bytes_nice_to_have: usize, bytes_unused: usize) -> Self {
        Self {
            bytes_required,
            bytes_nice_to_have,
            bytes_unused,
        }
    }

    /// Total bytes the surface would like to have.
    pub fn bytes_desired(&self) -> usize {
        self.bytes_required.saturating_add(self.bytes_nice_to_have)
    }
}

/// Usage attributed to one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessUsage {
    pub process: ProcessId,
    pub bytes_used: usize,
    pub bytes_peak: usize,
    pub clients: usize,
}

/// Aggregate view of the manager for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct MemoryUsageStats {
    /// Per-process usage, ordered by process id.
    pub processes: Vec<ProcessUsage>,

    /// Bytes currently allocated across all tracking groups.
    pub bytes_allocated_current: usize,

    /// High water mark of `bytes_allocated_current`.
    pub bytes_allocated_peak: usize,

    /// Global ceiling in effect.
    pub bytes_available: usize,

    /// Sum of reported required bytes.
    pub bytes_required_total: usize,

    /// Sum of reported nice-to-have bytes.
    pub bytes_nice_to_have_total: usize,

    /// Sum of reported unused bytes.
    pub bytes_unused_total: usize,

    /// Number of registered clients.
    pub client_count: usize,

    /// Result of the most recent pass.
    pub last_pass: PlanSummary,
}

impl MemoryUsageStats {
    /// Usage as a fraction of the ceiling (0.0 when the ceiling is 0).
    pub fn utilization(&self) -> f64 {
        if self.bytes_available == 0 {
            0.0
        } else {
            self.bytes_allocated_current as f64 / self.bytes_available as f64
        }
    }
}

impl std::fmt::Display for MemoryUsageStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "GPU Memory Usage:")?;
        writeln!(f, "  Available:   {}", format_bytes(self.bytes_available))?;
        writeln!(f, "  Allocated:   {}", format_bytes(self.bytes_allocated_current))?;
        writeln!(f, "  Peak:        {}", format_bytes(self.bytes_allocated_peak))?;
        writeln!(f, "  Granted:     {}", format_bytes(self.last_pass.bytes_granted))?;
        writeln!(f, "  Clients:     {}", self.client_count)?;
        writeln!(f, "  Hibernated:  {}", self.last_pass.hibernated_clients)?;
        for process in &self.processes {
            writeln!(
                f,
                "  pid {:>6}: {} ({} clients)",
                process.process.raw(),
                format_bytes(process.bytes_used),
                process.clients
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_desired_saturates() {
        let stats = ManagedMemoryStats::new(usize::MAX, 10, 0);
        assert_eq!(stats.bytes_desired(), usize::MAX);

        let stats = ManagedMemoryStats::new(300, 200, 50);
        assert_eq!(stats.bytes_desired(), 500);
    }

    #[test]
    fn test_utilization() {
        let mut usage = MemoryUsageStats::default();
        assert_eq!(usage.utilization(), 0.0);

        usage.bytes_available = 1000;
        usage.bytes_allocated_current = 250;
        assert!((usage.utilization() - 0.25).abs() < f64::EPSILON);
    }
}
