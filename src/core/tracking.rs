//! Per-process memory usage tracking.
//!
//! The GPU backend reports allocation sizes per process, independent of
//! which client a texture belongs to. Groups only count bytes; allocation
//! decisions are made by the manager.

use super::arena::Handle;

/// Opaque identifier of the process that owns a set of clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Wrap a raw process id.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Handle to a tracking group owned by the manager.
pub type TrackingGroupHandle = Handle<TrackingGroup>;

/// Result of a usage check against the per-process ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    /// Under the ceiling (or no ceiling configured)
    Ok,

    /// Above 90% of the ceiling
    Warning,

    /// Above the ceiling
    Exceeded,
}

/// Aggregate usage for one process.
#[derive(Debug, Clone)]
pub struct TrackingGroup {
    process: ProcessId,
    bytes_used: usize,
    bytes_peak: usize,
    clients: usize,
}

impl TrackingGroup {
    pub(crate) fn new(process: ProcessId) -> Self {
        Self {
            process,
            bytes_used: 0,
            bytes_peak: 0,
            clients: 0,
        }
    }

    /// Record newly allocated bytes.
    pub fn add_usage(&mut self, bytes: usize) {
        self.bytes_used = self.bytes_used.saturating_add(bytes);
        self.bytes_peak = self.bytes_peak.max(self.bytes_used);
    }

    /// Record freed bytes.
    pub fn remove_usage(&mut self, bytes: usize) {
        self.bytes_used = self.bytes_used.saturating_sub(bytes);
    }

    /// Check usage against a ceiling (0 = unlimited).
    pub fn check_limit(&self, limit: usize) -> BudgetStatus {
        if limit == 0 {
            BudgetStatus::Ok
        } else if self.bytes_used > limit {
            BudgetStatus::Exceeded
        } else if self.bytes_used > limit / 10 * 9 {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Ok
        }
    }

    /// Process this group accounts for.
    pub fn process(&self) -> ProcessId {
        self.process
    }

    /// Bytes currently attributed to the process.
    pub fn bytes_used(&self) -> usize {
        self.bytes_used
    }

    /// High water mark of `bytes_used`.
    pub fn bytes_peak(&self) -> usize {
        self.bytes_peak
    }

    /// Number of clients attached to the group.
    pub fn client_count(&self) -> usize {
        self.clients
    }

    pub(crate) fn attach_client(&mut self) {
        self.clients += 1;
    }

    /// Detach a client; returns true when no clients remain.
    pub(crate) fn detach_client(&mut self) -> bool {
        self.clients = self.clients.saturating_sub(1);
        self.clients == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_tracking() {
        let mut group = TrackingGroup::new(ProcessId::new(7));

        group.add_usage(1000);
        group.add_usage(500);
        group.remove_usage(400);

        assert_eq!(group.bytes_used(), 1100);
        assert_eq!(group.bytes_peak(), 1500);
        assert_eq!(group.process().raw(), 7);
    }

    #[test]
    fn test_remove_saturates() {
        let mut group = TrackingGroup::new(ProcessId::new(1));
        group.add_usage(10);
        group.remove_usage(100);
        assert_eq!(group.bytes_used(), 0);
    }

    #[test]
    fn test_check_limit() {
        let mut group = TrackingGroup::new(ProcessId::new(1));
        assert_eq!(group.check_limit(0), BudgetStatus::Ok);

        group.add_usage(500);
        assert_eq!(group.check_limit(1000), BudgetStatus::Ok);

        group.add_usage(450);
        assert_eq!(group.check_limit(1000), BudgetStatus::Warning);

        group.add_usage(100);
        assert_eq!(group.check_limit(1000), BudgetStatus::Exceeded);
        assert_eq!(group.check_limit(0), BudgetStatus::Ok);
    }

    #[test]
    fn test_client_attachment() {
        let mut group = TrackingGroup::new(ProcessId::new(1));
        group.attach_client();
        group.attach_client();

        assert!(!group.detach_client());
        assert!(group.detach_client());
        assert_eq!(group.client_count(), 0);
    }
}
