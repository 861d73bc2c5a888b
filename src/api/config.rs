//! Arbiter configuration.

use crate::util::size::{gb, mb};

/// Environment variable overriding [`ArbiterConfig::bytes_available`].
pub const ENV_BYTES_AVAILABLE: &str = "GPUBUDGET_BYTES_AVAILABLE";

/// Environment variable overriding [`ArbiterConfig::bytes_minimum_per_client`].
pub const ENV_MINIMUM_PER_CLIENT: &str = "GPUBUDGET_MINIMUM_PER_CLIENT";

/// Policy parameters for the budget arbiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbiterConfig {
    /// Global ceiling shared by all clients (default: 256 MB)
    pub bytes_available: usize,

    /// Minimum viable allocation for a visible surface (default: 8 MB)
    pub bytes_minimum_per_client: usize,

    /// Upper bound on any single client's ideal allocation (default: 128 MB)
    pub bytes_maximum_per_client: usize,

    /// Per-process usage ceiling (0 = unlimited)
    pub bytes_per_process_limit: usize,

    /// Share of its demand an invisible client may keep when there is slack
    pub invisible_allocation_percent: u8,

    /// Visible required demand, as a percentage of the ceiling, above which
    /// invisible surfaces are hibernated
    pub hibernation_threshold_percent: u8,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            bytes_available: mb(256),
            bytes_minimum_per_client: mb(8),
            bytes_maximum_per_client: mb(128),
            bytes_per_process_limit: 0,
            invisible_allocation_percent: 50,
            hibernation_threshold_percent: 100,
        }
    }
}

impl ArbiterConfig {
    /// Config for constrained devices: small ceiling, eager hibernation.
    pub fn low_memory() -> Self {
        Self {
            bytes_available: mb(64),
            bytes_minimum_per_client: mb(4),
            bytes_maximum_per_client: mb(32),
            bytes_per_process_limit: mb(48),
            invisible_allocation_percent: 25,
            hibernation_threshold_percent: 80,
        }
    }

    /// Config for discrete GPUs with plenty of memory.
    pub fn high_memory() -> Self {
        Self {
            bytes_available: gb(1),
            bytes_minimum_per_client: mb(16),
            bytes_maximum_per_client: mb(512),
            bytes_per_process_limit: 0,
            invisible_allocation_percent: 75,
            hibernation_threshold_percent: 100,
        }
    }

    /// Default config with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `GPUBUDGET_*` environment overrides. Unparsable values are
    /// ignored.
    ///
    /// `GPUBUDGET_STRICT` is applied here as well, to the process-wide
    /// strict mode (see [`crate::diagnostics::init_from_env`]).
    pub fn with_env_overrides(mut self) -> Self {
        crate::diagnostics::init_from_env();

        if let Some(bytes) = read_env_bytes(ENV_BYTES_AVAILABLE) {
            log::info!("{} overrides available GPU memory: {} bytes", ENV_BYTES_AVAILABLE, bytes);
            self.bytes_available = bytes;
        }
        if let Some(bytes) = read_env_bytes(ENV_MINIMUM_PER_CLIENT) {
            self.bytes_minimum_per_client = bytes;
        }
        self
    }

    /// Builder pattern: set the global ceiling.
    pub fn with_bytes_available(mut self, bytes: usize) -> Self {
        self.bytes_available = bytes;
        self
    }

    /// Builder pattern: set the minimum viable allocation.
    pub fn with_minimum_per_client(mut self, bytes: usize) -> Self {
        self.bytes_minimum_per_client = bytes;
        self
    }

    /// Builder pattern: set the per-client cap.
    pub fn with_maximum_per_client(mut self, bytes: usize) -> Self {
        self.bytes_maximum_per_client = bytes;
        self
    }

    /// Builder pattern: set the per-process ceiling.
    pub fn with_process_limit(mut self, bytes: usize) -> Self {
        self.bytes_per_process_limit = bytes;
        self
    }

    /// Builder pattern: set the invisible allocation share.
    pub fn with_invisible_percent(mut self, percent: u8) -> Self {
        self.invisible_allocation_percent = percent.min(100);
        self
    }

    /// Builder pattern: set the hibernation threshold.
    pub fn with_hibernation_threshold(mut self, percent: u8) -> Self {
        self.hibernation_threshold_percent = percent.min(100);
        self
    }

    /// Effective per-client cap; never below the minimum.
    pub fn effective_maximum_per_client(&self) -> usize {
        self.bytes_maximum_per_client.max(self.bytes_minimum_per_client)
    }
}

fn read_env_bytes(name: &str) -> Option<usize> {
    std::env::var(name).ok()?.trim().parse().ok()
}
