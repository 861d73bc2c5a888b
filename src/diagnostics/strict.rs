//! Strict mode handling for diagnostics.
//!
//! Contract violations (stale handles, wrong thread) are reported and
//! returned as errors by default. Strict mode makes them fatal:
//! - Warn: Just emit the diagnostic
//! - PanicOnError: Emit and then panic (useful for CI and debug builds)
//!
//! The process-wide mode is set with [`set_strict_mode`]. A
//! [`StrictModeGuard`] overrides it for the current thread only.

use std::cell::Cell;
use std::sync::atomic::{AtomicU8, Ordering};

/// Strict mode behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StrictMode {
    /// Just warn, don't panic.
    Warn = 0,
    /// Panic on errors.
    PanicOnError = 1,
    /// Panic on errors and warnings.
    PanicOnWarning = 2,
}

impl From<u8> for StrictMode {
    fn from(val: u8) -> Self {
        match val {
            1 => StrictMode::PanicOnError,
            2 => StrictMode::PanicOnWarning,
            _ => StrictMode::Warn,
        }
    }
}

/// Process-wide strict mode setting.
static STRICT_MODE: AtomicU8 = AtomicU8::new(0);

thread_local! {
    static THREAD_OVERRIDE: Cell<Option<StrictMode>> = const { Cell::new(None) };
}

/// Set the process-wide strict mode.
pub fn set_strict_mode(mode: StrictMode) {
    STRICT_MODE.store(mode as u8, Ordering::Relaxed);
}

/// Get the strict mode in effect on this thread.
pub fn strict_mode() -> StrictMode {
    THREAD_OVERRIDE
        .with(Cell::get)
        .unwrap_or_else(|| StrictMode::from(STRICT_MODE.load(Ordering::Relaxed)))
}

/// Check if errors should panic.
pub fn should_panic() -> bool {
    matches!(strict_mode(), StrictMode::PanicOnError | StrictMode::PanicOnWarning)
}

/// Check if warnings should panic.
pub fn should_panic_on_warning() -> bool {
    matches!(strict_mode(), StrictMode::PanicOnWarning)
}

/// RAII guard overriding strict mode on the current thread.
pub struct StrictModeGuard {
    previous: Option<StrictMode>,
}

impl StrictModeGuard {
    /// Override strict mode until the guard is dropped.
    pub fn new(mode: StrictMode) -> Self {
        let previous = THREAD_OVERRIDE.with(|cell| cell.replace(Some(mode)));
        Self { previous }
    }

    /// Create a guard that enables panic-on-error.
    pub fn panic_on_error() -> Self {
        Self::new(StrictMode::PanicOnError)
    }

    /// Create a guard that enables panic-on-warning.
    pub fn panic_on_warning() -> Self {
        Self::new(StrictMode::PanicOnWarning)
    }
}

impl Drop for StrictModeGuard {
    fn drop(&mut self) {
        THREAD_OVERRIDE.with(|cell| cell.set(self.previous));
    }
}

/// Environment variable read by [`init_from_env`].
pub const ENV_STRICT: &str = "GPUBUDGET_STRICT";

/// Initialize strict mode from environment variable.
///
/// [`ArbiterConfig::from_env`](crate::ArbiterConfig::from_env) calls this;
/// embedders building their config by hand call it themselves. An unset
/// variable leaves the current mode alone.
///
/// Checks `GPUBUDGET_STRICT`:
/// - "0" or "warn" -> Warn
/// - "1" or "error" -> PanicOnError
/// - "2" or "warning" -> PanicOnWarning
pub fn init_from_env() {
    if let Ok(val) = std::env::var(ENV_STRICT) {
        let mode = match val.to_lowercase().as_str() {
            "1" | "error" | "true" => StrictMode::PanicOnError,
            "2" | "warning" | "all" => StrictMode::PanicOnWarning,
            _ => StrictMode::Warn,
        };
        set_strict_mode(mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_mode_default() {
        assert_eq!(strict_mode(), StrictMode::Warn);
        assert!(!should_panic());
    }

    #[test]
    fn test_strict_mode_panic_on_error() {
        let _guard = StrictModeGuard::new(StrictMode::PanicOnError);
        assert_eq!(strict_mode(), StrictMode::PanicOnError);
        assert!(should_panic());
        assert!(!should_panic_on_warning());
    }

    #[test]
    fn test_strict_mode_guard_is_thread_local() {
        let _guard = StrictModeGuard::panic_on_warning();
        assert!(should_panic_on_warning());

        let other = std::thread::spawn(should_panic).join().unwrap();
        assert!(!other);
    }

    #[test]
    fn test_guards_nest() {
        {
            let _outer = StrictModeGuard::panic_on_error();
            {
                let _inner = StrictModeGuard::new(StrictMode::Warn);
                assert_eq!(strict_mode(), StrictMode::Warn);
            }
            assert_eq!(strict_mode(), StrictMode::PanicOnError);
        }
        assert_eq!(strict_mode(), StrictMode::Warn);
    }
}
