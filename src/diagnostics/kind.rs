//! Diagnostic kinds and predefined codes.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A hard error - the caller broke a contract.
    Error,
    /// A warning - the arbiter is working around a bad situation.
    Warning,
    /// Additional context about another diagnostic.
    Note,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `GM0xx` - Client lifecycle issues
/// - `GM2xx` - Sequence affinity issues
/// - `GM3xx` - Budget/limit issues
/// - `GM9xx` - Internal errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "GM001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// Predefined diagnostics (GM0xx - Client lifecycle)
// =============================================================================

/// GM001: Stale client handle.
pub const GM001: Diagnostic = Diagnostic::error(
    "GM001",
    "client handle does not refer to a live client state"
).with_note("the client was destroyed, possibly twice, or the handle came from another manager")
 .with_help("drop handles when destroy_client_state() returns");

/// GM002: Stale tracking group handle.
pub const GM002: Diagnostic = Diagnostic::error(
    "GM002",
    "tracking group handle does not refer to a live group"
).with_note("groups are released when their last client is destroyed")
 .with_help("fetch the group again with tracking_group(pid)");

// =============================================================================
// Predefined diagnostics (GM2xx - Sequence affinity)
// =============================================================================

/// GM201: Mutation from the wrong thread.
pub const GM201: Diagnostic = Diagnostic::error(
    "GM201",
    "manager mutated from a thread other than its bound sequence"
).with_note("the manager takes no locks and binds to the first thread that mutates it")
 .with_help("post the call to the owning sequence, or call detach_from_sequence() after a hand-off");

// =============================================================================
// Predefined diagnostics (GM3xx - Budgets)
// =============================================================================

/// GM301: Per-process ceiling exceeded.
pub const GM301: Diagnostic = Diagnostic::warning(
    "GM301",
    "process exceeds its GPU memory ceiling"
).with_note("usage reported by the backend is above bytes_per_process_limit")
 .with_help("check the process for texture leaks or raise the per-process limit");

/// GM302: Degraded mode.
pub const GM302: Diagnostic = Diagnostic::warning(
    "GM302",
    "GPU memory ceiling cannot fit every visible surface's minimum"
).with_note("surfaces beyond the ceiling are hibernated in registration order")
 .with_help("raise bytes_available or lower bytes_minimum_per_client");

// =============================================================================
// Predefined diagnostics (GM9xx - Internal)
// =============================================================================

/// GM901: Budget conservation violated.
pub const GM901: Diagnostic = Diagnostic::error(
    "GM901",
    "granted budgets exceed the global ceiling"
).with_note("this indicates a bug in gpubudget")
 .with_help("please report this issue with the client demands that triggered it");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_codes() {
        assert_eq!(GM001.kind, DiagnosticKind::Error);
        assert_eq!(GM302.kind, DiagnosticKind::Warning);
        assert!(GM201.help.is_some());
        assert_eq!(GM901.code, "GM901");
    }
}
