//! Errors returned by the manager.
//!
//! Every variant is a broken caller contract. Arbitration itself never
//! fails; running short of memory is handled by hibernation instead.

use std::fmt;

use crate::core::client::ClientHandle;
use crate::core::tracking::TrackingGroupHandle;

/// Contract violations detected by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterError {
    /// The client handle was destroyed or never issued by this manager
    StaleClient(ClientHandle),
    /// The tracking group handle was released or never issued
    StaleTrackingGroup(TrackingGroupHandle),
    /// The manager was mutated off its bound sequence
    WrongSequence,
}

impl fmt::Display for ArbiterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArbiterError::StaleClient(handle) => write!(f, "Stale client handle {}", handle),
            ArbiterError::StaleTrackingGroup(handle) => {
                write!(f, "Stale tracking group handle {}", handle)
            }
            ArbiterError::WrongSequence => {
                write!(f, "Manager accessed from the wrong sequence")
            }
        }
    }
}

impl std::error::Error for ArbiterError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::arena::Handle;

    #[test]
    fn test_display() {
        let err = ArbiterError::StaleClient(Handle::dangling());
        assert!(err.to_string().starts_with("Stale client handle"));
        assert_eq!(
            ArbiterError::WrongSequence.to_string(),
            "Manager accessed from the wrong sequence"
        );
    }
}
