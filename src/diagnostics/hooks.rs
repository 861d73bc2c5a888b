//! Event hooks for observers of the arbiter.

use crate::core::client::{ClientHandle, OwnerId};
use crate::core::plan::PlanSummary;
use crate::core::tracking::ProcessId;

/// Events emitted by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArbiterEvent {
    /// A client state was registered
    ClientCreated { client: ClientHandle, owner: OwnerId },

    /// A client state was destroyed
    ClientDestroyed { client: ClientHandle, owner: OwnerId },

    /// A client lost its budget to hibernation
    ClientHibernated { client: ClientHandle, owner: OwnerId },

    /// A hibernated client became visible again
    ClientWoke { client: ClientHandle, owner: OwnerId },

    /// The ceiling no longer fits every visible minimum
    DegradedModeEntered { visible_clients: usize, bytes_available: usize },

    /// Every visible minimum fits again
    DegradedModeLeft,

    /// A process went over its ceiling
    ProcessLimitExceeded { process: ProcessId, bytes_used: usize, limit: usize },

    /// A pass finished
    PassCompleted { pass: u64, summary: PlanSummary, messages: usize },
}

/// Listener registry for [`ArbiterEvent`]s.
pub struct DiagnosticsHooks {
    /// Whether events are delivered
    enabled: bool,

    /// Event listeners
    listeners: Vec<Box<dyn Fn(&ArbiterEvent) + Send + Sync>>,

    /// Number of events emitted while enabled
    emitted: u64,
}

impl DiagnosticsHooks {
    /// Create new diagnostics hooks.
    pub fn new() -> Self {
        Self {
            enabled: true,
            listeners: Vec::new(),
            emitted: 0,
        }
    }

    /// Enable or disable event delivery.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Check if event delivery is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Register an event listener.
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: Fn(&ArbiterEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Emit an event to all listeners.
    pub fn emit(&mut self, event: ArbiterEvent) {
        if !self.enabled {
            return;
        }

        self.emitted += 1;
        for listener in &self.listeners {
            listener(&event);
        }
    }

    /// Events emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl Default for DiagnosticsHooks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_event_emission() {
        let mut hooks = DiagnosticsHooks::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = counter.clone();
        hooks.add_listener(move |_event| {
            counter_clone.fetch_add(1, Ordering::Relaxed);
        });

        hooks.emit(ArbiterEvent::DegradedModeLeft);
        hooks.emit(ArbiterEvent::PassCompleted {
            pass: 1,
            summary: PlanSummary::default(),
            messages: 0,
        });

        assert_eq!(counter.load(Ordering::Relaxed), 2);
        assert_eq!(hooks.emitted(), 2);
    }

    #[test]
    fn test_disabled_hooks() {
        let mut hooks = DiagnosticsHooks::new();
        hooks.set_enabled(false);

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        hooks.add_listener(move |_event| {
            counter_clone.fetch_add(1, Ordering::Relaxed);
        });

        hooks.emit(ArbiterEvent::DegradedModeLeft);

        assert_eq!(counter.load(Ordering::Relaxed), 0);
        assert_eq!(hooks.emitted(), 0);
    }
}
