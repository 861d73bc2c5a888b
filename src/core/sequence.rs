//! Single-sequence affinity.
//!
//! The manager has no locks; it relies on every mutation arriving from the
//! same thread. The checker binds to the first thread that asks and rejects
//! all others until detached.

use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
pub(crate) struct SequenceChecker {
    bound: Option<ThreadId>,
}

impl SequenceChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the calling thread is (or now becomes) the bound one.
    pub fn called_on_valid_sequence(&mut self) -> bool {
        let current = thread::current().id();
        match self.bound {
            Some(bound) => bound == current,
            None => {
                self.bound = Some(current);
                true
            }
        }
    }

    /// Forget the bound thread; the next caller binds.
    pub fn detach(&mut self) {
        self.bound = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binds_to_first_caller() {
        let mut checker = SequenceChecker::new();
        assert!(checker.called_on_valid_sequence());
        assert!(checker.called_on_valid_sequence());

        let mut checker = thread::spawn(move || {
            assert!(!checker.called_on_valid_sequence());
            checker
        })
        .join()
        .unwrap();

        checker.detach();
        assert!(checker.called_on_valid_sequence());
    }
}
