//! Accumulated non-fatal error reporting.
//!
//! Nothing in the engine throws across the public API: conditions are
//! recorded here, each query falls back to a safe default, and the host loop
//! keeps running. Messages drain oldest-first through `get_message`.

use std::collections::VecDeque;

/// Upper bound on retained messages; older ones are dropped first.
const MAX_MESSAGES: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    messages: VecDeque<String>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target: "daa_core", "{}", message);
        if self.messages.len() == MAX_MESSAGES {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    pub fn has_error(&self) -> bool {
        !self.messages.is_empty()
    }

    /// Oldest pending message, removed from the log.
    pub fn get_message(&mut self) -> Option<String> {
        self.messages.pop_front()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_drain_in_order() {
        let mut log = ErrorLog::new();
        assert!(!log.has_error());
        log.add("first");
        log.add("second");
        assert!(log.has_error());
        assert_eq!(log.get_message().as_deref(), Some("first"));
        assert_eq!(log.get_message().as_deref(), Some("second"));
        assert!(!log.has_error());
        assert_eq!(log.get_message(), None);
    }

    #[test]
    fn log_is_bounded() {
        let mut log = ErrorLog::new();
        for i in 0..(MAX_MESSAGES + 10) {
            log.add(format!("m{}", i));
        }
        assert_eq!(log.get_message().as_deref(), Some("m10"));
    }
}
