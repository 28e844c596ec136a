//! Timeouts and queue bounds for the messaging side.

use std::time::Duration;

/// Configuration for transport-facing behavior.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Timeout for waiting for peer messages.
    pub message_timeout: Duration,
    /// Pending client requests beyond this count are logged as a warning.
    /// Requests are never dropped.
    pub pending_warn_threshold: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            message_timeout: Duration::from_secs(30),
            pending_warn_threshold: 64,
        }
    }
}
