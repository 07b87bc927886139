//! Session configuration.

use std::time::Duration;

/// Deadlines applied by a session.
///
/// Only the lock acknowledgement is bounded by default. Authentication and
/// the unlock confirmation wait indefinitely unless a deadline is set, which
/// matches servers that hold a lock request open until it can be granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Deadline for the first reply to a lock request
    pub lock_ack_timeout: Duration,
    /// Deadline for the authentication reply (`None` waits forever)
    pub auth_timeout: Option<Duration>,
    /// Deadline for the unlock confirmation (`None` waits forever)
    pub unlock_timeout: Option<Duration>,
}

impl SessionConfig {
    /// Default deadline for a lock acknowledgement.
    pub const DEFAULT_LOCK_ACK_TIMEOUT: Duration = Duration::from_secs(60);

    /// Set the lock acknowledgement deadline.
    #[must_use]
    pub fn with_lock_ack_timeout(mut self, timeout: Duration) -> Self {
        self.lock_ack_timeout = timeout;
        self
    }

    /// Bound the authentication read.
    #[must_use]
    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = Some(timeout);
        self
    }

    /// Bound the wait for the unlock confirmation.
    #[must_use]
    pub fn with_unlock_timeout(mut self, timeout: Duration) -> Self {
        self.unlock_timeout = Some(timeout);
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lock_ack_timeout: Self::DEFAULT_LOCK_ACK_TIMEOUT,
            auth_timeout: None,
            unlock_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_only_bound_the_lock_ack() {
        let config = SessionConfig::default();
        assert_eq!(config.lock_ack_timeout, Duration::from_secs(60));
        assert_eq!(config.auth_timeout, None);
        assert_eq!(config.unlock_timeout, None);
    }

    #[test]
    fn builders_set_deadlines() {
        let config = SessionConfig::default()
            .with_lock_ack_timeout(Duration::from_millis(250))
            .with_auth_timeout(Duration::from_secs(10))
            .with_unlock_timeout(Duration::from_secs(5));

        assert_eq!(config.lock_ack_timeout, Duration::from_millis(250));
        assert_eq!(config.auth_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.unlock_timeout, Some(Duration::from_secs(5)));
    }
}
