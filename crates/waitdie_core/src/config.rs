//! Lock manager configuration.

/// Configuration for a [`crate::LockManager`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of recent events kept in the event feed history (0 = none).
    pub event_history: usize,

    /// Whether lock events are published to the event feed at all.
    pub publish_events: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_history: 10_000,
            publish_events: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the event history limit.
    #[must_use]
    pub const fn event_history(mut self, limit: usize) -> Self {
        self.event_history = limit;
        self
    }

    /// Sets whether events are published.
    #[must_use]
    pub const fn publish_events(mut self, value: bool) -> Self {
        self.publish_events = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.publish_events);
        assert_eq!(config.event_history, 10_000);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new().event_history(16).publish_events(false);
        assert_eq!(config.event_history, 16);
        assert!(!config.publish_events);
    }
}
