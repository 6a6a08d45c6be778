use jiff::SignedDuration;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Sweeper tunables, with the documented defaults.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct SweeperConfig {
    /// How often a pass runs.
    #[builder(default = Duration::from_secs(60))]
    pub tick_interval: Duration,

    /// Owners of links expiring within this window get a warning.
    #[builder(default = SignedDuration::from_hours(24))]
    pub warn_window: SignedDuration,

    /// A link with no visit for this long is archived as unused.
    #[builder(default = SignedDuration::from_hours(24 * 30))]
    pub unused_after: SignedDuration,

    /// How far an auto-renewing link's expiry is pushed on renewal.
    #[builder(default = SignedDuration::from_hours(24 * 7))]
    pub renew_extension: SignedDuration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_windows() {
        let config = SweeperConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(60));
        assert_eq!(config.warn_window, SignedDuration::from_hours(24));
        assert_eq!(config.unused_after, SignedDuration::from_hours(24 * 30));
        assert_eq!(config.renew_extension, SignedDuration::from_hours(24 * 7));
    }

    #[test]
    fn builder_overrides_single_fields() {
        let config = SweeperConfig::builder()
            .tick_interval(Duration::from_secs(5))
            .build();
        assert_eq!(config.tick_interval, Duration::from_secs(5));
        assert_eq!(config.warn_window, SignedDuration::from_hours(24));
    }
}
