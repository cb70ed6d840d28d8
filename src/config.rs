//! Pool configuration options

use std::time::Duration;

/// Configuration for a [`SessionPool`](crate::SessionPool).
///
/// `C` is the connection type the pool will manage; it only appears in the
/// optional customization hook, so building a config does not require a
/// live driver.
///
/// # Examples
///
/// ```
/// use sessionpool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::<i32>::new("ODBC", "Driver=...;Db=inventory")
///     .with_min_sessions(2)
///     .with_max_sessions(16)
///     .with_idle_time(Duration::from_secs(120));
///
/// assert_eq!(config.max_sessions, 16);
/// assert_eq!(config.idle_time, Duration::from_secs(120));
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig<C> {
    /// Opaque driver identifier handed to the connection factory.
    pub session_key: String,

    /// Opaque driver-specific target descriptor handed to the factory.
    pub connection_string: String,

    /// Floor below which the janitor will not evict idle-but-live sessions.
    /// Advisory for eviction only: it does not pre-create sessions, and dead
    /// sessions are destroyed even when that drops the count below it.
    pub min_sessions: usize,

    /// Hard cap on the total session count. Checkout fails once reached
    /// with no idle candidate.
    pub max_sessions: usize,

    /// Idle duration after which a session becomes eligible for janitor
    /// eviction. Zero disables timeout-based eviction entirely.
    pub idle_time: Duration,

    /// Hook run exactly once on each newly created connection, before it is
    /// first handed out. Session-level setup that must happen once per
    /// physical connection, not once per checkout.
    pub customize_session: Option<fn(&mut C)>,
}

impl<C> PoolConfig<C> {
    /// Create a configuration with the default limits
    /// (min 1, max 32, idle time 60 seconds).
    pub fn new(session_key: impl Into<String>, connection_string: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            connection_string: connection_string.into(),
            min_sessions: 1,
            max_sessions: 32,
            idle_time: Duration::from_secs(60),
            customize_session: None,
        }
    }

    pub fn with_min_sessions(mut self, min: usize) -> Self {
        self.min_sessions = min;
        self
    }

    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the idle timeout. `Duration::ZERO` disables timeout eviction;
    /// dead-session purging still runs.
    pub fn with_idle_time(mut self, idle_time: Duration) -> Self {
        self.idle_time = idle_time;
        self
    }

    /// Install the once-per-connection customization hook.
    pub fn with_customizer(mut self, hook: fn(&mut C)) -> Self {
        self.customize_session = Some(hook);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let config = PoolConfig::<i32>::new("ODBC", "cs");
        assert_eq!(config.min_sessions, 1);
        assert_eq!(config.max_sessions, 32);
        assert_eq!(config.idle_time, Duration::from_secs(60));
        assert!(config.customize_session.is_none());
    }

    #[test]
    fn builder_overrides_stick() {
        fn tweak(n: &mut i32) {
            *n += 1;
        }

        let config = PoolConfig::new("key", "cs")
            .with_min_sessions(0)
            .with_max_sessions(5)
            .with_idle_time(Duration::ZERO)
            .with_customizer(tweak);

        assert_eq!(config.min_sessions, 0);
        assert_eq!(config.max_sessions, 5);
        assert!(config.idle_time.is_zero());
        assert!(config.customize_session.is_some());
    }
}
