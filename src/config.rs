use std::time::Duration;

/// Backoff schedule for retryable provider failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub factor: u32,
}

impl RetryPolicy {
    /// Delay to wait after the given zero-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * self.factor.saturating_pow(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            factor: 2,
        }
    }
}

/// Runtime tuning for the payment engine.
///
/// Defaults are suitable for tests and the CLI; deployments override them
/// through `PAYLODE_*` environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
    /// Upper bound on a single provider call before it is treated as a
    /// retryable timeout.
    pub call_timeout: Duration,
    /// Age after which cached service variations are refreshed.
    pub catalog_ttl: Duration,
    /// Age after which an abandoned reservation stops counting against the
    /// wallet balance.
    pub reservation_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(5),
            catalog_ttl: Duration::from_secs(600),
            reservation_ttl: Duration::from_secs(120),
        }
    }
}

impl EngineConfig {
    /// Loads the configuration, overriding defaults from the environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            retry: RetryPolicy {
                max_attempts: env_u32("PAYLODE_MAX_RETRY_ATTEMPTS")
                    .unwrap_or(defaults.retry.max_attempts),
                base_delay: env_millis("PAYLODE_RETRY_BASE_DELAY_MS")
                    .unwrap_or(defaults.retry.base_delay),
                factor: env_u32("PAYLODE_RETRY_FACTOR").unwrap_or(defaults.retry.factor),
            },
            call_timeout: env_millis("PAYLODE_CALL_TIMEOUT_MS").unwrap_or(defaults.call_timeout),
            catalog_ttl: env_millis("PAYLODE_CATALOG_TTL_MS").unwrap_or(defaults.catalog_ttl),
            reservation_ttl: env_millis("PAYLODE_RESERVATION_TTL_MS")
                .unwrap_or(defaults.reservation_ttl),
        }
    }
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}
