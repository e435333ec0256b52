//! Error classification and backoff schedule

use std::time::Duration;

use crate::config::ExecutionSettings;

/// Whether a provider error looks like throttling.
///
/// Case-insensitive substring match against the configured markers
/// ("rate", "limit", "capacity", "too many" by default).
#[must_use]
pub fn is_rate_limited(message: &str, markers: &[String]) -> bool {
    let lowered = message.to_lowercase();
    markers
        .iter()
        .any(|marker| lowered.contains(&marker.to_lowercase()))
}

/// Sleep before retry number `retry` (0-based) of the same trial.
///
/// Starts at `initial_backoff_ms` and doubles per retry.
#[must_use]
pub fn backoff_delay(settings: &ExecutionSettings, retry: u32) -> Duration {
    let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
    Duration::from_millis(settings.initial_backoff_ms.saturating_mul(factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        ExecutionSettings::default().rate_limit_markers
    }

    #[test]
    fn test_rate_limit_markers() {
        assert!(is_rate_limited("429 Rate limit exceeded", &markers()));
        assert!(is_rate_limited("Server at CAPACITY", &markers()));
        assert!(is_rate_limited("Too Many Requests", &markers()));
        assert!(!is_rate_limited("invalid api key", &markers()));
        assert!(!is_rate_limited("", &markers()));
    }

    #[test]
    fn test_backoff_doubles() {
        let settings = ExecutionSettings::default();
        assert_eq!(backoff_delay(&settings, 0), Duration::from_millis(10_000));
        assert_eq!(backoff_delay(&settings, 1), Duration::from_millis(20_000));
        assert_eq!(backoff_delay(&settings, 2), Duration::from_millis(40_000));
    }

    #[test]
    fn test_backoff_saturates() {
        let settings = ExecutionSettings::default();
        assert_eq!(backoff_delay(&settings, 200), Duration::from_millis(u64::MAX));
    }
}
