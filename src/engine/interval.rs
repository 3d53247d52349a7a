//! # Requeue Intervals
//!
//! Kubernetes duration parsing and requeue jitter.

use anyhow::{anyhow, Result};
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static DURATION_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?P<number>\d+)(?P<unit>[smhd])$").ok());

/// Parse Kubernetes duration string into std::time::Duration
/// Supports formats: "30s", "1m", "5m", "1h", "2h", "1d"
/// Returns Duration or error if format is invalid
pub fn parse_kubernetes_duration(duration_str: &str) -> Result<Duration> {
    let duration_trimmed = duration_str.trim();

    if duration_trimmed.is_empty() {
        return Err(anyhow!("Duration string cannot be empty"));
    }

    let duration_regex = DURATION_REGEX
        .as_ref()
        .ok_or_else(|| anyhow!("Failed to compile duration regex"))?;

    let interval_lower = duration_trimmed.to_lowercase();
    let captures = duration_regex.captures(&interval_lower).ok_or_else(|| {
        anyhow!(
            "Invalid duration format '{}'. Expected format: <number><unit> (e.g., '30s', '5m', '1h')",
            duration_trimmed
        )
    })?;

    let (Some(number_str), Some(unit)) = (captures.name("number"), captures.name("unit")) else {
        return Err(anyhow!("Failed to parse duration '{}'", duration_trimmed));
    };

    let number: u64 = number_str.as_str().parse().map_err(|e| {
        anyhow!(
            "Invalid duration number '{}' in '{}': {}",
            number_str.as_str(),
            duration_trimmed,
            e
        )
    })?;

    if number == 0 {
        return Err(anyhow!(
            "Duration number must be greater than 0, got '{}'",
            duration_trimmed
        ));
    }

    let multiplier = match unit.as_str() {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        other => {
            return Err(anyhow!(
                "Invalid unit '{}' in duration '{}'. Expected: s, m, h, or d",
                other,
                duration_trimmed
            ));
        }
    };

    let seconds = number
        .checked_mul(multiplier)
        .ok_or_else(|| anyhow!("Duration '{}' is too large", duration_trimmed))?;
    Ok(Duration::from_secs(seconds))
}

/// Spread requeues of resources created together
///
/// Returns `base` plus a random delay of up to half of `base`.
pub fn jitter(base: Duration) -> Duration {
    let max_extra_ms = u64::try_from(base.as_millis() / 2).unwrap_or(u64::MAX);
    if max_extra_ms == 0 {
        return base;
    }
    let extra = rand::thread_rng().gen_range(0..=max_extra_ms);
    base + Duration::from_millis(extra)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_kubernetes_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_kubernetes_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_kubernetes_duration(" 1H ").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_kubernetes_duration("2d").unwrap(), Duration::from_secs(172_800));
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(parse_kubernetes_duration("").is_err());
        assert!(parse_kubernetes_duration("0s").is_err());
        assert!(parse_kubernetes_duration("10").is_err());
        assert!(parse_kubernetes_duration("1w").is_err());
        assert!(parse_kubernetes_duration("-5m").is_err());
    }

    #[test]
    fn test_jitter_stays_within_half_of_base() {
        let base = Duration::from_secs(30);
        for _ in 0..100 {
            let jittered = jitter(base);
            assert!(jittered >= base);
            assert!(jittered <= Duration::from_secs(45));
        }
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
    }
}
