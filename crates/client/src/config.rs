use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API server, without the `/api/v1` prefix.
    pub api_base_url: String,
    /// First delay between status polls.
    pub poll_interval: Duration,
    /// Ceiling for the doubling backoff.
    pub max_poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            poll_interval: Duration::from_millis(2000),
            max_poll_interval: Duration::from_millis(30_000),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default                 |
    /// |-----------------------|-------------------------|
    /// | `SONOGEN_API_URL`     | `http://localhost:3000` |
    /// | `SONOGEN_POLL_MS`     | `2000`                  |
    /// | `SONOGEN_MAX_POLL_MS` | `30000`                 |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_base_url = std::env::var("SONOGEN_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);

        let poll_interval = parse_millis(
            "SONOGEN_POLL_MS",
            std::env::var("SONOGEN_POLL_MS").ok(),
            defaults.poll_interval,
        );
        let max_poll_interval = parse_millis(
            "SONOGEN_MAX_POLL_MS",
            std::env::var("SONOGEN_MAX_POLL_MS").ok(),
            defaults.max_poll_interval,
        )
        .max(poll_interval);

        Self {
            api_base_url,
            poll_interval,
            max_poll_interval,
        }
    }
}

/// Parse a millisecond setting. An unparsable or zero value falls back to
/// `default` with a warning rather than taking the client down.
fn parse_millis(name: &str, raw: Option<String>, default: Duration) -> Duration {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Duration::from_millis(ms),
        _ => {
            tracing::warn!(
                var = name,
                value = %raw,
                default_ms = default.as_millis() as u64,
                "Ignoring invalid interval setting",
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: Duration = Duration::from_millis(2000);

    #[test]
    fn unset_uses_default() {
        assert_eq!(parse_millis("SONOGEN_POLL_MS", None, DEFAULT), DEFAULT);
    }

    #[test]
    fn valid_value_is_used() {
        let parsed = parse_millis("SONOGEN_POLL_MS", Some(" 500 ".into()), DEFAULT);
        assert_eq!(parsed, Duration::from_millis(500));
    }

    #[test]
    fn garbage_falls_back_to_default() {
        assert_eq!(parse_millis("SONOGEN_POLL_MS", Some("fast".into()), DEFAULT), DEFAULT);
        assert_eq!(parse_millis("SONOGEN_POLL_MS", Some("-5".into()), DEFAULT), DEFAULT);
    }

    #[test]
    fn zero_falls_back_to_default() {
        assert_eq!(parse_millis("SONOGEN_POLL_MS", Some("0".into()), DEFAULT), DEFAULT);
    }
}
