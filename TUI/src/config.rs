/// Client configuration, timing constants and endpoint derivation.
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Path of the display socket on the service host.
pub const SOCKET_PATH: &str = "/ws";

/// Origin assumed when none is given on the command line.
pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";

pub struct Config {
    /// Main loop tick rate in milliseconds (target 60 FPS = ~16ms)
    pub tick_rate_ms: u64,

    /// Fixed delay before a lost connection is retried
    pub reconnect_delay: Duration,

    /// Upper bound on the socket handshake; an expired attempt counts as failed
    pub handshake_timeout: Duration,

    /// Inactivity window after which content reverts to the idle screen
    pub idle_timeout: Duration,

    /// Fade-out of the content region before new content is inserted
    pub content_fade: Duration,

    /// Auto-dismiss delay for non-error connection banners
    pub banner_timeout: Duration,

    /// Auto-dismiss delay for call update alerts
    pub call_alert_timeout: Duration,

    /// Quiet period before buffered thinking text is redrawn
    pub thinking_flush_delay: Duration,

    /// Fade-out of the thinking overlay
    pub thinking_fade: Duration,

    /// Lines to scroll per key press
    pub scroll_step: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_rate_ms: 16,
            reconnect_delay: Duration::from_millis(5000),
            handshake_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(5 * 60),
            content_fade: Duration::from_millis(700),
            banner_timeout: Duration::from_millis(4000),
            call_alert_timeout: Duration::from_millis(20_000),
            thinking_flush_delay: Duration::from_millis(100),
            thinking_fade: Duration::from_millis(300),
            scroll_step: 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid origin '{origin}': {source}")]
    InvalidOrigin {
        origin: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported origin scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),
    #[error("origin '{0}' has no host")]
    MissingHost(String),
}

/// Derive the socket endpoint from the page origin. The secure variant
/// mirrors the origin's scheme: `https` maps to `wss`, `http` to `ws`.
pub fn endpoint_from_origin(origin: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(origin.trim()).map_err(|source| ConfigError::InvalidOrigin {
        origin: origin.to_string(),
        source,
    })?;

    let scheme = match parsed.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    };

    let host = parsed
        .host_str()
        .ok_or_else(|| ConfigError::MissingHost(origin.to_string()))?;

    let authority = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let endpoint = format!("{}://{}{}", scheme, authority, SOCKET_PATH);
    Url::parse(&endpoint).map_err(|source| ConfigError::InvalidOrigin {
        origin: origin.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_origin_maps_to_ws() {
        let url = endpoint_from_origin("http://localhost:8000").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/ws");
    }

    #[test]
    fn test_secure_origin_maps_to_wss() {
        let url = endpoint_from_origin("https://display.example.com").unwrap();
        assert_eq!(url.as_str(), "wss://display.example.com/ws");
    }

    #[test]
    fn test_origin_path_is_ignored() {
        let url = endpoint_from_origin("http://10.0.0.5:9000/dashboard/index.html").unwrap();
        assert_eq!(url.as_str(), "ws://10.0.0.5:9000/ws");
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let err = endpoint_from_origin("ftp://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme(s) if s == "ftp"));
    }

    #[test]
    fn test_garbage_origin_rejected() {
        assert!(matches!(
            endpoint_from_origin("not a url"),
            Err(ConfigError::InvalidOrigin { .. })
        ));
    }

    #[test]
    fn test_default_timings() {
        let config = Config::default();
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.call_alert_timeout, Duration::from_secs(20));
        assert_eq!(config.thinking_flush_delay, Duration::from_millis(100));
    }
}
