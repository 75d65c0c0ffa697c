use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::time::Duration;

use crate::backoff::Backoff;
use crate::error::GatewayError;
use crate::gateway::events::ConnectionProperties;
use crate::gateway::intents::Intents;
use crate::models::presence::Presence;
use crate::rate_limit::{RateLimitClass, RateLimitRule};

pub const DEFAULT_GATEWAY_URL: &str = "ws://127.0.0.1:39099/ws";
pub const DEFAULT_MAX_RECONNECTS: u32 = 5;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);
pub const REIDENTIFY_JITTER: RangeInclusive<Duration> =
    Duration::from_secs(1)..=Duration::from_secs(6);

/// Longest accepted token segment.
const MAX_TOKEN_SEGMENT: usize = 128;
const PLACEHOLDER_TOKENS: &[&str] = &[
    "token",
    "your_token",
    "your_token_here",
    "your-bot-token",
    "bot_token",
    "changeme",
    "<token>",
    "xxx",
];

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub token: String,
    pub intents: Intents,
    /// Address of the gateway used for fresh sessions.
    pub address: String,
    pub max_reconnects: u32,
    pub connect_timeout: Duration,
    pub rate_limits: HashMap<RateLimitClass, RateLimitRule>,
    pub backoff: Backoff,
    /// Delay range before re-identifying after INVALID_SESSION.
    pub reidentify_jitter: RangeInclusive<Duration>,
    /// Fixed wait after a rate-limited close.
    pub rate_limit_cooldown: Duration,
    pub properties: ConnectionProperties,
    /// Presence announced with IDENTIFY.
    pub presence: Option<Presence>,
}

impl GatewayConfig {
    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        Self {
            token: token.into(),
            intents,
            address: DEFAULT_GATEWAY_URL.to_string(),
            max_reconnects: DEFAULT_MAX_RECONNECTS,
            connect_timeout: CONNECT_TIMEOUT,
            rate_limits: HashMap::new(),
            backoff: Backoff::default(),
            reidentify_jitter: REIDENTIFY_JITTER,
            rate_limit_cooldown: RATE_LIMIT_COOLDOWN,
            properties: ConnectionProperties::default(),
            presence: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_rate_limit(mut self, class: RateLimitClass, rule: RateLimitRule) -> Self {
        self.rate_limits.insert(class, rule);
        self
    }

    /// Read the configuration from `ACCORD_*` environment variables.
    /// Only the token is required.
    pub fn from_env() -> Result<Self, GatewayError> {
        let token = std::env::var("ACCORD_TOKEN")
            .map_err(|_| GatewayError::Configuration("ACCORD_TOKEN is required".to_string()))?;

        let intents = match std::env::var("ACCORD_INTENTS") {
            Ok(value) => match value.trim().parse::<u32>() {
                Ok(bits) => Intents::from_bits(bits)?,
                Err(_) => {
                    let names: Vec<&str> = value
                        .split(',')
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .collect();
                    Intents::from_names(names.as_slice())?
                }
            },
            Err(_) => Intents::non_privileged(),
        };

        let mut config = Self::new(token, intents);
        if let Ok(url) = std::env::var("ACCORD_GATEWAY_URL") {
            config.address = url;
        }
        config.max_reconnects = std::env::var("ACCORD_MAX_RECONNECTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_RECONNECTS);
        config.connect_timeout = std::env::var("ACCORD_CONNECT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(CONNECT_TIMEOUT);

        Ok(config)
    }

    /// Check everything that can be checked before touching the network.
    pub fn validate(&self) -> Result<(), GatewayError> {
        validate_token(&self.token)?;
        if self.address.trim().is_empty() {
            return Err(GatewayError::Configuration(
                "gateway address is empty".to_string(),
            ));
        }
        if !(self.address.starts_with("ws://") || self.address.starts_with("wss://")) {
            return Err(GatewayError::Configuration(format!(
                "gateway address must be a ws:// or wss:// URL: {}",
                self.address
            )));
        }
        if self.connect_timeout.is_zero() {
            return Err(GatewayError::Configuration(
                "connect timeout must be positive".to_string(),
            ));
        }
        if self.reidentify_jitter.start() > self.reidentify_jitter.end() {
            return Err(GatewayError::Configuration(
                "re-identify jitter range is empty".to_string(),
            ));
        }
        for (class, rule) in &self.rate_limits {
            if rule.limit == 0 || rule.window.is_zero() {
                return Err(GatewayError::Configuration(format!(
                    "rate limit for {class} must allow at least one send per non-empty window"
                )));
            }
        }
        Ok(())
    }
}

/// Structural token check: not empty, not a placeholder, and (after an
/// optional `Bot ` or `Bearer ` prefix) three dot-separated segments of
/// URL-safe characters.
pub fn validate_token(token: &str) -> Result<(), GatewayError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(GatewayError::Configuration("token is empty".to_string()));
    }

    let bare = token
        .strip_prefix("Bot ")
        .or_else(|| token.strip_prefix("Bearer "))
        .unwrap_or(token);

    if PLACEHOLDER_TOKENS
        .iter()
        .any(|p| bare.eq_ignore_ascii_case(p))
    {
        return Err(GatewayError::Configuration(
            "token is a placeholder value".to_string(),
        ));
    }

    let segments: Vec<&str> = bare.split('.').collect();
    if segments.len() != 3 {
        return Err(GatewayError::Configuration(format!(
            "token must have 3 dot-separated segments, found {}",
            segments.len()
        )));
    }
    for segment in segments {
        if segment.is_empty() || segment.len() > MAX_TOKEN_SEGMENT {
            return Err(GatewayError::Configuration(format!(
                "token segment length must be 1..={MAX_TOKEN_SEGMENT}"
            )));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(GatewayError::Configuration(
                "token contains invalid characters".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const TOKEN: &str = "MTIzNDU2Nzg5.GhIjKl.abc-DEF_123";

    fn clear_env() {
        std::env::remove_var("ACCORD_TOKEN");
        std::env::remove_var("ACCORD_GATEWAY_URL");
        std::env::remove_var("ACCORD_INTENTS");
        std::env::remove_var("ACCORD_MAX_RECONNECTS");
        std::env::remove_var("ACCORD_CONNECT_TIMEOUT_MS");
    }

    #[test]
    fn test_valid_tokens() {
        assert!(validate_token(TOKEN).is_ok());
        assert!(validate_token(&format!("Bot {TOKEN}")).is_ok());
        assert!(validate_token(&format!("Bearer {TOKEN}")).is_ok());
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(validate_token("").is_err());
        assert!(validate_token("   ").is_err());
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let err = validate_token("your_token_here").unwrap_err();
        assert!(err.to_string().contains("placeholder"));
        assert!(validate_token("Bot changeme").is_err());
    }

    #[test]
    fn test_token_shape_rejected() {
        assert!(validate_token("abc.def").is_err());
        assert!(validate_token("a.b.c.d").is_err());
        assert!(validate_token("a..c").is_err());
        assert!(validate_token("a.b c.d").is_err());
        let long = "x".repeat(MAX_TOKEN_SEGMENT + 1);
        assert!(validate_token(&format!("a.{long}.c")).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_address() {
        let config = GatewayConfig::new(TOKEN, Intents::NONE).with_address("http://x");
        assert_eq!(config.validate().unwrap_err().code(), "configuration_error");
    }

    #[test]
    fn test_validate_rejects_empty_rate_limit() {
        let config = GatewayConfig::new(TOKEN, Intents::NONE).with_rate_limit(
            RateLimitClass::PresenceUpdate,
            RateLimitRule::new(0, Duration::from_secs(1)),
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::new(TOKEN, Intents::NONE);
        assert!(config.validate().is_ok());
        assert_eq!(config.max_reconnects, 5);
        assert_eq!(config.connect_timeout, CONNECT_TIMEOUT);
        assert_eq!(config.address, DEFAULT_GATEWAY_URL);
    }

    #[test]
    #[serial]
    fn test_from_env_requires_token() {
        clear_env();
        let err = GatewayConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("ACCORD_TOKEN"));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("ACCORD_TOKEN", TOKEN);
        let config = GatewayConfig::from_env().unwrap();
        assert_eq!(config.token, TOKEN);
        assert_eq!(config.intents, Intents::non_privileged());
        assert_eq!(config.max_reconnects, DEFAULT_MAX_RECONNECTS);
        assert_eq!(config.address, DEFAULT_GATEWAY_URL);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("ACCORD_TOKEN", TOKEN);
        std::env::set_var("ACCORD_GATEWAY_URL", "wss://gateway.example.com/ws");
        std::env::set_var("ACCORD_INTENTS", "messages, members");
        std::env::set_var("ACCORD_MAX_RECONNECTS", "9");
        std::env::set_var("ACCORD_CONNECT_TIMEOUT_MS", "2500");
        let config = GatewayConfig::from_env().unwrap();
        assert_eq!(config.address, "wss://gateway.example.com/ws");
        assert_eq!(config.intents.names(), vec!["messages", "members"]);
        assert_eq!(config.max_reconnects, 9);
        assert_eq!(config.connect_timeout, Duration::from_millis(2500));
    }

    #[test]
    #[serial]
    fn test_from_env_intents_as_bitmask() {
        clear_env();
        std::env::set_var("ACCORD_TOKEN", TOKEN);
        std::env::set_var("ACCORD_INTENTS", "17");
        let config = GatewayConfig::from_env().unwrap();
        assert_eq!(config.intents.bits(), 17);

        std::env::set_var("ACCORD_INTENTS", "1048576");
        assert!(GatewayConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_numbers_fall_back() {
        clear_env();
        std::env::set_var("ACCORD_TOKEN", TOKEN);
        std::env::set_var("ACCORD_MAX_RECONNECTS", "lots");
        let config = GatewayConfig::from_env().unwrap();
        assert_eq!(config.max_reconnects, DEFAULT_MAX_RECONNECTS);
    }

    #[test]
    #[serial]
    fn test_from_env_unknown_intent() {
        clear_env();
        std::env::set_var("ACCORD_TOKEN", TOKEN);
        std::env::set_var("ACCORD_INTENTS", "messages,guilds");
        assert!(GatewayConfig::from_env().is_err());
    }
}
