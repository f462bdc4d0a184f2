//! Server configuration.

use chrono::Duration;
use std::net::SocketAddr;
use std::time::Duration as StdDuration;

use crate::discovery::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::store::DEFAULT_SESSION_TTL_SECONDS;

/// Default port for the HTTP API.
pub const DEFAULT_PORT: u16 = 8080;

/// Default period of the expired-session sweep: 5 minutes.
pub const DEFAULT_SESSION_CLEANUP_SECONDS: u64 = 300;

/// Configuration for the HTTP server and the store it fronts.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP API listens on.
    pub bind_addr: SocketAddr,
    /// Page size used when a request does not pass `limit` (default: 100).
    pub default_page_limit: usize,
    /// Largest `limit` a request may ask for (default: 100).
    pub max_page_limit: usize,
    /// Lifetime of a newly created session (default: 24 hours).
    pub session_ttl: Duration,
    /// How often the server drops expired sessions (default: 5 minutes).
    pub session_cleanup_interval: StdDuration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_page_limit: MAX_PAGE_LIMIT,
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECONDS),
            session_cleanup_interval: StdDuration::from_secs(DEFAULT_SESSION_CLEANUP_SECONDS),
        }
    }
}

impl ServerConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the page size used when none is requested.
    ///
    /// Clamped to `[1, max_page_limit]`.
    pub fn default_page_limit(mut self, limit: usize) -> Self {
        self.default_page_limit = limit.clamp(1, self.max_page_limit);
        self
    }

    /// Set the largest page a caller may request.
    ///
    /// Never exceeds [`MAX_PAGE_LIMIT`]; the default page limit follows it down.
    pub fn max_page_limit(mut self, limit: usize) -> Self {
        self.max_page_limit = limit.clamp(1, MAX_PAGE_LIMIT);
        self.default_page_limit = self.default_page_limit.min(self.max_page_limit);
        self
    }

    /// Set the session lifetime.
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set the expired-session sweep period. Zero is raised to one second.
    pub fn session_cleanup_interval(mut self, period: StdDuration) -> Self {
        self.session_cleanup_interval = period.max(StdDuration::from_secs(1));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.default_page_limit, 100);
        assert_eq!(config.max_page_limit, 100);
        assert_eq!(config.session_ttl, Duration::hours(24));
        assert_eq!(config.session_cleanup_interval, StdDuration::from_secs(300));
    }

    #[test]
    fn test_page_limits_are_clamped() {
        let config = ServerConfig::new().max_page_limit(500);
        assert_eq!(config.max_page_limit, MAX_PAGE_LIMIT);

        let config = ServerConfig::new().max_page_limit(25);
        assert_eq!(config.default_page_limit, 25);

        let config = ServerConfig::new().max_page_limit(25).default_page_limit(50);
        assert_eq!(config.default_page_limit, 25);

        let config = ServerConfig::new().default_page_limit(0);
        assert_eq!(config.default_page_limit, 1);
    }

    #[test]
    fn test_builder_chain() {
        let addr: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        let config = ServerConfig::new()
            .bind_addr(addr)
            .session_ttl(Duration::minutes(30));
        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.session_ttl, Duration::minutes(30));

        let config = ServerConfig::new().session_cleanup_interval(StdDuration::ZERO);
        assert_eq!(config.session_cleanup_interval, StdDuration::from_secs(1));
    }
}
