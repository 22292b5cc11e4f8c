//! Server configuration.

use std::time::Duration;

/// Interval between keepalive pings
pub const PING_INTERVAL: Duration = Duration::from_secs(30);
/// Deadline for a single write to a connection
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(30);
/// A connection with no inbound traffic for this long is dead
pub const READ_TIMEOUT: Duration = Duration::from_secs(40);
/// Deadline for the closing handshake
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);
/// Open posts older than this are closed on next access
pub const POST_EXPIRY: Duration = Duration::from_secs(29 * 60);
/// Maximum post body length in characters
pub const MAX_BODY_LEN: usize = 2000;

/// Runtime configuration of the sync server.
///
/// Timeouts are fields rather than constants so tests can shorten them.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host the `Origin` header must name. Empty disables the check.
    pub allowed_origin: String,
    /// Take the client IP from `X-Forwarded-For`
    pub trust_proxy: bool,
    pub ping_interval: Duration,
    pub write_timeout: Duration,
    pub read_timeout: Duration,
    pub close_timeout: Duration,
    pub post_expiry: Duration,
    pub max_body_len: usize,
    /// Entries kept per feed; `None` keeps everything
    pub backlog_retention: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origin: String::new(),
            trust_proxy: false,
            ping_interval: PING_INTERVAL,
            write_timeout: WRITE_TIMEOUT,
            read_timeout: READ_TIMEOUT,
            close_timeout: CLOSE_TIMEOUT,
            post_expiry: POST_EXPIRY,
            max_body_len: MAX_BODY_LEN,
            backlog_retention: None,
        }
    }
}
