/// Relay timing and retry constants.
///
/// These are the process-wide defaults; per-server `thresholds` in the
/// configuration file may override the ones exposed through
/// [`super::Thresholds`].
pub const LIVENESS_CHECK_INTERVAL_SECS: u64 = 1; // How often the liveness monitor runs.

/// Silence threshold before a session is restarted. Must stay well above
/// the transport's own keepalive interval to tolerate jitter without false
/// positives.
pub const STANZA_TIMEOUT_SECS: u64 = 65;

/// How often the MOTD delivery queue is advanced, in milliseconds.
pub const MOTD_TICK_MS: u64 = 500;

/// Delay between a user's join and their MOTD send.
pub const MOTD_GRACE_SECS: u64 = 2;

/// Time after an MOTD send before the user becomes eligible again.
pub const MOTD_COOLDOWN_SECS: u64 = 300;

/// How often the control game is polled.
pub const ROUND_POLL_INTERVAL_SECS: u64 = 5;

/// Extra attempts after a failed API call before the tick counts as down.
pub const API_RETRIES: u32 = 2;

/// Per-request API timeout so a slow endpoint never stalls a tick.
pub const API_TIMEOUT_SECS: u64 = 2;

/// Consecutive down ticks tolerated before an active round is force-ended
/// without credit.
pub const DOWN_POLL_BUDGET: u32 = 3;

/// Delay between chat transport reconnect attempts.
pub const CONNECT_RETRY_SECS: u64 = 2;

/// Nominal round length used to reconstruct a round's start time from the
/// remaining time reported by the API.
pub const DEFAULT_ROUND_DURATION_SECS: u64 = 600;

/// Leaderboard length on the status endpoint.
pub const LEADERBOARD_SIZE: usize = 10;
