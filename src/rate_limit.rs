//! Fixed-window, per-identifier rate limiting.
//!
//! Each identifier owns a window `{count, reset_at}` created lazily on its
//! first request. Once `now > reset_at` the window is replaced wholesale,
//! so the counter drops back to zero at fixed boundaries rather than
//! sliding.
//!
//! Expired windows of idle identifiers are not reclaimed by a timer.
//! Instead a small random fraction of `check` calls sweeps the whole map.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use crate::cache::expiry_after;

/// Default number of requests allowed per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 100;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Default fraction of calls that sweep expired windows.
pub const DEFAULT_SWEEP_PROBABILITY: f64 = 0.01;

/// Identifier shared by every caller with no usable address header.
pub const UNKNOWN_IDENTIFIER: &str = "unknown";

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    reset_at: Instant,
}

/// Outcome of a single rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Whole seconds until the window resets (rounded up).
    pub reset_in_secs: u64,
}

/// A fixed-window request counter keyed by caller identifier.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    windows: HashMap<String, RateWindow>,
    max_requests: u32,
    window: Duration,
    sweep_probability: f64,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_requests` per `window`.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: HashMap::new(),
            max_requests,
            window,
            sweep_probability: DEFAULT_SWEEP_PROBABILITY,
        }
    }

    /// Sets the fraction of calls that sweep expired windows (0.0 to 1.0).
    #[must_use]
    pub fn with_sweep_probability(mut self, probability: f64) -> Self {
        self.sweep_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Number of identifiers currently holding a window.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    /// Forgets every window.
    pub fn reset(&mut self) {
        self.windows.clear();
    }

    /// Counts a request from `identifier` and decides whether it may proceed.
    pub fn check(&mut self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Instant::now())
    }

    /// [`RateLimiter::check`] against an explicit clock.
    pub fn check_at(&mut self, identifier: &str, now: Instant) -> RateLimitDecision {
        if self.should_sweep() {
            self.sweep_at(now);
        }

        let limit = self.max_requests;
        let fresh = RateWindow {
            count: 0,
            reset_at: expiry_after(now, self.window),
        };
        let window = self
            .windows
            .entry(identifier.to_string())
            .or_insert(fresh);
        if now > window.reset_at {
            *window = fresh;
        }

        if window.count >= limit {
            tracing::debug!(identifier, count = window.count, "Rate limit exceeded");
            return Self::decision(false, limit, 0, window.reset_at, now);
        }

        window.count += 1;
        Self::decision(true, limit, limit - window.count, window.reset_at, now)
    }

    /// Drops every window whose reset instant has passed.
    ///
    /// Returns the number of windows removed.
    pub fn sweep_at(&mut self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| now <= window.reset_at);
        let removed = before - self.windows.len();
        if removed > 0 {
            tracing::trace!(removed, "Swept expired rate-limit windows");
        }
        removed
    }

    fn should_sweep(&self) -> bool {
        if self.sweep_probability <= 0.0 {
            return false;
        }
        if self.sweep_probability >= 1.0 {
            return true;
        }
        random_unit() < self.sweep_probability
    }

    fn decision(
        allowed: bool,
        limit: u32,
        remaining: u32,
        reset_at: Instant,
        now: Instant,
    ) -> RateLimitDecision {
        let until_reset = reset_at.saturating_duration_since(now);
        let reset_in_secs = until_reset.as_secs() + u64::from(until_reset.subsec_nanos() > 0);
        RateLimitDecision {
            allowed,
            limit,
            remaining,
            reset_in_secs,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

/// Uniform sample in `[0, 1)` drawn from the random bits of a v4 UUID.
#[allow(clippy::cast_precision_loss)] // 53 bits fit an f64 mantissa exactly
fn random_unit() -> f64 {
    const MANTISSA_BITS: u32 = 53;
    // The low 53 bits of a v4 UUID are all random (version and variant
    // bits sit above them).
    let bits = Uuid::new_v4().as_u128() & ((1u128 << MANTISSA_BITS) - 1);
    bits as f64 / (1u64 << MANTISSA_BITS) as f64
}

/// Picks the rate-limit identifier for a caller.
///
/// Uses the first trimmed entry of a forwarded-for list, else a single
/// real-ip value, else the shared [`UNKNOWN_IDENTIFIER`] bucket.
#[must_use]
pub fn client_identifier(forwarded_for: Option<&str>, real_ip: Option<&str>) -> String {
    forwarded_for
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .or_else(|| real_ip.map(str::trim).filter(|ip| !ip.is_empty()))
        .unwrap_or(UNKNOWN_IDENTIFIER)
        .to_string()
}
