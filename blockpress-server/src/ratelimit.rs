//! Per-user write throttling.
//!
//! Each caller gets a token bucket: `burst` writes back to back, then
//! `refill_rate` writes per second.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use blockpress_types::UserId;
use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Bucket capacity
    pub burst: u32,
    /// Tokens added per second
    pub refill_rate: f64,
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst: 20,
            refill_rate: 2.0,
            enabled: true,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_seen: Instant,
}

impl Bucket {
    fn full(capacity: u32, now: Instant) -> Self {
        Self {
            tokens: f64::from(capacity),
            last_seen: now,
        }
    }

    fn refill(&mut self, config: &RateLimitConfig, now: Instant) {
        let elapsed = now.duration_since(self.last_seen).as_secs_f64();
        self.tokens = (self.tokens + elapsed * config.refill_rate).min(f64::from(config.burst));
        self.last_seen = now;
    }

    fn wait_time(&self, config: &RateLimitConfig) -> Duration {
        let missing = (1.0 - self.tokens).max(0.0);
        if missing == 0.0 || config.refill_rate <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(missing / config.refill_rate)
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<HashMap<UserId, Bucket>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spend one token for `user`; `Err` carries how long until the next one.
    pub fn check(&self, user: &UserId) -> Result<(), Duration> {
        if !self.config.enabled {
            return Ok(());
        }

        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(user.clone())
            .or_insert_with(|| Bucket::full(self.config.burst, now));
        bucket.refill(&self.config, now);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            Err(bucket.wait_time(&self.config))
        }
    }

    /// Forget users idle for longer than `max_idle`.
    pub fn sweep(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_seen) < max_idle);
        before - buckets.len()
    }

    pub fn tracked_users(&self) -> usize {
        self.buckets.lock().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
