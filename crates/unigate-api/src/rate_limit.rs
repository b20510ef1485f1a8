// Token-bucket rate limiter
//
// Capacity = requests per window. The bucket is refilled to full capacity
// once the window has elapsed (reset-based, no leaky smoothing). A caller
// that finds the bucket empty sleeps until the window resets; only that
// caller is suspended, concurrent callers queue on the shared mutex.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Error;

/// Rate-limit bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Bucket capacity per window.
    pub requests_per_minute: u32,
    /// Window length. Default: 60s.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            window: Duration::from_secs(60),
        }
    }
}

struct Bucket {
    tokens: u32,
    window_start: Instant,
}

/// Shared token bucket. Cheap to share behind an `Arc`.
pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            capacity: config.requests_per_minute,
            window: config.window,
            bucket: Mutex::new(Bucket {
                tokens: config.requests_per_minute,
                window_start: Instant::now(),
            }),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Tokens left in the current window.
    pub async fn available(&self) -> u32 {
        let mut bucket = self.bucket.lock().await;
        self.refill(&mut bucket);
        bucket.tokens
    }

    /// Take one token, waiting out the current window if none are left.
    pub async fn acquire(&self) {
        // A token that is never cancelled turns the cancellable path infallible.
        let never = CancellationToken::new();
        let _ = self.acquire_cancellable(&never).await;
    }

    /// Like [`acquire`](Self::acquire) but aborts promptly when `cancel` fires.
    pub async fn acquire_cancellable(&self, cancel: &CancellationToken) -> Result<(), Error> {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                self.refill(&mut bucket);
                if bucket.tokens > 0 {
                    bucket.tokens -= 1;
                    return Ok(());
                }
                (bucket.window_start + self.window).saturating_duration_since(Instant::now())
            };

            debug!(wait_ms = wait.as_millis(), "rate limit reached, waiting for window reset");
            tokio::select! {
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Reset the bucket to full capacity and start a fresh window.
    pub async fn reset(&self) {
        let mut bucket = self.bucket.lock().await;
        bucket.tokens = self.capacity;
        bucket.window_start = Instant::now();
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        if now.duration_since(bucket.window_start) >= self.window {
            bucket.tokens = self.capacity;
            bucket.window_start = now;
        }
    }
}
