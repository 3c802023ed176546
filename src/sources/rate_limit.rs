// Rate limiting for source API calls with exponential backoff.
//
// Each source gets its own budget: Reddit's OAuth API allows roughly 60
// requests per minute, the X recent-search endpoint 300 requests per 15
// minutes. A sliding-window limiter throttles requests to stay under the
// limit, and a retry wrapper handles 429 responses with exponential
// backoff and jitter.
//
// Limiters are shared across concurrent fetch tasks via Arc<RateLimiter>,
// using interior mutability so callers only need a &self reference.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, warn};

/// A sliding-window rate limiter for one source API.
///
/// Tracks request timestamps in a sliding window and pauses when the
/// configured budget is exhausted. Thread-safe via interior mutability so
/// one limiter can serve every concurrent task hitting the same API.
pub struct RateLimiter {
    /// Label used in throttle log lines ("reddit", "x").
    name: &'static str,
    /// Send times of the requests still inside the window.
    requests: Mutex<VecDeque<Instant>>,
    /// Request budget per window.
    max_requests: u32,
    /// Length of the sliding window.
    window: Duration,
    /// Spacing between consecutive requests, so a burst of tasks does not
    /// hammer the API the moment the window opens.
    min_delay: Duration,
    /// When the most recent request went out (drives min_delay).
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(
        name: &'static str,
        max_requests_per_window: u32,
        window_seconds: u64,
        min_delay_ms: u64,
    ) -> Self {
        Self {
            name,
            requests: Mutex::new(VecDeque::new()),
            max_requests: max_requests_per_window,
            window: Duration::from_secs(window_seconds),
            min_delay: Duration::from_millis(min_delay_ms),
            last_request: Mutex::new(None),
        }
    }

    /// Budget for the Reddit OAuth API: 60 requests per minute.
    pub fn reddit() -> Self {
        Self::new("reddit", 60, 60, 250)
    }

    /// Budget for the X recent-search API: 300 requests per 15 minutes.
    pub fn x() -> Self {
        Self::new("x", 300, 900, 100)
    }

    /// Block until a request may be sent.
    ///
    /// Enforces the inter-request spacing first, then sleeps until the
    /// sliding window has room. The wait is computed while holding the lock
    /// and the sleep happens after dropping it; a std MutexGuard cannot be
    /// held across an await point.
    pub async fn acquire(&self) {
        let min_delay_wait = {
            let last = self.last_request.lock().unwrap();
            match *last {
                Some(last_time) if last_time.elapsed() < self.min_delay => {
                    Some(self.min_delay - last_time.elapsed())
                }
                _ => None,
            }
        };

        if let Some(wait) = min_delay_wait {
            tokio::time::sleep(wait).await;
        }

        loop {
            let action = {
                let now = Instant::now();
                let mut requests = self.requests.lock().unwrap();

                // Drop requests that have aged out of the window
                while requests
                    .front()
                    .is_some_and(|&sent| now.duration_since(sent) > self.window)
                {
                    requests.pop_front();
                }

                if requests.len() < self.max_requests as usize {
                    requests.push_back(now);
                    *self.last_request.lock().unwrap() = Some(now);
                    None
                } else {
                    // Window is full; wait until the oldest request expires
                    let oldest = *requests.front().unwrap();
                    Some((oldest + self.window).duration_since(now))
                }
            }; // lock dropped here

            match action {
                None => return,
                Some(wait) => {
                    info!(
                        api = self.name,
                        wait_ms = wait.as_millis() as u64,
                        "Rate limit window full, waiting {}ms",
                        wait.as_millis()
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Record a request made outside of `acquire()`.
    pub fn record_request(&self) {
        let now = Instant::now();
        self.requests.lock().unwrap().push_back(now);
        *self.last_request.lock().unwrap() = Some(now);
    }
}

/// Retries allowed on 429s before the error is surfaced.
const MAX_RETRIES: u32 = 5;

/// First backoff delay; doubles per retry.
const BASE_BACKOFF: Duration = Duration::from_secs(2);

/// Ceiling on the backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Classify an error as a rate-limit (HTTP 429) response.
///
/// Both source clients bail with the status code in the message, so the
/// error chain's text is enough to classify. Public because the fetch
/// orchestrator stops a source entirely once its budget is confirmed gone.
pub fn is_rate_limit_error(err: &anyhow::Error) -> bool {
    let debug_str = format!("{:?}", err);
    debug_str.contains("429")
        || debug_str.to_lowercase().contains("rate limit")
        || debug_str.to_lowercase().contains("ratelimit")
}

/// Run an operation, retrying with exponential backoff when rate limited.
///
/// Rate-limited attempts are retried up to `MAX_RETRIES` times with
/// exponentially increasing delays plus jitter. Other errors return
/// immediately. `acquire()` runs before every attempt so retries still
/// respect the sliding window.
pub async fn with_retry<F, Fut, T>(rate_limiter: &RateLimiter, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;

    loop {
        rate_limiter.acquire().await;

        let err = match operation().await {
            Ok(out) => return Ok(out),
            Err(err) => err,
        };

        if attempt >= MAX_RETRIES || !is_rate_limit_error(&err) {
            return Err(err);
        }
        attempt += 1;

        let backoff = BASE_BACKOFF
            .saturating_mul(1u32 << attempt)
            .min(MAX_BACKOFF);

        // Jitter of +/- 25% so parallel fetchers don't retry in
        // lockstep. The subsecond nanos of the wall clock vary
        // enough that pulling in a RNG here isn't worth it.
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        let jitter_factor = 0.75 + (nanos % 500) as f64 / 1000.0;
        let jittered = Duration::from_secs_f64(backoff.as_secs_f64() * jitter_factor);

        warn!(
            api = rate_limiter.name,
            attempt = attempt,
            max_retries = MAX_RETRIES,
            "Rate limited, backing off {:.1}s before attempt {}/{}",
            jittered.as_secs_f64(),
            attempt + 1,
            MAX_RETRIES + 1,
        );

        tokio::time::sleep(jittered).await;
    }
}
