//! Sliding-window rate limiter for annotator calls.
//!
//! Admits at most `max_calls` within any window of `period`. A call past
//! the limit waits (sleeps) until the oldest recorded call leaves the
//! window, rather than failing. The pipeline is fully sequential, so the
//! wait suspends the only task there is.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

pub struct RateLimiter {
    max_calls: usize,
    period: Duration,
    calls: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, period: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            period,
            calls: VecDeque::new(),
        }
    }

    /// Wait until the window admits another call, then record it.
    pub async fn acquire(&mut self) {
        loop {
            let now = Instant::now();
            while let Some(&oldest) = self.calls.front() {
                if oldest + self.period <= now {
                    self.calls.pop_front();
                } else {
                    break;
                }
            }

            if self.calls.len() < self.max_calls {
                self.calls.push_back(now);
                return;
            }

            // Window is full: sleep until the oldest call expires.
            if let Some(&oldest) = self.calls.front() {
                tokio::time::sleep_until(oldest + self.period).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_under_limit_never_waits() {
        let mut limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_past_limit_waits_out_the_window() {
        let mut limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        // Third call must wait until the first leaves the window.
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let mut limiter = RateLimiter::new(2, Duration::from_secs(60));
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(30)).await;
        limiter.acquire().await;

        let start = Instant::now();
        // First slot expires 30s from now; second call of this pair waits
        // another 30s for the next slot.
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }
}
