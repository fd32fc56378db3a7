//! Request pacing for the remote API
//!
//! Two constraints are enforced before every dispatch:
//! 1. A minimum delay since the previous dispatch
//! 2. At most `max_per_window` dispatches in any sliding 60-second window
//!
//! The internal state sits behind an async mutex and the lock is held while
//! waiting, so every caller sharing one limiter is paced in arrival order.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window rate limiter with a minimum inter-request delay
pub struct RateLimiter {
    state: Mutex<WindowState>,
    min_interval: Duration,
    max_per_window: usize,
    window: Duration,
}

#[derive(Default)]
struct WindowState {
    dispatched: VecDeque<Instant>,
    last_dispatch: Option<Instant>,
}

impl WindowState {
    fn evict_older_than(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.dispatched.front() {
            if now.duration_since(oldest) >= window {
                self.dispatched.pop_front();
            } else {
                break;
            }
        }
    }
}

impl RateLimiter {
    pub fn new(max_per_minute: u32, min_interval: Duration) -> Self {
        Self {
            state: Mutex::new(WindowState::default()),
            min_interval,
            max_per_window: max_per_minute.max(1) as usize,
            window: WINDOW,
        }
    }

    /// Wait until both constraints allow a request, then record the dispatch
    pub async fn wait(&self) {
        let mut state = self.state.lock().await;

        if let Some(last) = state.last_dispatch {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?} (min delay)", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        let now = Instant::now();
        state.evict_older_than(now, self.window);

        if state.dispatched.len() >= self.max_per_window {
            if let Some(&oldest) = state.dispatched.front() {
                let ready_at = oldest + self.window;
                tracing::debug!(
                    in_window = state.dispatched.len(),
                    wait = ?ready_at.saturating_duration_since(now),
                    "Rate limiting: window full"
                );
                tokio::time::sleep_until(ready_at).await;
            }
            state.evict_older_than(Instant::now(), self.window);
        }

        let dispatched_at = Instant::now();
        state.dispatched.push_back(dispatched_at);
        state.last_dispatch = Some(dispatched_at);
    }
}
