use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Default ceiling on outbound requests per second.
pub const DEFAULT_MAX_REQ_PER_SECOND: u32 = 40;

const SECOND: Duration = Duration::from_secs(1);
/// Short window that spreads a burst across the second instead of sending
/// the whole allowance at once.
const BURST: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct SlidingWindow {
    span: Duration,
    limit: usize,
    sent: VecDeque<Instant>,
}

impl SlidingWindow {
    fn new(span: Duration, limit: usize) -> Self {
        Self {
            span,
            limit: limit.max(1),
            sent: VecDeque::new(),
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&front) = self.sent.front() {
            if front + self.span <= now {
                self.sent.pop_front();
            } else {
                break;
            }
        }
    }

    fn has_room(&self) -> bool {
        self.sent.len() < self.limit
    }

    /// Earliest instant at which one more send fits, or `now` if it fits already.
    fn opens_at(&self, now: Instant) -> Instant {
        let active: Vec<Instant> = self
            .sent
            .iter()
            .copied()
            .filter(|&t| t + self.span > now)
            .collect();
        if active.len() < self.limit {
            return now;
        }
        active[active.len() - self.limit] + self.span
    }
}

/// Paces outbound token batches so that no rolling one-second window sees
/// more than the configured number of sends. Batches leave in submission
/// order and are never dropped, only delayed.
#[derive(Debug)]
pub struct RateLimiter {
    pending: VecDeque<Vec<String>>,
    windows: [SlidingWindow; 2],
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQ_PER_SECOND)
    }
}

impl RateLimiter {
    pub fn new(max_per_second: u32) -> Self {
        let per_second = max_per_second.max(1) as usize;
        Self {
            pending: VecDeque::new(),
            windows: [
                SlidingWindow::new(SECOND, per_second),
                SlidingWindow::new(BURST, per_second / 10),
            ],
        }
    }

    pub fn submit(&mut self, tokens: Vec<String>) {
        self.pending.push_back(tokens);
    }

    /// Take every pending batch allowed to go out at `now`.
    pub fn release(&mut self, now: Instant) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        for window in &mut self.windows {
            window.prune(now);
        }

        while !self.pending.is_empty() && self.windows.iter().all(SlidingWindow::has_room) {
            let Some(batch) = self.pending.pop_front() else { break };
            for window in &mut self.windows {
                window.sent.push_back(now);
            }
            out.push(batch);
        }

        if !self.pending.is_empty() {
            debug!(deferred = self.pending.len(), "rate limit reached, deferring sends");
        }
        out
    }

    /// When the next pending batch may be released. `None` when idle.
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        if self.pending.is_empty() {
            return None;
        }
        self.windows.iter().map(|w| w.opens_at(now)).max()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Take every pending batch out of the limiter without sending it.
    pub fn drain_pending(&mut self) -> Vec<Vec<String>> {
        self.pending.drain(..).collect()
    }
}
