use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
/// Sliding-window thresholds for throttling and burst detection.
pub struct RateLimitConfig {
    pub max_messages_per_window: usize,
    pub window_ms: u64,
    pub burst_threshold: usize,
    pub burst_window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_messages_per_window: 15,
            window_ms: 2 * 60 * 1_000,
            burst_threshold: 10,
            burst_window_ms: 30 * 1_000,
        }
    }
}

#[derive(Debug, Default)]
/// Per-user message-timestamp sequences.
///
/// One sequence serves both sliding windows: the throttle window bounds how
/// much is retained, and the shorter burst window filters the same data, so
/// the two signals can never disagree about what the user actually sent.
/// Entries self-heal through pruning on every access; there is no separate
/// cleanup pass.
pub struct ActivityTracker {
    config: RateLimitConfig,
    timestamps: HashMap<String, Vec<u64>>,
}

impl ActivityTracker {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            timestamps: HashMap::new(),
        }
    }

    /// Records one message timestamp for the user.
    pub fn record(&mut self, user_id: &str, now_ms: u64) {
        self.prune(user_id, now_ms);
        self.timestamps
            .entry(user_id.to_string())
            .or_default()
            .push(now_ms);
    }

    /// True once the user's in-window message count has reached the throttle
    /// threshold. Pruning is destructive: the in-window suffix replaces the
    /// stored sequence.
    pub fn is_rate_limited(&mut self, user_id: &str, now_ms: u64) -> bool {
        self.prune(user_id, now_ms);
        self.in_window_count(user_id) >= self.config.max_messages_per_window
    }

    /// Count of the user's timestamps within an arbitrary trailing window,
    /// typically the (shorter) burst window.
    pub fn burst_count(&mut self, user_id: &str, now_ms: u64, window_ms: u64) -> usize {
        self.prune(user_id, now_ms);
        self.timestamps
            .get(user_id)
            .map(|timestamps| {
                timestamps
                    .iter()
                    .filter(|&&timestamp| now_ms.saturating_sub(timestamp) < window_ms)
                    .count()
            })
            .unwrap_or(0)
    }

    /// The activity-based escalation signal: burst-threshold messages within
    /// the burst window.
    pub fn is_escalation_burst(&mut self, user_id: &str, now_ms: u64) -> bool {
        self.burst_count(user_id, now_ms, self.config.burst_window_ms)
            >= self.config.burst_threshold
    }

    fn in_window_count(&self, user_id: &str) -> usize {
        self.timestamps
            .get(user_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Drops timestamps older than the throttle window, the widest window of
    /// interest. Users whose sequences empty out are removed entirely.
    fn prune(&mut self, user_id: &str, now_ms: u64) {
        let window_ms = self.config.window_ms;
        if let Some(timestamps) = self.timestamps.get_mut(user_id) {
            timestamps.retain(|&timestamp| now_ms.saturating_sub(timestamp) < window_ms);
            if timestamps.is_empty() {
                self.timestamps.remove(user_id);
            }
        }
    }
}
